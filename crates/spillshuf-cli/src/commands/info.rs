//! Record file info command.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use spillshuf_common::RECORD_SIZE;
use spillshuf_common::memory::{MemoryBudgeter, gigabytes_to_bytes};

use crate::OutputFormat;
use crate::output::{self, Format};

/// Information about a record file.
#[derive(Serialize)]
struct FileInfoOutput {
    path: String,
    size_bytes: u64,
    record_size: usize,
    records: u64,
    trailing_bytes: u64,
    memory_limit_bytes: u64,
    estimated_capacity: usize,
    estimated_segments: u64,
}

/// Run the info command.
pub fn run(path: &Path, memory_gb: f64, format: OutputFormat, quiet: bool) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|source| spillshuf_common::Error::InputOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let size_bytes = metadata.len();
    let records = size_bytes / RECORD_SIZE as u64;

    let memory_limit_bytes = gigabytes_to_bytes(memory_gb);
    let estimated_capacity = MemoryBudgeter::new(memory_limit_bytes)
        .initial_estimate()
        .max(1);

    let output = FileInfoOutput {
        path: path.display().to_string(),
        size_bytes,
        record_size: RECORD_SIZE,
        records,
        trailing_bytes: size_bytes % RECORD_SIZE as u64,
        memory_limit_bytes,
        estimated_capacity,
        estimated_segments: records.div_ceil(estimated_capacity as u64),
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            let items = vec![
                ("Path", output.path),
                ("Size", output::format_bytes(output.size_bytes)),
                ("Records", output.records.to_string()),
                ("Trailing Bytes", output.trailing_bytes.to_string()),
                ("Memory Limit", output::format_bytes(output.memory_limit_bytes)),
                ("Buffer Capacity", output.estimated_capacity.to_string()),
                ("Segments", output.estimated_segments.to_string()),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }

    Ok(())
}
