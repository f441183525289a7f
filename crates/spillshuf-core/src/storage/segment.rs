//! Temporary segment files.
//!
//! The chunk phase writes each permuted buffer to its own segment file named
//! `{prefix}_{index:04}.bin`. The merge phase reads every segment back in
//! small batches and deletes them once they are drained.
//!
//! [`SegmentStore`] owns the segment files and their read handles for their
//! whole lifetime. Nothing else opens or removes them.
//!
//! Segments are never removed on an error path: a failed run leaves them on
//! disk so they can be inspected or merged again with
//! [`SegmentStore::recover`].

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use spillshuf_common::types::{RECORD_SIZE, Record};
use spillshuf_common::utils::error::{Error, Result};

use super::io::{RecordReader, RecordWriter};

/// Returns the path of segment `index` for the given prefix.
///
/// ```
/// use std::path::Path;
/// use spillshuf_core::storage::segment_path;
///
/// let path = segment_path(Path::new("/tmp/shuf.tmp"), 3);
/// assert_eq!(path, Path::new("/tmp/shuf.tmp_0003.bin"));
/// ```
#[must_use]
pub fn segment_path(prefix: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(format!("_{index:04}.bin"));
    PathBuf::from(name)
}

/// State of one segment file.
struct Segment {
    path: PathBuf,
    records: u64,
    reader: Option<RecordReader<BufReader<File>>>,
    drained: bool,
    removed: bool,
}

/// Owns the temporary segment files of one shuffle run.
pub struct SegmentStore {
    /// Path prefix shared by every segment.
    prefix: PathBuf,
    /// Segments in index order.
    segments: Vec<Segment>,
}

impl SegmentStore {
    /// Creates an empty store. No files are touched until a segment is written.
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            segments: Vec::new(),
        }
    }

    /// Adopts segment files left behind by an earlier run.
    ///
    /// Picks up `{prefix}_0000.bin`, `{prefix}_0001.bin`, ... until the first
    /// missing index. Record counts come from file sizes.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment's metadata cannot be read.
    pub fn recover(prefix: impl Into<PathBuf>) -> Result<Self> {
        let mut store = Self::new(prefix);
        loop {
            let path = segment_path(&store.prefix, store.segments.len());
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
                Err(source) => return Err(Error::SegmentOpen { path, source }),
            };
            let len = metadata.len();
            if len % RECORD_SIZE as u64 != 0 {
                tracing::warn!(
                    path = %path.display(),
                    len,
                    "Recovered segment ends in a partial record"
                );
            }
            store.segments.push(Segment {
                path,
                records: len / RECORD_SIZE as u64,
                reader: None,
                drained: false,
                removed: false,
            });
        }
        tracing::info!(
            segments = store.segments.len(),
            prefix = %store.prefix.display(),
            "Recovered segment files"
        );
        Ok(store)
    }

    /// Returns the path prefix.
    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns whether no segment has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the path of segment `index`.
    #[must_use]
    pub fn path(&self, index: usize) -> Option<&Path> {
        self.segments.get(index).map(|s| s.path.as_path())
    }

    /// Returns the record count of each segment, in index order.
    #[must_use]
    pub fn record_counts(&self) -> Vec<u64> {
        self.segments.iter().map(|s| s.records).collect()
    }

    /// Returns the total number of records across all segments.
    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.segments.iter().map(|s| s.records).sum()
    }

    /// Writes `records` to a new segment file and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SegmentCreate`] if the file cannot be created, or
    /// [`Error::Io`] if writing it fails.
    pub fn write_segment(&mut self, records: &[Record]) -> Result<usize> {
        let index = self.segments.len();
        let path = segment_path(&self.prefix, index);

        let file = File::create(&path).map_err(|source| Error::SegmentCreate {
            path: path.clone(),
            source,
        })?;
        let mut writer = RecordWriter::new(BufWriter::new(file));
        writer
            .write_batch(records)
            .and_then(|()| writer.flush())
            .map_err(|e| Error::io(format!("writing segment {}", path.display()), e))?;

        tracing::debug!(index, records = records.len(), "Wrote segment");
        self.segments.push(Segment {
            path,
            records: records.len() as u64,
            reader: None,
            drained: false,
            removed: false,
        });
        Ok(index)
    }

    /// Opens segment `index` for reading. Opening an open segment is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SegmentOpen`] if the file cannot be opened.
    pub fn open(&mut self, index: usize) -> Result<()> {
        let segment = self.segment_mut(index)?;
        if segment.reader.is_some() || segment.drained {
            return Ok(());
        }
        let file = File::open(&segment.path).map_err(|source| Error::SegmentOpen {
            path: segment.path.clone(),
            source,
        })?;
        segment.reader = Some(RecordReader::new(BufReader::new(file)));
        Ok(())
    }

    /// Opens every segment for reading.
    pub fn open_all(&mut self) -> Result<()> {
        for index in 0..self.segments.len() {
            self.open(index)?;
        }
        Ok(())
    }

    /// Appends up to `max` records from segment `index` to `out`.
    ///
    /// Returns the number of records read. Once the segment reports
    /// end-of-segment it is marked drained and its handle is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment was never opened or the read fails.
    pub fn read_batch(&mut self, index: usize, out: &mut Vec<Record>, max: usize) -> Result<usize> {
        let segment = self.segment_mut(index)?;
        if segment.drained {
            return Ok(0);
        }
        let Some(reader) = segment.reader.as_mut() else {
            return Err(Error::io(
                format!("reading segment {}", segment.path.display()),
                std::io::Error::other("segment is not open"),
            ));
        };

        let count = reader
            .read_batch(out, max)
            .map_err(|e| Error::io(format!("reading segment {}", segment.path.display()), e))?;
        if reader.is_exhausted() {
            if reader.trailing_bytes() > 0 {
                tracing::warn!(
                    path = %segment.path.display(),
                    trailing_bytes = reader.trailing_bytes(),
                    "Segment ends in a partial record"
                );
            }
            segment.drained = true;
            segment.reader = None;
        }
        Ok(count)
    }

    /// Returns whether segment `index` has reached end-of-segment.
    #[must_use]
    pub fn is_drained(&self, index: usize) -> bool {
        self.segments.get(index).is_none_or(|s| s.drained)
    }

    /// Returns whether every segment has reached end-of-segment.
    #[must_use]
    pub fn all_drained(&self) -> bool {
        self.segments.iter().all(|s| s.drained)
    }

    /// Closes the read handle of segment `index`, if open.
    pub fn close(&mut self, index: usize) {
        if let Some(segment) = self.segments.get_mut(index) {
            segment.reader = None;
        }
    }

    /// Closes and deletes segment `index`.
    ///
    /// Only drained segments are deleted, and each at most once. Deletion is
    /// best effort: a failure is logged and the segment is not retried.
    /// Returns `true` if the file was deleted by this call.
    pub fn remove(&mut self, index: usize) -> bool {
        let Some(segment) = self.segments.get_mut(index) else {
            return false;
        };
        if segment.removed || !segment.drained {
            return false;
        }
        segment.reader = None;
        segment.removed = true;
        match fs::remove_file(&segment.path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    path = %segment.path.display(),
                    error = %e,
                    "Failed to delete segment file"
                );
                false
            }
        }
    }

    /// Closes and deletes every drained segment. Returns how many files were
    /// deleted.
    pub fn remove_drained(&mut self) -> usize {
        (0..self.segments.len())
            .filter(|&index| self.remove(index))
            .count()
    }

    fn segment_mut(&mut self, index: usize) -> Result<&mut Segment> {
        let count = self.segments.len();
        self.segments.get_mut(index).ok_or_else(|| {
            Error::io(
                format!("accessing segment {index}"),
                std::io::Error::other(format!("store holds only {count} segments")),
            )
        })
    }
}
