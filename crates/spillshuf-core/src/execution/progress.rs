//! Progress callbacks.

/// The phase a progress event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Phase 1: chunk permutation into segments.
    Chunk,
    /// Phase 2: merging segments into the output.
    Merge,
}

impl Phase {
    /// Returns a human-readable name for the phase.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chunk => "chunk",
            Self::Merge => "merge",
        }
    }
}

/// Receives progress events from the shuffle phases.
///
/// Every method has an empty default, so observers only implement what they
/// display.
pub trait ProgressObserver {
    /// Called when a phase starts.
    fn on_phase_started(&self, _phase: Phase) {}

    /// Called after segment `segment` was written; `records` is the running
    /// total for the phase.
    fn on_chunk_written(&self, _segment: usize, _records: u64) {}

    /// Called after merge round `round` was appended to the output;
    /// `records` is the running total for the phase.
    fn on_merge_round(&self, _round: u64, _records: u64) {}

    /// Called when a phase completes successfully.
    fn on_phase_finished(&self, _phase: Phase, _records: u64) {}
}

/// Discards all progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {}
