//! Terminal progress bars for the shuffle phases.

use indicatif::{ProgressBar, ProgressStyle};
use spillshuf_core::execution::{Phase, ProgressObserver};

/// Shows one progress bar per phase, measured in records.
pub struct TerminalProgress {
    bar: ProgressBar,
    total: u64,
}

impl TerminalProgress {
    /// Creates a progress display for `total` records.
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template(
                "{prefix:>6} [{bar:40.cyan/blue}] {pos}/{len} records ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );
        Self { bar, total }
    }
}

impl ProgressObserver for TerminalProgress {
    fn on_phase_started(&self, phase: Phase) {
        self.bar.reset();
        self.bar.set_length(self.total);
        self.bar.set_prefix(phase.name());
    }

    fn on_chunk_written(&self, _segment: usize, records: u64) {
        self.bar.set_position(records);
    }

    fn on_merge_round(&self, _round: u64, records: u64) {
        self.bar.set_position(records);
    }

    fn on_phase_finished(&self, phase: Phase, records: u64) {
        self.bar.set_position(records);
        if phase == Phase::Merge {
            self.bar.finish_and_clear();
        }
    }
}
