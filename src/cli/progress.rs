//! Terminal progress display for sync runs
//!
//! [`SyncProgress`] implements [`SyncObserver`] with indicatif: a spinner
//! while the listing is enumerated, then a bar over the detail requests.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::app::{FetchReason, MergeCounts, SyncObserver};

/// Progress bar observer for the sync command
#[derive(Debug)]
pub struct SyncProgress {
    bar: ProgressBar,
}

impl SyncProgress {
    /// Create a progress display; `enabled = false` draws nothing
    pub fn new(enabled: bool) -> Self {
        let bar = ProgressBar::new_spinner();
        if enabled {
            bar.set_style(spinner_style());
            bar.set_message("Listing recordings...");
            bar.enable_steady_tick(Duration::from_millis(120));
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }

    /// Number of detail requests completed so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the display without a final message (used on failure)
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["◐", "◓", "◑", "◒", "●"])
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

impl SyncObserver for SyncProgress {
    fn listed(&mut self, records: usize) {
        self.bar.set_message(format!("Listed {} recordings", records));
    }

    fn planned(&mut self, counts: &MergeCounts) {
        self.bar.set_style(bar_style());
        self.bar.set_length(counts.fetches() as u64);
        self.bar.set_position(0);
        self.bar.set_message("Fetching file details");
    }

    fn fetching(&mut self, vod_id: &str, reason: FetchReason) {
        self.bar.set_message(format!("{} ({})", vod_id, reason));
    }

    fn fetched(&mut self, _vod_id: &str, _files: usize) {
        self.bar.inc(1);
    }

    fn finished(&mut self) {
        self.bar.finish_and_clear();
    }
}
