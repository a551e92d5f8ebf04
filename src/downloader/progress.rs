//! Progress tracking for batch downloads.
//!
//! A batch run reports its progress after every completed key. The
//! percentage is measured against the upper bound of collectable readings,
//! keys times stations, so a run over stations that rarely report will
//! finish well short of 100% even when every request succeeded. That is
//! expected and the key counters in the same line tell the two apart.

/// Progress counters for a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    /// Readings collected so far across all completed keys.
    pub records_collected: u64,
    /// Keys that completed successfully, empty results included.
    pub keys_completed: u64,
    /// Keys that exhausted their attempts or failed fast.
    pub keys_failed: u64,
    /// Total keys in the run.
    pub keys_total: u64,
    /// Upper bound on collectable readings (keys times stations).
    pub total_possible: u64,
}

impl ProgressState {
    /// Create a tracker for a run over `keys_total` keys and
    /// `station_count` stations of interest.
    pub fn new(keys_total: u64, station_count: u64) -> Self {
        Self {
            records_collected: 0,
            keys_completed: 0,
            keys_failed: 0,
            keys_total,
            total_possible: keys_total.saturating_mul(station_count),
        }
    }

    /// Record a key that completed successfully with `records` readings.
    pub fn record_success(&mut self, records: u64) {
        self.records_collected = self.records_collected.saturating_add(records);
        self.keys_completed += 1;
    }

    /// Record a key that was given up on.
    pub fn record_failure(&mut self) {
        self.keys_failed += 1;
    }

    /// Collected percentage of the upper bound (0-100).
    ///
    /// An empty run has nothing left to collect, so it reports 100.0
    /// rather than dividing by zero.
    pub fn percentage(&self) -> f64 {
        if self.total_possible == 0 {
            return 100.0;
        }
        (self.records_collected as f64 / self.total_possible as f64) * 100.0
    }

    /// Whether every key has been accounted for, one way or the other.
    pub fn is_complete(&self) -> bool {
        self.keys_completed + self.keys_failed >= self.keys_total
    }

    /// Human-readable progress string for logging.
    pub fn format_progress(&self) -> String {
        format!(
            "[PROGRESS] Collected {} of {} possible records - {:.2}% ({}/{} keys)",
            self.records_collected,
            self.total_possible,
            self.percentage(),
            self.keys_completed + self.keys_failed,
            self.keys_total
        )
    }
}
