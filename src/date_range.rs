//! Query key generation over date intervals.
//!
//! A run is driven by a finite sequence of query keys: one [`NaiveDate`] per
//! calendar day in daily mode, or one first-of-month date per month in
//! monthly mode. [`DateRange`] produces that sequence lazily as an iterator;
//! cloning it restarts the sequence from the beginning.

use crate::Granularity;
use chrono::{Datelike, Days, NaiveDate};

/// Lazy, restartable sequence of query keys covering an inclusive interval.
///
/// Daily mode yields every calendar day from start to end. Monthly mode
/// yields the first of every month from start's month through end's month,
/// regardless of the day-of-month either bound carries. Output is strictly
/// increasing with no duplicates and is deterministic for given inputs.
#[derive(Debug, Clone)]
pub struct DateRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
    granularity: Granularity,
}

impl DateRange {
    /// Build the key sequence for `[start, end]` at the given granularity.
    ///
    /// An interval that contains no keys (start past end) yields nothing;
    /// that is a valid empty sequence, not an error.
    pub fn new(start: NaiveDate, end: NaiveDate, granularity: Granularity) -> Self {
        let first = match granularity {
            Granularity::Daily => Some(start),
            // A month is addressed by its first day no matter where in the
            // month the requested interval starts.
            Granularity::Monthly => start.with_day(1),
        };

        Self {
            next: first.filter(|key| *key <= end),
            end,
            granularity,
        }
    }

    fn advance(&self, current: NaiveDate) -> Option<NaiveDate> {
        match self.granularity {
            Granularity::Daily => current.succ_opt(),
            // 32 days is longer than any month, so the jump always lands in
            // the following month; truncating to day 1 gives its key.
            Granularity::Monthly => current.checked_add_days(Days::new(32))?.with_day(1),
        }
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next?;
        self.next = self.advance(current).filter(|key| *key <= self.end);
        Some(current)
    }
}
