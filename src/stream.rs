//! Record stream tools
//!
//! - [`DateWindow`] - inclusive since/until predicate over local calendar dates
//! - [`filter_records`] - lazy, order-preserving date filter
//! - [`ChronologyGuard`] - flags violations of the per-file ordering precondition

use chrono::{DateTime, Local, NaiveDate, Utc};
use log::warn;

use crate::record::Record;

/// Inclusive date range, each bound optional, interpreted in local time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    since: Option<NaiveDate>,
    until: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(since: Option<NaiveDate>, until: Option<NaiveDate>) -> Self {
        Self { since, until }
    }

    /// Whether a local calendar date falls inside the window.
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.since.map_or(true, |since| since <= date)
            && self.until.map_or(true, |until| date <= until)
    }

    /// Whether an absolute instant falls inside the window, by its local date.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.contains_date(instant.with_timezone(&Local).date_naive())
    }

    /// Whether a record passes the filter.
    ///
    /// A record with no resolvable timestamp always passes: date-range
    /// filters are time-series tools, and non-timeseries records (trailing
    /// sleep assessments, static metadata) must not be silently dropped.
    pub fn admits(&self, record: &Record) -> bool {
        match record.timestamp() {
            Some(instant) => self.contains(instant),
            None => true,
        }
    }
}

/// Filter a record stream by date window.
///
/// Lazy, single-pass, and order-preserving; mirrors its input.
pub fn filter_records<I>(records: I, window: DateWindow) -> impl Iterator<Item = Record>
where
    I: IntoIterator<Item = Record>,
{
    records.into_iter().filter(move |record| window.admits(record))
}

/// Watches a record stream for timestamp regressions.
///
/// The aggregation and reconstruction folds assume non-decreasing timestamps
/// within one source file. The guard makes that precondition observable:
/// each regression is logged and counted, and the watermark resets when the
/// source changes.
#[derive(Debug, Default)]
pub struct ChronologyGuard {
    current: Option<(String, DateTime<Utc>)>,
    regressions: usize,
}

impl ChronologyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe the next record; returns `false` when it is out of order.
    ///
    /// Records without a timestamp neither advance nor violate the watermark.
    pub fn observe(&mut self, record: &Record) -> bool {
        let Some(instant) = record.timestamp() else {
            return true;
        };

        let in_order = match &self.current {
            Some((source, watermark)) if source == record.source() => *watermark <= instant,
            _ => true,
        };

        if in_order {
            self.current = Some((record.source().to_string(), instant));
        } else {
            self.regressions += 1;
            warn!(
                "out-of-order record in {}: {} precedes the stream watermark",
                record.source(),
                instant
            );
        }

        in_order
    }

    pub fn regressions(&self) -> usize {
        self.regressions
    }
}
