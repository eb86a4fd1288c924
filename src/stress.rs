//! Stress sample filtering
//!
//! Stress records carry a full per-sample timestamp, so no state crosses
//! records here; the filter drops sentinel readings and converts the rest to
//! local time.

use chrono::{DateTime, Local};

use crate::record::{MessageGroup, Record};

/// One stress reading; `level` is 0-100 by device convention, negative
/// values are the device's "no reading" sentinel and never appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressSample {
    pub instant: DateTime<Local>,
    pub level: i64,
}

/// Filter a record stream down to valid stress samples, lazily.
///
/// Only strictly negative levels are sentinels; there is no upper-bound
/// clamp, out-of-scale positive readings pass through as reported.
pub fn filter_stress<I>(records: I) -> impl Iterator<Item = StressSample>
where
    I: IntoIterator<Item = Record>,
{
    records.into_iter().filter_map(|record| sample_of(&record))
}

fn sample_of(record: &Record) -> Option<StressSample> {
    if record.group() != &MessageGroup::StressLevel {
        return None;
    }
    let instant = record.timestamp()?;
    let level = record.int("stress_level_value")?;
    if level < 0 {
        return None;
    }
    Some(StressSample {
        instant: instant.with_timezone(&Local),
        level,
    })
}
