//! Daily activity aggregation
//!
//! Folds monitoring records into per-day, per-activity-type totals:
//! - Each (date, activity type) pair keeps the *last* snapshot, not a sum
//! - Day rows sum steps, distance (km), and active calories across types
//! - A whole-range average steps/day scalar feeds the chart reference line

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::record::{MessageGroup, Record};
use crate::stream::ChronologyGuard;

/// Fixed daily steps goal, drawn as a chart reference line.
pub const DAILY_STEP_GOAL: u32 = 10_000;

/// One cumulative activity snapshot for a (date, activity type) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityRecord {
    pub active_calories: f64,
    pub distance_meters: f64,
    pub steps: u64,
}

/// Totals for one calendar day, summed across activity types.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayTotals {
    pub date: NaiveDate,
    pub steps: u64,
    pub distance_km: f64,
    pub active_calories: f64,
}

/// Aggregated activity view over the whole requested range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityReport {
    /// One row per day, ascending by date.
    pub days: Vec<DayTotals>,
    pub total_steps: u64,
    /// `total_steps / days.len()`; callers draw this as a reference line.
    pub average_steps: f64,
}

/// Fold of monitoring records into daily activity buckets.
///
/// Precondition: records arrive in non-decreasing timestamp order within one
/// source file. The device reports each (date, activity type) pair as a
/// cumulative snapshot, so a later record *overwrites* the earlier one and
/// ordering decides which snapshot survives. Violations are flagged by the
/// embedded [`ChronologyGuard`], not repaired.
#[derive(Debug, Default)]
pub struct DailyActivity {
    buckets: BTreeMap<NaiveDate, BTreeMap<String, ActivityRecord>>,
    guard: ChronologyGuard,
}

impl DailyActivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record in. Non-monitoring records and records missing
    /// `steps`, `activity_type`, or a timestamp are skipped silently.
    pub fn ingest(&mut self, record: &Record) {
        if record.group() != &MessageGroup::Monitoring {
            return;
        }
        let Some(instant) = record.timestamp() else {
            return;
        };
        let Some(steps) = record.uint("steps") else {
            return;
        };
        let Some(kind) = record.field("activity_type").map(ToString::to_string) else {
            return;
        };

        self.guard.observe(record);

        let date = instant.with_timezone(&Local).date_naive();
        let snapshot = ActivityRecord {
            active_calories: record.float("active_calories").unwrap_or(0.0),
            distance_meters: record.float("distance").unwrap_or(0.0),
            steps,
        };
        self.buckets.entry(date).or_default().insert(kind, snapshot);
    }

    /// Number of out-of-order records observed so far.
    pub fn regressions(&self) -> usize {
        self.guard.regressions()
    }

    /// Finish the fold. Returns `None` when no day received data, so the
    /// zero-day average is a reportable condition rather than a division.
    pub fn finish(self) -> Option<ActivityReport> {
        if self.buckets.is_empty() {
            return None;
        }

        let days: Vec<DayTotals> = self
            .buckets
            .into_iter()
            .map(|(date, by_type)| {
                let mut steps = 0u64;
                let mut distance_meters = 0.0;
                let mut active_calories = 0.0;
                for snapshot in by_type.values() {
                    steps += snapshot.steps;
                    distance_meters += snapshot.distance_meters;
                    active_calories += snapshot.active_calories;
                }
                DayTotals {
                    date,
                    steps,
                    distance_km: round2(distance_meters / 1000.0),
                    active_calories,
                }
            })
            .collect();

        let total_steps: u64 = days.iter().map(|day| day.steps).sum();
        let average_steps = total_steps as f64 / days.len() as f64;

        Some(ActivityReport {
            days,
            total_steps,
            average_steps,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn local_time(day: u32, hour: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2024, 1, day, hour, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn monitoring(
        instant: DateTime<Utc>,
        activity_type: &str,
        steps: u64,
        distance: f64,
        calories: f64,
    ) -> Record {
        Record::new(
            "activity.json",
            MessageGroup::Monitoring,
            [
                ("timestamp".to_string(), FieldValue::Instant(instant)),
                ("steps".to_string(), FieldValue::Uint(steps)),
                (
                    "activity_type".to_string(),
                    FieldValue::Text(activity_type.to_string()),
                ),
                ("distance".to_string(), FieldValue::Float(distance)),
                ("active_calories".to_string(), FieldValue::Float(calories)),
            ]
            .into_iter()
            .collect(),
        )
    }

    #[test]
    fn test_same_day_same_type_overwrites() {
        let mut fold = DailyActivity::new();
        fold.ingest(&monitoring(local_time(15, 9), "running", 100, 800.0, 30.0));
        fold.ingest(&monitoring(local_time(15, 18), "running", 150, 1200.0, 45.0));

        let report = fold.finish().unwrap();
        assert_eq!(report.days.len(), 1);
        assert_eq!(report.days[0].steps, 150);
        assert_eq!(report.days[0].distance_km, 1.2);
        assert_eq!(report.days[0].active_calories, 45.0);
    }

    #[test]
    fn test_day_sums_across_activity_types() {
        let mut fold = DailyActivity::new();
        fold.ingest(&monitoring(local_time(15, 9), "walking", 4000, 3000.0, 120.0));
        fold.ingest(&monitoring(local_time(15, 18), "running", 6000, 5500.0, 380.0));

        let report = fold.finish().unwrap();
        assert_eq!(report.days[0].steps, 10_000);
        assert_eq!(report.days[0].distance_km, 8.5);
        assert_eq!(report.days[0].active_calories, 500.0);
    }

    #[test]
    fn test_days_sorted_and_average() {
        let mut fold = DailyActivity::new();
        fold.ingest(&monitoring(local_time(16, 9), "walking", 9000, 0.0, 0.0));
        fold.ingest(&monitoring(local_time(14, 9), "walking", 3000, 0.0, 0.0));

        let report = fold.finish().unwrap();
        let dates: Vec<u32> = report
            .days
            .iter()
            .map(|day| chrono::Datelike::day(&day.date))
            .collect();
        assert_eq!(dates, vec![14, 16]);
        assert_eq!(report.total_steps, 12_000);
        assert_eq!(report.average_steps, 6000.0);
    }

    #[test]
    fn test_zero_days_is_no_data() {
        let fold = DailyActivity::new();
        assert_eq!(fold.finish(), None);
    }

    #[test]
    fn test_missing_gate_fields_are_skipped() {
        let mut fold = DailyActivity::new();

        let mut fields = monitoring(local_time(15, 9), "walking", 100, 0.0, 0.0)
            .fields()
            .clone();
        fields.remove("activity_type");
        fold.ingest(&Record::new(
            "activity.json",
            MessageGroup::Monitoring,
            fields,
        ));

        assert_eq!(fold.finish(), None);
    }

    #[test]
    fn test_numeric_activity_type_tags_bucket() {
        // Some decoders leave activity_type as its raw enum ordinal.
        let mut fold = DailyActivity::new();
        let record = Record::new(
            "activity.json",
            MessageGroup::Monitoring,
            [
                ("timestamp".to_string(), FieldValue::Instant(local_time(15, 9))),
                ("steps".to_string(), FieldValue::Uint(500)),
                ("activity_type".to_string(), FieldValue::Uint(6)),
            ]
            .into_iter()
            .collect(),
        );
        fold.ingest(&record);

        let report = fold.finish().unwrap();
        assert_eq!(report.days[0].steps, 500);
    }
}
