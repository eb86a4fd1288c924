//! Heart-rate timestamp reconstruction
//!
//! The tracker interleaves rare full timestamps with frequent 16-bit counter
//! samples. [`PulseClock`] anchors the counter against the last full
//! timestamp and advances one record at a time, so each transition is
//! testable in isolation.

use chrono::{DateTime, Local, TimeZone, Utc};

use crate::record::{MessageGroup, Record};
use crate::stream::ChronologyGuard;

/// One heart-rate reading with a reconstructed absolute instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartRateSample {
    pub instant: DateTime<Local>,
    pub bpm: u16,
}

/// Reconstruction state: the anchor instant and the last 16-bit counter.
///
/// A counter reset or repeat (`prev16 >= t16`) contributes a zero delta
/// rather than a modular unwrap; the device's counter semantics around
/// wraparound are not well-defined enough to guess. Accuracy degrades,
/// order does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulseClock {
    anchor: Option<i64>,
    prev16: Option<u16>,
}

impl PulseClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by one monitoring record.
    ///
    /// A full `timestamp` re-anchors the clock and clears the counter epoch.
    /// A record carrying both a 16-bit counter and a heart rate yields a
    /// sample; heart-rate records seen before any full timestamp have
    /// nothing to anchor to and are dropped.
    pub fn advance(&mut self, record: &Record) -> Option<HeartRateSample> {
        if record.group() != &MessageGroup::Monitoring {
            return None;
        }

        if let Some(instant) = record.timestamp() {
            self.anchor = Some(instant.timestamp());
            self.prev16 = None;
        }

        let t16 = record
            .uint("timestamp_16")
            .and_then(|value| u16::try_from(value).ok())?;
        let bpm = record
            .uint("heart_rate")
            .and_then(|value| u16::try_from(value).ok())?;
        let anchor = self.anchor?;

        let delta = match self.prev16 {
            Some(prev16) if prev16 < t16 => i64::from(t16 - prev16),
            _ => 0,
        };
        let reconstructed = anchor + delta;

        self.prev16 = Some(t16);
        self.anchor = Some(reconstructed);

        let instant = Utc
            .timestamp_opt(reconstructed, 0)
            .single()?
            .with_timezone(&Local);
        Some(HeartRateSample { instant, bpm })
    }
}

/// Reconstruct heart-rate samples from a record stream, lazily.
pub fn reconstruct<I>(records: I) -> impl Iterator<Item = HeartRateSample>
where
    I: IntoIterator<Item = Record>,
{
    let mut clock = PulseClock::new();
    let mut guard = ChronologyGuard::new();
    records.into_iter().filter_map(move |record| {
        guard.observe(&record);
        clock.advance(&record)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldMap, FieldValue};
    use pretty_assertions::assert_eq;

    fn full_timestamp(secs: i64) -> Record {
        let instant = Utc.timestamp_opt(secs, 0).unwrap();
        Record::new(
            "activity.json",
            MessageGroup::Monitoring,
            [("timestamp".to_string(), FieldValue::Instant(instant))]
                .into_iter()
                .collect(),
        )
    }

    fn counter_sample(t16: u64, bpm: u64) -> Record {
        Record::new(
            "activity.json",
            MessageGroup::Monitoring,
            [
                ("timestamp_16".to_string(), FieldValue::Uint(t16)),
                ("heart_rate".to_string(), FieldValue::Uint(bpm)),
            ]
            .into_iter()
            .collect(),
        )
    }

    fn anchored_sample(secs: i64, t16: u64, bpm: u64) -> Record {
        let mut fields: FieldMap = counter_sample(t16, bpm).fields().clone();
        fields.insert(
            "timestamp".to_string(),
            FieldValue::Instant(Utc.timestamp_opt(secs, 0).unwrap()),
        );
        Record::new("activity.json", MessageGroup::Monitoring, fields)
    }

    const EPOCH: i64 = 1_705_310_000;

    #[test]
    fn test_deltas_chain_within_epoch() {
        let mut clock = PulseClock::new();

        assert_eq!(clock.advance(&full_timestamp(EPOCH)), None);

        let first = clock.advance(&counter_sample(1000, 60)).unwrap();
        assert_eq!(first.instant.timestamp(), EPOCH);
        assert_eq!(first.bpm, 60);

        let second = clock.advance(&counter_sample(1010, 62)).unwrap();
        assert_eq!(second.instant.timestamp(), EPOCH + 10);

        let third = clock.advance(&counter_sample(1025, 64)).unwrap();
        assert_eq!(third.instant.timestamp(), EPOCH + 25);
    }

    #[test]
    fn test_counter_reset_means_no_advance() {
        let mut clock = PulseClock::new();
        clock.advance(&full_timestamp(EPOCH));
        clock.advance(&counter_sample(1000, 60));
        let moved = clock.advance(&counter_sample(1010, 62)).unwrap();
        assert_eq!(moved.instant.timestamp(), EPOCH + 10);

        // Reset: counter went backwards, instant must stay put exactly.
        let held = clock.advance(&counter_sample(5, 64)).unwrap();
        assert_eq!(held.instant.timestamp(), EPOCH + 10);

        // Equal counter is also "no advance".
        let held_again = clock.advance(&counter_sample(5, 66)).unwrap();
        assert_eq!(held_again.instant.timestamp(), EPOCH + 10);
    }

    #[test]
    fn test_full_timestamp_reanchors() {
        let mut clock = PulseClock::new();
        clock.advance(&full_timestamp(EPOCH));
        clock.advance(&counter_sample(1000, 60));

        clock.advance(&full_timestamp(EPOCH + 3600));
        // First sample of the new epoch sits on the new anchor even though
        // its counter is lower than the previous epoch's.
        let sample = clock.advance(&counter_sample(10, 70)).unwrap();
        assert_eq!(sample.instant.timestamp(), EPOCH + 3600);
    }

    #[test]
    fn test_anchorless_samples_are_dropped() {
        let mut clock = PulseClock::new();
        assert_eq!(clock.advance(&counter_sample(1000, 60)), None);
    }

    #[test]
    fn test_record_with_both_rules_applies_reset_first() {
        let mut clock = PulseClock::new();
        clock.advance(&full_timestamp(EPOCH));
        clock.advance(&counter_sample(1000, 60));

        let sample = clock.advance(&anchored_sample(EPOCH + 500, 1200, 72)).unwrap();
        assert_eq!(sample.instant.timestamp(), EPOCH + 500);
    }

    #[test]
    fn test_monotonic_within_epoch() {
        let records = vec![
            full_timestamp(EPOCH),
            counter_sample(100, 60),
            counter_sample(90, 61),
            counter_sample(140, 62),
            counter_sample(150, 63),
        ];

        let samples: Vec<HeartRateSample> = reconstruct(records).collect();
        assert_eq!(samples.len(), 4);
        for pair in samples.windows(2) {
            assert!(pair[0].instant <= pair[1].instant);
        }
    }
}
