//! Sleep session extraction
//!
//! Pairs start/stop lifecycle events into sleep sessions and attaches the
//! trailing quality score. The machine is an explicit state struct advanced
//! one record at a time:
//!
//! `Idle` -> start -> `Open` -> stop -> `AwaitingScore` -> score -> `Idle`

use chrono::{DateTime, Local, NaiveDate, Utc};
use log::warn;

use crate::record::{MessageGroup, Record};

/// One completed sleep session.
///
/// `score` is 0 when no assessment record followed the session's stop event
/// before the next one started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SleepSession {
    /// Local calendar date of the stop event.
    pub ended_at: NaiveDate,
    /// Hours between start and stop, rounded to two decimals.
    pub duration_hours: f64,
    pub score: u8,
}

#[derive(Debug, Clone, Copy, Default)]
enum Phase {
    #[default]
    Idle,
    Open { started: DateTime<Utc> },
    AwaitingScore,
}

/// State machine pairing lifecycle events into [`SleepSession`]s.
///
/// Score attribution is positional: an assessment record lands on the most
/// recently appended session, whatever it was. Two stops with no assessment
/// in between therefore leave the first session at score 0 and give the
/// second whichever score arrives next; the device protocol offers nothing
/// better to key on.
#[derive(Debug, Default)]
pub struct SleepTracker {
    phase: Phase,
    sessions: Vec<SleepSession>,
}

impl SleepTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the machine by one record. Records that are neither lifecycle
    /// events nor sleep assessments never cause a transition.
    pub fn observe(&mut self, record: &Record) {
        match record.group() {
            MessageGroup::Event => self.observe_event(record),
            MessageGroup::SleepAssessment => self.observe_assessment(record),
            _ => {}
        }
    }

    fn observe_event(&mut self, record: &Record) {
        let Some(kind) = record.text("event_type") else {
            return;
        };
        match kind {
            "start" => {
                let Some(started) = record.timestamp() else {
                    return;
                };
                if let Phase::Open { started: abandoned } = self.phase {
                    // Second start with no intervening stop: the open session
                    // is dropped, not reported.
                    warn!(
                        "{}: sleep start at {} abandons the session opened at {}",
                        record.source(),
                        started,
                        abandoned
                    );
                }
                self.phase = Phase::Open { started };
            }
            "stop" | "stop_all" => {
                let Phase::Open { started } = self.phase else {
                    return;
                };
                let Some(stopped) = record.timestamp() else {
                    return;
                };
                if stopped < started {
                    warn!(
                        "{}: sleep stop at {} precedes its start at {}, session rejected",
                        record.source(),
                        stopped,
                        started
                    );
                    self.phase = Phase::Idle;
                    return;
                }
                let hours = (stopped - started).num_seconds() as f64 / 3600.0;
                self.sessions.push(SleepSession {
                    ended_at: stopped.with_timezone(&Local).date_naive(),
                    duration_hours: round2(hours),
                    score: 0,
                });
                self.phase = Phase::AwaitingScore;
            }
            _ => {}
        }
    }

    fn observe_assessment(&mut self, record: &Record) {
        if !matches!(self.phase, Phase::AwaitingScore) {
            return;
        }
        let Some(score) = record.uint("overall_sleep_score") else {
            return;
        };
        if let Some(last) = self.sessions.last_mut() {
            last.score = u8::try_from(score).unwrap_or(u8::MAX);
        }
        self.phase = Phase::Idle;
    }

    /// Finish the stream. A session still waiting for its score is dangling
    /// and is discarded; no partial session is ever emitted.
    pub fn finish(mut self) -> Vec<SleepSession> {
        if matches!(self.phase, Phase::AwaitingScore) {
            self.sessions.pop();
        }
        self.sessions
    }
}

/// Extract sleep sessions from a record stream.
pub fn extract<I>(records: I) -> Vec<SleepSession>
where
    I: IntoIterator<Item = Record>,
{
    let mut tracker = SleepTracker::new();
    for record in records {
        tracker.observe(&record);
    }
    tracker.finish()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
