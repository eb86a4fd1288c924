//! fitfacts - derives time-series facts from decoded activity-tracker records
//!
//! An external decoder unpacks the tracker's binary container into grouped
//! field mappings; fitfacts normalizes those into a chronological record
//! stream and derives the views with actual algorithmic content:
//!
//! - **Daily activity**: per-day step/calorie/distance totals
//! - **Pulse**: heart-rate samples re-timestamped from a 16-bit sub-clock
//! - **Sleep**: start/stop lifecycle events paired into scored sessions
//! - **Stress**: sentinel-filtered stress readings
//!
//! Everything else - decoding, chart rendering, output formatting - is glue
//! behind the [`decode::ContainerDecoder`] and [`chart::ChartSink`] seams.

pub mod chart;
pub mod daily;
pub mod decode;
pub mod error;
pub mod pipeline;
pub mod pulse;
pub mod record;
pub mod sleep;
pub mod stream;
pub mod stress;

pub use daily::{ActivityReport, DayTotals, DAILY_STEP_GOAL};
pub use decode::{ContainerDecoder, GroupedMessages, JsonDecoder};
pub use error::DecodeError;
pub use pipeline::{daily_activity, pulse_series, sleep_sessions, stress_series, RecordSource};
pub use pulse::HeartRateSample;
pub use record::{FieldValue, MessageGroup, Record};
pub use sleep::SleepSession;
pub use stream::DateWindow;
pub use stress::StressSample;

/// Crate version, surfaced by the CLI.
pub const FITFACTS_VERSION: &str = env!("CARGO_PKG_VERSION");
