//! Pipeline orchestration
//!
//! This module provides the public API of fitfacts: a record source that
//! drives decode -> normalize over a batch of files, and one view function
//! per derivation. One file is decoded and drained before the next begins;
//! a decode failure skips that file and the batch continues.

use std::path::PathBuf;

use log::{info, warn};

use crate::daily::{ActivityReport, DailyActivity};
use crate::decode::{ContainerDecoder, GroupedMessages};
use crate::pulse::{reconstruct, HeartRateSample};
use crate::record::{MessageGroup, Record};
use crate::sleep::{self, SleepSession};
use crate::stream::{filter_records, DateWindow};
use crate::stress::{filter_stress, StressSample};

/// Normalize one decoded container into records, in decoder order.
pub fn normalize(source: String, messages: GroupedMessages) -> impl Iterator<Item = Record> {
    messages.into_iter().flat_map(move |(name, messages)| {
        let group = MessageGroup::from_name(&name);
        let source = source.clone();
        messages
            .into_iter()
            .map(move |fields| Record::new(source.clone(), group.clone(), fields))
    })
}

/// Lazily streams normalized records out of a batch of container files.
pub struct RecordSource<D> {
    decoder: D,
    progress: bool,
}

impl<D: ContainerDecoder> RecordSource<D> {
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            progress: false,
        }
    }

    /// Print a progress line to stderr as each file is opened. Progress is
    /// interleaved output and may be cut short; it is never part of the
    /// result.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// All records of all files, one file drained before the next begins.
    ///
    /// A file the decoder rejects is logged with its underlying error and
    /// skipped; the remaining files still contribute.
    pub fn records<'a>(&'a self, paths: &'a [PathBuf]) -> impl Iterator<Item = Record> + 'a {
        paths.iter().flat_map(move |path| {
            let name = path.display().to_string();
            if self.progress {
                eprintln!("reading {}", name);
            }
            match self.decoder.decode(path) {
                Ok(messages) => {
                    info!("decoded {}", name);
                    normalize(name, messages).collect::<Vec<_>>()
                }
                Err(err) => {
                    warn!("skipping {}: {}", name, err);
                    Vec::new()
                }
            }
        })
    }
}

/// Daily step/distance/calorie totals over the windowed stream.
///
/// Returns `None` when no day received data.
pub fn daily_activity<I>(records: I, window: DateWindow) -> Option<ActivityReport>
where
    I: IntoIterator<Item = Record>,
{
    let mut fold = DailyActivity::new();
    for record in filter_records(records, window) {
        fold.ingest(&record);
    }
    fold.finish()
}

/// Heart-rate samples with reconstructed instants, windowed.
///
/// The window applies *after* reconstruction: raw 16-bit samples carry no
/// absolute date to filter on.
pub fn pulse_series<I>(records: I, window: DateWindow) -> Vec<HeartRateSample>
where
    I: IntoIterator<Item = Record>,
{
    reconstruct(records)
        .filter(|sample| window.contains_date(sample.instant.date_naive()))
        .collect()
}

/// Sleep sessions over the windowed stream, in close order.
pub fn sleep_sessions<I>(records: I, window: DateWindow) -> Vec<SleepSession>
where
    I: IntoIterator<Item = Record>,
{
    sleep::extract(filter_records(records, window))
}

/// Valid stress samples over the windowed stream.
pub fn stress_series<I>(records: I, window: DateWindow) -> Vec<StressSample>
where
    I: IntoIterator<Item = Record>,
{
    filter_stress(filter_records(records, window)).collect()
}
