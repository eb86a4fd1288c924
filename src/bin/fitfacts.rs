//! fitfacts CLI - command-line interface for fitfacts
//!
//! Commands:
//! - dump: print every record in full multi-line format
//! - csv: print selected record fields as CSV rows
//! - steps / pulse / sleep / stress: print one derived view, optionally
//!   emitting a chart spec for an external plotter

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use fitfacts::chart::{ChartKind, ChartSink, ChartSpec, JsonChartSink, ReferenceLine, Series};
use fitfacts::stream::filter_records;
use fitfacts::{
    daily_activity, pulse_series, sleep_sessions, stress_series, ActivityReport, DateWindow,
    HeartRateSample, JsonDecoder, RecordSource, SleepSession, StressSample, DAILY_STEP_GOAL,
    FITFACTS_VERSION,
};

/// fitfacts - derive activity series from decoded tracker files
#[derive(Parser)]
#[command(name = "fitfacts")]
#[command(version = FITFACTS_VERSION)]
#[command(about = "Derive daily activity, heart-rate, sleep, and stress series", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record in full multi-line format
    Dump {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print selected record fields as CSV rows
    Csv {
        #[command(flatten)]
        input: InputArgs,

        /// Comma-separated field names to select
        #[arg(short, long, value_delimiter = ',', required = true, value_name = "FIELDS")]
        fields: Vec<String>,
    },

    /// Daily step, distance, and calorie totals
    Steps {
        #[command(flatten)]
        input: InputArgs,

        /// Emit a chart spec for an external plotter
        #[arg(long)]
        plot: bool,
    },

    /// Heart-rate samples with reconstructed timestamps
    Pulse {
        #[command(flatten)]
        input: InputArgs,

        /// Emit a chart spec for an external plotter
        #[arg(long)]
        plot: bool,
    },

    /// Sleep sessions with duration and quality score
    Sleep {
        #[command(flatten)]
        input: InputArgs,

        /// Emit a chart spec for an external plotter
        #[arg(long)]
        plot: bool,
    },

    /// Stress level readings
    Stress {
        #[command(flatten)]
        input: InputArgs,

        /// Emit a chart spec for an external plotter
        #[arg(long)]
        plot: bool,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Decoded container files (JSON export of the external decoder)
    #[arg(required_unless_present = "batch")]
    files: Vec<PathBuf>,

    /// Read input file names from stdin, one per line
    #[arg(short, long)]
    batch: bool,

    /// Keep records dated on or after this day (YYYY-MM-DD, local time)
    #[arg(long, value_name = "DATE")]
    since: Option<NaiveDate>,

    /// Keep records dated on or before this day (YYYY-MM-DD, local time)
    #[arg(long, value_name = "DATE")]
    until: Option<NaiveDate>,
}

impl InputArgs {
    fn window(&self) -> DateWindow {
        DateWindow::new(self.since, self.until)
    }

    fn paths(&self) -> Result<Vec<PathBuf>, CliError> {
        if self.batch {
            let stdin = io::stdin();
            let mut paths = Vec::new();
            for line in stdin.lock().lines() {
                let line = line?;
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    paths.push(PathBuf::from(trimmed));
                }
            }
            Ok(paths)
        } else {
            Ok(self.files.clone())
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        // A closed pipe means the consumer has everything it wants.
        Err(CliError::Interrupted) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("fitfacts: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Dump { input } => cmd_dump(&input),
        Commands::Csv { input, fields } => cmd_csv(&input, &fields),
        Commands::Steps { input, plot } => cmd_steps(&input, plot),
        Commands::Pulse { input, plot } => cmd_pulse(&input, plot),
        Commands::Sleep { input, plot } => cmd_sleep(&input, plot),
        Commands::Stress { input, plot } => cmd_stress(&input, plot),
    }
}

fn record_source() -> RecordSource<JsonDecoder> {
    RecordSource::new(JsonDecoder).with_progress(atty::is(atty::Stream::Stderr))
}

fn cmd_dump(input: &InputArgs) -> Result<(), CliError> {
    let paths = input.paths()?;
    let source = record_source();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut rows = 0usize;
    for record in filter_records(source.records(&paths), input.window()) {
        for (name, value) in record.fields() {
            writeln!(out, "{}:{}:{}: {}", record.source(), record.group(), name, value)?;
        }
        writeln!(out, "{}:{}:---End of msg---", record.source(), record.group())?;
        rows += 1;
    }

    if rows == 0 {
        eprintln!("no data");
    }
    Ok(())
}

fn cmd_csv(input: &InputArgs, fields: &[String]) -> Result<(), CliError> {
    let paths = input.paths()?;
    let source = record_source();
    let names: Vec<&str> = fields.iter().map(String::as_str).collect();

    let mut writer = csv::Writer::from_writer(io::stdout());
    writer.write_record(&names)?;

    let mut rows = 0usize;
    for record in filter_records(source.records(&paths), input.window()) {
        if !record.has_fields(&names) {
            continue;
        }
        writer.write_record(
            names
                .iter()
                .filter_map(|name| record.field(name))
                .map(ToString::to_string),
        )?;
        rows += 1;
    }
    writer.flush()?;

    if rows == 0 {
        eprintln!("no data");
    }
    Ok(())
}

fn cmd_steps(input: &InputArgs, plot: bool) -> Result<(), CliError> {
    let paths = input.paths()?;
    let source = record_source();

    let Some(report) = daily_activity(source.records(&paths), input.window()) else {
        eprintln!("no data");
        return Ok(());
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for day in &report.days {
        writeln!(
            out,
            "{} {} {:.2} {:.2}",
            day.date.format("%Y-%m-%d"),
            day.steps,
            day.distance_km,
            day.active_calories
        )?;
    }
    drop(out);

    if plot {
        render_chart(&steps_chart(&report))?;
    }
    Ok(())
}

fn cmd_pulse(input: &InputArgs, plot: bool) -> Result<(), CliError> {
    let paths = input.paths()?;
    let source = record_source();

    let samples = pulse_series(source.records(&paths), input.window());
    if samples.is_empty() {
        eprintln!("no data");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for sample in &samples {
        writeln!(
            out,
            "{} {}",
            sample.instant.format("%Y-%m-%dT%H:%M:%S"),
            sample.bpm
        )?;
    }
    drop(out);

    if plot {
        render_chart(&pulse_chart(&samples))?;
    }
    Ok(())
}

fn cmd_sleep(input: &InputArgs, plot: bool) -> Result<(), CliError> {
    let paths = input.paths()?;
    let source = record_source();

    let sessions = sleep_sessions(source.records(&paths), input.window());
    if sessions.is_empty() {
        eprintln!("no data");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for session in &sessions {
        writeln!(
            out,
            "{} {:.2} {}",
            session.ended_at.format("%Y-%m-%d"),
            session.duration_hours,
            session.score
        )?;
    }
    drop(out);

    if plot {
        render_chart(&sleep_chart(&sessions))?;
    }
    Ok(())
}

fn cmd_stress(input: &InputArgs, plot: bool) -> Result<(), CliError> {
    let paths = input.paths()?;
    let source = record_source();

    let samples = stress_series(source.records(&paths), input.window());
    if samples.is_empty() {
        eprintln!("no data");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for sample in &samples {
        writeln!(
            out,
            "{} {}",
            sample.instant.format("%Y-%m-%dT%H:%M:%S"),
            sample.level
        )?;
    }
    drop(out);

    if plot {
        render_chart(&stress_chart(&samples))?;
    }
    Ok(())
}

// Chart construction

fn render_chart(spec: &ChartSpec) -> Result<(), CliError> {
    let stdout = io::stdout();
    JsonChartSink::new(stdout.lock()).render(spec)?;
    Ok(())
}

fn steps_chart(report: &ActivityReport) -> ChartSpec {
    ChartSpec {
        title: "Steps history".to_string(),
        x_label: "Date".to_string(),
        y_label: "Steps".to_string(),
        kind: ChartKind::Bar,
        labels: report
            .days
            .iter()
            .map(|day| day.date.format("%Y-%m-%d").to_string())
            .collect(),
        series: vec![Series {
            label: "Steps".to_string(),
            color: "steelblue".to_string(),
            values: report.days.iter().map(|day| day.steps as f64).collect(),
        }],
        reference_lines: vec![
            ReferenceLine {
                value: f64::from(DAILY_STEP_GOAL),
                label: "Daily goal".to_string(),
                color: "red".to_string(),
            },
            ReferenceLine {
                value: (report.average_steps * 100.0).round() / 100.0,
                label: "Avg. steps / day".to_string(),
                color: "green".to_string(),
            },
        ],
    }
}

fn pulse_chart(samples: &[HeartRateSample]) -> ChartSpec {
    ChartSpec {
        title: "Heart rate over time".to_string(),
        x_label: "Date".to_string(),
        y_label: "Heart rate".to_string(),
        kind: ChartKind::Line,
        labels: samples
            .iter()
            .map(|sample| sample.instant.format("%Y-%m-%dT%H:%M:%S").to_string())
            .collect(),
        series: vec![Series {
            label: "Heart rate".to_string(),
            color: "red".to_string(),
            values: samples.iter().map(|sample| f64::from(sample.bpm)).collect(),
        }],
        reference_lines: Vec::new(),
    }
}

fn sleep_chart(sessions: &[SleepSession]) -> ChartSpec {
    ChartSpec {
        title: "Sleep history".to_string(),
        x_label: "Date".to_string(),
        y_label: "Hours asleep".to_string(),
        kind: ChartKind::Bar,
        labels: sessions
            .iter()
            .map(|session| session.ended_at.format("%Y-%m-%d").to_string())
            .collect(),
        series: vec![Series {
            label: "Sleep duration".to_string(),
            color: "slateblue".to_string(),
            values: sessions.iter().map(|session| session.duration_hours).collect(),
        }],
        reference_lines: Vec::new(),
    }
}

fn stress_chart(samples: &[StressSample]) -> ChartSpec {
    ChartSpec {
        title: "Stress history".to_string(),
        x_label: "Date".to_string(),
        y_label: "Stress level".to_string(),
        kind: ChartKind::Line,
        labels: samples
            .iter()
            .map(|sample| sample.instant.format("%Y-%m-%dT%H:%M:%S").to_string())
            .collect(),
        series: vec![Series {
            label: "Stress level".to_string(),
            color: "orange".to_string(),
            values: samples.iter().map(|sample| sample.level as f64).collect(),
        }],
        reference_lines: Vec::new(),
    }
}

// Error types

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Csv(csv::Error),
    Interrupted,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Io(err) => write!(f, "{}", err),
            CliError::Csv(err) => write!(f, "{}", err),
            CliError::Interrupted => f.write_str("interrupted"),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::BrokenPipe {
            CliError::Interrupted
        } else {
            CliError::Io(err)
        }
    }
}

impl From<csv::Error> for CliError {
    fn from(err: csv::Error) -> Self {
        let interrupted = matches!(
            err.kind(),
            csv::ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::BrokenPipe
        );
        if interrupted {
            CliError::Interrupted
        } else {
            CliError::Csv(err)
        }
    }
}
