//! Chart boundary
//!
//! Rendering is an external collaborator; this module carries the display
//! model handed to it - fully computed labels, series, and reference lines,
//! never raw records - and a sink that serializes the model for an external
//! plotting tool.

use std::io::{self, Write};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
}

/// One plotted series.
#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub label: String,
    pub color: String,
    pub values: Vec<f64>,
}

/// A fixed horizontal reference line, e.g. the daily steps goal.
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub label: String,
    pub color: String,
}

/// Everything a renderer needs to draw one chart.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub kind: ChartKind,
    /// X-axis labels, one per value position.
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    pub reference_lines: Vec<ReferenceLine>,
}

/// Chart rendering collaborator.
pub trait ChartSink {
    fn render(&mut self, spec: &ChartSpec) -> io::Result<()>;
}

/// Sink writing the chart spec as one JSON document for an external plotter.
#[derive(Debug)]
pub struct JsonChartSink<W: Write> {
    out: W,
}

impl<W: Write> JsonChartSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> ChartSink for JsonChartSink<W> {
    fn render(&mut self, spec: &ChartSpec) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, spec)?;
        writeln!(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_json_sink_round_trip() {
        let spec = ChartSpec {
            title: "Steps history".to_string(),
            x_label: "Date".to_string(),
            y_label: "Steps".to_string(),
            kind: ChartKind::Bar,
            labels: vec!["2024-01-15".to_string(), "2024-01-16".to_string()],
            series: vec![Series {
                label: "Steps".to_string(),
                color: "steelblue".to_string(),
                values: vec![8500.0, 11200.0],
            }],
            reference_lines: vec![ReferenceLine {
                value: 10_000.0,
                label: "Daily goal".to_string(),
                color: "red".to_string(),
            }],
        };

        let mut buffer = Vec::new();
        JsonChartSink::new(&mut buffer).render(&spec).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["kind"], "bar");
        assert_eq!(value["labels"][1], "2024-01-16");
        assert_eq!(value["series"][0]["values"][1], 11200.0);
        assert_eq!(value["reference_lines"][0]["value"], 10000.0);
    }
}
