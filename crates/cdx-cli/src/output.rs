//! JSON and CSV rendering of command results

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::CliResult;

/// Output format of command results
#[derive(ValueEnum, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Comma-separated values with a header line
    Csv,
}

/// A command result that can be written in every output format
pub trait Report: Serialize {
    /// Write the result as CSV, header line first
    fn write_csv(&self, out: &mut dyn Write) -> io::Result<()>;
}

/// Write `report` to `out`, or to stdout when no path is given
pub fn emit<R: Report>(report: &R, format: OutputFormat, out: Option<&Path>) -> CliResult<()> {
    let mut writer: Box<dyn Write> = match out {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, report)?;
            writeln!(writer)?;
        }
        OutputFormat::Csv => report.write_csv(&mut writer)?,
    }
    writer.flush()?;

    if let Some(path) = out {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

/// Quote a CSV field if it contains a separator, quote or line break
pub fn csv_field(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Write one CSV line
pub fn csv_row<I, T>(out: &mut dyn Write, fields: I) -> io::Result<()>
where
    I: IntoIterator<Item = T>,
    T: Display,
{
    let line: Vec<String> = fields
        .into_iter()
        .map(|f| csv_field(&f.to_string()).into_owned())
        .collect();
    writeln!(out, "{}", line.join(","))
}

/// Named value columns over the time axis of one link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkSeries {
    /// Link name
    pub link: String,
    /// Time of every sample in seconds
    pub times: Vec<f64>,
    /// Value columns keyed by metric name
    #[serde(flatten)]
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl LinkSeries {
    /// Series with a single value column
    pub fn single(link: impl Into<String>, metric: &str, times: Vec<f64>, values: Vec<f64>) -> Self {
        Self {
            link: link.into(),
            times,
            columns: BTreeMap::from([(metric.to_string(), values)]),
        }
    }
}

/// Time series of one or more links
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SeriesReport(pub Vec<LinkSeries>);

impl Report for SeriesReport {
    fn write_csv(&self, out: &mut dyn Write) -> io::Result<()> {
        let names: Vec<&str> = self
            .0
            .first()
            .map(|s| s.columns.keys().map(String::as_str).collect())
            .unwrap_or_default();
        csv_row(out, ["link", "time_s"].into_iter().chain(names.iter().copied()))?;

        for series in &self.0 {
            for (i, time) in series.times.iter().enumerate() {
                let mut fields = vec![series.link.clone(), time.to_string()];
                for name in &names {
                    let value = series.columns.get(*name).and_then(|c| c.get(i));
                    fields.push(value.map(f64::to_string).unwrap_or_default());
                }
                csv_row(out, fields)?;
            }
        }
        Ok(())
    }
}
