//! Discrete-delay commands: coherent power and delay-Doppler spectrum

use std::io::{self, Write};

use clap::Args;
use serde::Serialize;
use tracing::info;

use super::{select_links, InputArgs, OutputArgs, WindowArgs};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{csv_row, LinkSeries, Report, SeriesReport};

/// Coherent power of a discrete-delay file
#[derive(Args, Debug)]
pub struct DiscretePowerCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Link to evaluate, all links if omitted
    #[arg(short, long)]
    pub link: Option<String>,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl DiscretePowerCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let reader = self.input.open_discrete()?;
        let window = self.window.window();

        let mut report = Vec::new();
        for link in select_links(&reader, self.link.as_deref()) {
            let power = reader.compute_power(&link, window)?;
            report.push(LinkSeries::single(link, "power", power.times, power.values));
        }
        self.output.emit(&SeriesReport(report), config)
    }
}

/// Delay-Doppler spectrum of a discrete-delay link
#[derive(Args, Debug)]
pub struct SpectrumCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Link to evaluate
    #[arg(short, long)]
    pub link: String,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Rows are delay bins, columns are Doppler bins
#[derive(Debug, Serialize)]
struct SpectrumReport {
    link: String,
    doppler_axis: Vec<f64>,
    delay_axis: Vec<f64>,
    magnitude_db: Vec<Vec<f64>>,
}

impl Report for SpectrumReport {
    fn write_csv(&self, out: &mut dyn Write) -> io::Result<()> {
        let header = std::iter::once("delay_s".to_string())
            .chain(self.doppler_axis.iter().map(f64::to_string));
        csv_row(out, header)?;
        for (delay, row) in self.delay_axis.iter().zip(&self.magnitude_db) {
            csv_row(out, std::iter::once(delay).chain(row))?;
        }
        Ok(())
    }
}

impl SpectrumCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let reader = self.input.open_discrete()?;
        let spectrum = reader.delay_doppler_spectrum(&self.link, self.window.window())?;
        info!(
            "Link '{}': {} delay bins x {} Doppler bins",
            self.link,
            spectrum.delay_axis.len(),
            spectrum.doppler_axis.len()
        );

        let report = SpectrumReport {
            link: self.link,
            magnitude_db: spectrum
                .magnitude_db
                .outer_iter()
                .map(|row| row.to_vec())
                .collect(),
            doppler_axis: spectrum.doppler_axis,
            delay_axis: spectrum.delay_axis,
        };
        self.output.emit(&report, config)
    }
}
