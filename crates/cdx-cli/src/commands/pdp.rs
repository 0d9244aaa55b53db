//! Power delay profile command

use std::io::{self, Write};

use clap::Args;
use serde::Serialize;
use tracing::info;

use super::{InputArgs, OutputArgs};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{csv_row, Report};

/// Power delay profile of a continuous-delay link
#[derive(Args, Debug)]
pub struct PdpCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Link to evaluate
    #[arg(short, long)]
    pub link: String,

    /// Probability floor of empty cells, defaults to the configured bound
    #[arg(long)]
    pub lower_prob: Option<f64>,

    /// Upper display bound, defaults to the configured bound
    #[arg(long)]
    pub upper_prob: Option<f64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Rows are power bins, columns are delay bins
#[derive(Debug, Serialize)]
struct PdpReport {
    link: String,
    lower_prob: f64,
    upper_prob: f64,
    delay_axis: Vec<f64>,
    power_axis: Vec<f64>,
    matrix: Vec<Vec<f64>>,
}

impl Report for PdpReport {
    fn write_csv(&self, out: &mut dyn Write) -> io::Result<()> {
        let header = std::iter::once("power_db".to_string())
            .chain(self.delay_axis.iter().map(f64::to_string));
        csv_row(out, header)?;
        for (power, row) in self.power_axis.iter().zip(&self.matrix) {
            csv_row(out, std::iter::once(power).chain(row))?;
        }
        Ok(())
    }
}

impl PdpCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let reader = self.input.open_continuous()?;
        let lower_prob = self.lower_prob.unwrap_or(config.pdp.lower_prob);
        let upper_prob = self.upper_prob.unwrap_or(config.pdp.upper_prob);
        info!(
            "Computing PDP of link '{}' (lower_prob {}, upper_prob {})",
            self.link, lower_prob, upper_prob
        );

        let pdp = reader.compute_pdp(&self.link, lower_prob, upper_prob)?;
        let report = PdpReport {
            link: self.link,
            lower_prob: pdp.lower_prob,
            upper_prob: pdp.upper_prob,
            matrix: pdp.matrix.outer_iter().map(|row| row.to_vec()).collect(),
            delay_axis: pdp.delay_axis,
            power_axis: pdp.power_axis,
        };
        self.output.emit(&report, config)
    }
}
