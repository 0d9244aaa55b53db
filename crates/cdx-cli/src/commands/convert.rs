//! Continuous-delay to discrete-delay conversion command

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use cdx_storage::{convert_with_progress, CdxReader, ConversionOptions, ConversionSummary};

use super::{InputArgs, OutputArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{csv_row, Report};

/// Convert a continuous-delay file to discrete delay
#[derive(Args, Debug)]
pub struct ConvertCommand {
    #[command(flatten)]
    pub input: InputArgs,

    /// Discrete-delay file to write
    pub output_file: PathBuf,

    /// Sampling frequency of the output delay axis in Hz
    #[arg(short, long = "sampling-frequency")]
    pub sampling_frequency: f64,

    /// Delay to add before the minimum delay in seconds
    #[arg(short = 'b', long, default_value_t = 0.0)]
    pub delay_before_min: f64,

    /// Delay to add after the maximum delay in seconds
    #[arg(short = 'a', long, default_value_t = 0.0)]
    pub delay_after_max: f64,

    /// Low-pass filter every interpolated CIR with a Hamming window
    #[arg(short, long)]
    pub enable_filtering: bool,

    /// Make component delays relative to the reference delay of their CIR
    #[arg(short = 'r', long)]
    pub subtract_reference_delay: bool,

    /// Only process components of this type
    #[arg(short = 't', long = "type")]
    pub component_type: Option<u16>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl Report for ConversionSummary {
    fn write_csv(&self, out: &mut dyn Write) -> io::Result<()> {
        csv_row(out, ["link", "nof_cirs", "min_delay_s", "max_delay_s", "nof_coeffs"])?;
        for link in &self.links {
            csv_row(
                out,
                [
                    link.name.clone(),
                    self.nof_cirs.to_string(),
                    link.min_delay_s.to_string(),
                    link.max_delay_s.to_string(),
                    link.nof_coeffs.to_string(),
                ],
            )?;
        }
        Ok(())
    }
}

impl ConvertCommand {
    fn options(&self) -> ConversionOptions {
        ConversionOptions {
            delay_before_min_s: self.delay_before_min,
            delay_after_max_s: self.delay_after_max,
            enable_filtering: self.enable_filtering,
            subtract_reference_delay: self.subtract_reference_delay,
            component_type: self.component_type,
            ..ConversionOptions::new(self.sampling_frequency)
        }
    }

    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        if self.input.file == self.output_file {
            return Err(CliError::invalid_args(
                "input and output file must differ",
            ));
        }
        let reader = self.input.open_continuous()?;
        let options = self.options();
        if let Some(t) = options.component_type {
            info!("Only components of type {} are interpolated", t);
        }

        let pb = ProgressBar::new(reader.nof_links() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} links {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        let summary = convert_with_progress(&reader, &self.output_file, &options, |link, done| {
            pb.set_message(link.to_string());
            pb.set_position(done as u64);
        })?;
        pb.finish_with_message("done");

        info!(
            "Wrote {} ({} links, {} CIRs)",
            self.output_file.display(),
            summary.links.len(),
            summary.nof_cirs
        );
        self.output.emit(&summary, config)
    }
}
