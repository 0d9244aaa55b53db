//! CLI command implementations for CDX files

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use cdx_storage::{CdxFile, CdxReader, ContinuousDelayReader, DiscreteDelayReader, Window};

use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{self, OutputFormat, Report};

pub mod convert;
pub mod discrete;
pub mod info;
pub mod metrics;
pub mod pdp;

/// cdx - inspect, analyse and convert Channel Data Exchange files
#[derive(Parser, Debug)]
#[command(
    name = "cdx",
    version,
    about = "Inspect, analyse and convert Channel Data Exchange (CDX) files",
    long_about = "cdx reads channel impulse response files written by propagation \
                  simulators and emits the derived metrics (power series, multipath \
                  spread, power delay profiles, delay-Doppler spectra) as JSON or CSV \
                  for plotting tools. It also converts continuous-delay files to the \
                  discrete-delay variant."
)]
pub struct CdxCli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CDX_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show parameters and links of a file
    Info(info::InfoCommand),

    /// Per-instant metrics of a continuous-delay file
    Metrics(metrics::MetricsCommand),

    /// Power delay profile of a continuous-delay link
    Pdp(pdp::PdpCommand),

    /// Coherent power of a discrete-delay file
    DiscretePower(discrete::DiscretePowerCommand),

    /// Delay-Doppler spectrum of a discrete-delay link
    Spectrum(discrete::SpectrumCommand),

    /// Convert a continuous-delay file to discrete delay
    Convert(convert::ConvertCommand),
}

impl CdxCli {
    /// Execute the CLI command
    pub fn execute(self, config: CliConfig) -> CliResult<()> {
        match self.command {
            Commands::Info(cmd) => cmd.execute(&config),
            Commands::Metrics(cmd) => cmd.execute(&config),
            Commands::Pdp(cmd) => cmd.execute(&config),
            Commands::DiscretePower(cmd) => cmd.execute(&config),
            Commands::Spectrum(cmd) => cmd.execute(&config),
            Commands::Convert(cmd) => cmd.execute(&config),
        }
    }
}

/// Input file of a reading command
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// CDX file to read
    pub file: PathBuf,

    /// Open a file whose writer never closed, recovering the complete CIRs
    #[arg(long)]
    pub recover: bool,
}

impl InputArgs {
    /// Open the file with the reader matching its variant
    pub fn open(&self) -> CliResult<CdxFile> {
        let file = if self.recover {
            CdxFile::open_unfinalized(&self.file)?
        } else {
            CdxFile::open(&self.file)?
        };
        Ok(file)
    }

    /// Open a continuous-delay file
    pub fn open_continuous(&self) -> CliResult<ContinuousDelayReader> {
        let reader = if self.recover {
            ContinuousDelayReader::open_unfinalized(&self.file)?
        } else {
            ContinuousDelayReader::open(&self.file)?
        };
        Ok(reader)
    }

    /// Open a discrete-delay file
    pub fn open_discrete(&self) -> CliResult<DiscreteDelayReader> {
        let reader = if self.recover {
            DiscreteDelayReader::open_unfinalized(&self.file)?
        } else {
            DiscreteDelayReader::open(&self.file)?
        };
        Ok(reader)
    }
}

/// Time window of a windowed query
#[derive(Args, Debug, Clone, Copy)]
pub struct WindowArgs {
    /// Window start in seconds
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub start: f64,

    /// Window length in seconds, 0 reads to the end of the file
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub length: f64,
}

impl WindowArgs {
    /// The storage window
    pub fn window(&self) -> Window {
        Window::new(self.start, self.length)
    }
}

/// Destination and format of a command's result
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output format, defaults to the configured format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write the result to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

impl OutputArgs {
    /// Write `report` in the requested or configured format
    pub fn emit<R: Report>(&self, report: &R, config: &CliConfig) -> CliResult<()> {
        let format = self.format.unwrap_or(config.output_format);
        output::emit(report, format, self.out.as_deref())
    }
}

/// The requested link, or every link of the file
pub(crate) fn select_links(reader: &dyn CdxReader, link: Option<&str>) -> Vec<String> {
    match link {
        Some(link) => vec![link.to_string()],
        None => reader.link_names(),
    }
}
