//! Per-instant metrics of continuous-delay files

use std::collections::BTreeMap;

use clap::{Args, ValueEnum};
use tracing::{debug, info};

use super::{select_links, InputArgs, OutputArgs, WindowArgs};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{LinkSeries, SeriesReport};

/// Metric computed per CIR
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    /// Sum of component magnitudes
    Power,
    /// Magnitude of the complex component sum
    CoherentPower,
    /// Largest minus smallest component delay
    MultipathSpread,
    /// Number of components
    Components,
    /// Summed magnitudes of LOS-like and multipath components
    LosMultipath,
}

/// Per-instant metrics of a continuous-delay file
#[derive(Args, Debug)]
pub struct MetricsCommand {
    /// Metric to compute
    #[arg(value_enum)]
    pub metric: Metric,

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

impl MetricsCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let reader = self.input.open_continuous()?;
        let window = self.window.window();
        info!("Computing {:?} of {}", self.metric, self.input.file.display());

        let mut report = Vec::new();
        for link in select_links(&reader, self.link.as_deref()) {
            let series = match self.metric {
                Metric::Power => {
                    let s = reader.compute_power(&link, window)?;
                    LinkSeries::single(link, "power", s.times, s.values)
                }
                Metric::CoherentPower => {
                    let s = reader.compute_coherent_power(&link, window)?;
                    LinkSeries::single(link, "coherent_power", s.times, s.values)
                }
                Metric::MultipathSpread => {
                    let s = reader.compute_multipath_spread(&link, window)?;
                    LinkSeries::single(link, "multipath_spread_s", s.times, s.values)
                }
                Metric::Components => {
                    let s = reader.compute_nof_components(&link, window)?;
                    LinkSeries::single(link, "nof_components", s.times, s.values)
                }
                Metric::LosMultipath => {
                    let split = reader.compute_los_and_multipath_components_powers(&link, window)?;
                    LinkSeries {
                        link,
                        times: split.times,
                        columns: BTreeMap::from([
                            ("los".to_string(), split.los),
                            ("multipath".to_string(), split.multipath),
                        ]),
                    }
                }
            };
            debug!("Link '{}': {} samples", series.link, series.times.len());
            report.push(series);
        }

        self.output.emit(&SeriesReport(report), config)
    }
}
