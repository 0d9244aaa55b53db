//! File inspection command

use std::io::{self, Write};

use clap::Args;
use serde::Serialize;
use tracing::info;

use cdx_storage::{CdxFile, ComponentTypes, DelayType, Parameters};

use super::{InputArgs, OutputArgs};
use crate::config::CliConfig;
use crate::error::CliResult;
use crate::output::{csv_row, Report};

/// Show parameters and links of a file
#[derive(Args, Debug)]
pub struct InfoCommand {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Serialize)]
struct InfoReport {
    path: String,
    delay_type: DelayType,
    parameters: Parameters,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay_smpl_freq_hz: Option<f64>,
    nof_links: usize,
    nof_cirs: u64,
    length_s: f64,
    links: Vec<LinkInfo>,
}

#[derive(Debug, Serialize)]
struct LinkInfo {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    component_types: Option<ComponentTypes>,
    /// Smallest and largest component magnitude
    #[serde(skip_serializing_if = "Option::is_none")]
    amplitude_range: Option<(f64, f64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nof_delay_bins: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_delay_s: Option<f64>,
}

impl Report for InfoReport {
    fn write_csv(&self, out: &mut dyn Write) -> io::Result<()> {
        csv_row(out, ["field", "value"])?;
        let p = &self.parameters;
        let scalars = [
            ("path", self.path.clone()),
            ("delay_type", self.delay_type.to_string()),
            ("c0_m_s", p.c0_m_s.to_string()),
            ("cir_rate_hz", p.cir_rate_hz.to_string()),
            ("transmitter_frequency_hz", p.transmitter_frequency_hz.to_string()),
            ("nof_links", self.nof_links.to_string()),
            ("nof_cirs", self.nof_cirs.to_string()),
            ("length_s", self.length_s.to_string()),
        ];
        for (field, value) in scalars {
            csv_row(out, [field.to_string(), value])?;
        }
        if let Some(fs) = self.delay_smpl_freq_hz {
            csv_row(out, ["delay_smpl_freq_hz".to_string(), fs.to_string()])?;
        }

        for link in &self.links {
            let prefix = format!("link.{}", link.name);
            if let Some(types) = &link.component_types {
                for (id, name) in types.iter() {
                    csv_row(out, [format!("{}.component_type.{}", prefix, id), name.to_string()])?;
                }
            }
            if let Some((min, max)) = link.amplitude_range {
                csv_row(out, [format!("{}.min_amplitude", prefix), min.to_string()])?;
                csv_row(out, [format!("{}.max_amplitude", prefix), max.to_string()])?;
            }
            if let Some(bins) = link.nof_delay_bins {
                csv_row(out, [format!("{}.nof_delay_bins", prefix), bins.to_string()])?;
            }
            if let Some(min_delay) = link.min_delay_s {
                csv_row(out, [format!("{}.min_delay_s", prefix), min_delay.to_string()])?;
            }
        }
        Ok(())
    }
}

impl InfoCommand {
    pub fn execute(self, config: &CliConfig) -> CliResult<()> {
        let file = self.input.open()?;
        let reader = file.reader();
        info!(
            "{}: {} file, {} links, {} CIRs",
            self.input.file.display(),
            reader.delay_type(),
            reader.nof_links(),
            reader.nof_cirs()
        );

        let mut links = Vec::new();
        for name in reader.link_names() {
            let link = match &file {
                CdxFile::ContinuousDelay(r) => LinkInfo {
                    component_types: Some(r.type_names(&name)?.clone()),
                    amplitude_range: r.min_max_amplitude(&name)?,
                    nof_delay_bins: None,
                    min_delay_s: None,
                    name,
                },
                CdxFile::DiscreteDelay(r) => {
                    let delays = r.delays(&name)?;
                    LinkInfo {
                        component_types: None,
                        amplitude_range: None,
                        nof_delay_bins: Some(delays.len()),
                        min_delay_s: delays.first().copied(),
                        name,
                    }
                }
            };
            links.push(link);
        }

        let report = InfoReport {
            path: self.input.file.display().to_string(),
            delay_type: reader.delay_type(),
            parameters: reader.parameters(),
            delay_smpl_freq_hz: file.as_discrete().map(|r| r.delay_smpl_freq_hz()),
            nof_links: reader.nof_links(),
            nof_cirs: reader.nof_cirs(),
            length_s: reader.length_s(),
            links,
        };
        self.output.emit(&report, config)
    }
}
