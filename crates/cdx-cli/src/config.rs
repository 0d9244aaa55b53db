//! Configuration management for the CDX CLI

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;

/// Global CLI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Default logging level
    pub log_level: Option<String>,

    /// Default output format
    pub output_format: OutputFormat,

    /// Power delay profile display bounds
    pub pdp: PdpBounds,
}

/// Probability floor and ceiling used by `cdx pdp`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdpBounds {
    /// Floor added to every histogram cell
    pub lower_prob: f64,
    /// Upper display bound
    pub upper_prob: f64,
}

impl Default for PdpBounds {
    fn default() -> Self {
        Self {
            lower_prob: 1e-6,
            upper_prob: 10.0,
        }
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            output_format: OutputFormat::Json,
            pdp: PdpBounds::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file, falling back to defaults if it does not exist
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| CliError::config(format!("Invalid config file {}: {}", path.display(), e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Load the configuration named on the command line, or the default one
    ///
    /// An explicitly named file must exist.
    pub fn load(explicit: Option<&Path>) -> CliResult<Self> {
        match explicit {
            Some(path) if !path.exists() => Err(CliError::config(format!(
                "config file {} does not exist",
                path.display()
            ))),
            Some(path) => Self::load_from_file(path),
            None => match Self::default_config_path() {
                Ok(path) => Self::load_from_file(&path),
                Err(_) => Ok(Self::default()),
            },
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> CliResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CliError::config("Could not determine config directory"))?;
        Ok(config_dir.join("cdx").join("config.toml"))
    }
}
