//! Writer configuration
//!
//! Every recognised field is spelled out; `validate` runs before a file is
//! created so that a rejected configuration never leaves a file behind.

use std::collections::{BTreeMap, HashSet};

use crate::{
    error::{Result, StorageError},
    registry::ComponentTypes,
    schema::validate_name,
};

/// File-level parameters shared by both variants
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct Parameters {
    /// Speed of light in m/s
    pub c0_m_s: f64,
    /// CIR generation rate in Hz
    pub cir_rate_hz: f64,
    /// Carrier frequency of the transmitter in Hz
    pub transmitter_frequency_hz: f64,
}

impl Parameters {
    /// Validate parameter values
    pub fn validate(&self) -> Result<()> {
        require_positive("c0_m_s", self.c0_m_s)?;
        require_positive("cir_rate_hz", self.cir_rate_hz)?;
        if !self.transmitter_frequency_hz.is_finite() {
            return Err(StorageError::config(format!(
                "transmitter_frequency_hz must be finite, got {}",
                self.transmitter_frequency_hz
            )));
        }
        Ok(())
    }

    /// Interval between two CIRs in seconds
    pub fn cir_interval_s(&self) -> f64 {
        1.0 / self.cir_rate_hz
    }
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(StorageError::config(format!(
            "{} must be finite and positive, got {}",
            name, value
        )));
    }
    Ok(())
}

fn check_link_names<'a>(names: impl Iterator<Item = &'a str>) -> Result<usize> {
    let mut seen = HashSet::new();
    for name in names {
        validate_name(name)?;
        if !seen.insert(name) {
            return Err(StorageError::config(format!("duplicate link name '{}'", name)));
        }
    }
    if seen.is_empty() {
        return Err(StorageError::config("link_names is empty"));
    }
    if seen.len() > u32::MAX as usize {
        return Err(StorageError::config("too many links"));
    }
    Ok(seen.len())
}

/// Configuration of a continuous-delay file
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ContinuousDelayConfig {
    /// File-level parameters
    pub parameters: Parameters,
    /// Link names in file order
    pub link_names: Vec<String>,
    /// Component-type registry of every link, keyed by link name
    pub component_types: BTreeMap<String, ComponentTypes>,
}

impl ContinuousDelayConfig {
    /// Start a configuration without links
    pub fn new(parameters: Parameters) -> Self {
        Self {
            parameters,
            link_names: Vec::new(),
            component_types: BTreeMap::new(),
        }
    }

    /// Add a link with its component-type registry
    pub fn with_link(mut self, name: impl Into<String>, component_types: ComponentTypes) -> Self {
        let name = name.into();
        self.component_types.insert(name.clone(), component_types);
        self.link_names.push(name);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;
        let nof_links = check_link_names(self.link_names.iter().map(String::as_str))?;

        if self.component_types.len() != nof_links {
            return Err(StorageError::config(format!(
                "number of provided component types ({}) does not match number of links ({})",
                self.component_types.len(),
                nof_links
            )));
        }

        for link in &self.link_names {
            let types = self.component_types.get(link).ok_or_else(|| {
                StorageError::config(format!("no component types provided for link '{}'", link))
            })?;
            if types.len() > u16::MAX as usize {
                return Err(StorageError::config(format!(
                    "link '{}' registers {} component types, at most {} are supported",
                    link,
                    types.len(),
                    u16::MAX
                )));
            }
            for (_, name) in types.iter() {
                validate_name(name)?;
            }
        }
        Ok(())
    }
}

/// Delay-axis layout of one discrete-delay link
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct DiscreteLinkConfig {
    /// Link name
    pub name: String,
    /// Number of delay bins of every column
    pub nof_delay_samples: u32,
    /// Delay of the first bin in seconds
    pub min_delay_s: f64,
}

impl DiscreteLinkConfig {
    /// Delay axis `min_delay_s + k / delay_smpl_freq_hz`
    pub fn y_axis(&self, delay_smpl_freq_hz: f64) -> Vec<f64> {
        (0..self.nof_delay_samples)
            .map(|k| self.min_delay_s + k as f64 / delay_smpl_freq_hz)
            .collect()
    }
}

/// Configuration of a discrete-delay file
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct DiscreteDelayConfig {
    /// File-level parameters
    pub parameters: Parameters,
    /// Sampling frequency of the delay axis in Hz
    pub delay_smpl_freq_hz: f64,
    /// Links in file order
    pub links: Vec<DiscreteLinkConfig>,
}

impl DiscreteDelayConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.parameters.validate()?;
        require_positive("delay_smpl_freq_hz", self.delay_smpl_freq_hz)?;
        check_link_names(self.links.iter().map(|l| l.name.as_str()))?;

        for link in &self.links {
            if link.nof_delay_samples == 0 {
                return Err(StorageError::config(format!(
                    "link '{}' has no delay samples",
                    link.name
                )));
            }
            if !link.min_delay_s.is_finite() {
                return Err(StorageError::config(format!(
                    "link '{}' has non-finite min_delay_s {}",
                    link.name, link.min_delay_s
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parameters() -> Parameters {
        Parameters {
            c0_m_s: 3e8,
            cir_rate_hz: 100.0,
            transmitter_frequency_hz: 1.51e9,
        }
    }

    fn los_types() -> ComponentTypes {
        ComponentTypes::new().with(0, "LOS").with(1, "scatterer")
    }

    #[test]
    fn test_valid_continuous_config() {
        let config = ContinuousDelayConfig::new(parameters())
            .with_link("sat0", los_types())
            .with_link("sat1", los_types());
        assert!(config.validate().is_ok());
        assert_eq!(parameters().cir_interval_s(), 0.01);
    }

    #[test]
    fn test_empty_link_names_rejected() {
        let config = ContinuousDelayConfig::new(parameters());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("link_names is empty"));
    }

    #[test]
    fn test_component_type_count_mismatch_rejected() {
        let mut config = ContinuousDelayConfig::new(parameters()).with_link("sat0", los_types());
        config.link_names.push("sat1".to_string());
        assert!(matches!(config.validate(), Err(StorageError::Config { .. })));

        let mut config = ContinuousDelayConfig::new(parameters()).with_link("sat0", los_types());
        config.component_types.insert("sat9".to_string(), los_types());
        assert!(matches!(config.validate(), Err(StorageError::Config { .. })));
    }

    #[test]
    fn test_duplicate_links_rejected() {
        let mut config = ContinuousDelayConfig::new(parameters()).with_link("sat0", los_types());
        config.link_names.push("sat0".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut params = parameters();
        params.cir_rate_hz = 0.0;
        assert!(params.validate().is_err());
        params.cir_rate_hz = f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_discrete_config() {
        let link = DiscreteLinkConfig {
            name: "sat0".to_string(),
            nof_delay_samples: 4,
            min_delay_s: 1e-6,
        };
        let axis = link.y_axis(1e9);
        assert_eq!(axis.len(), 4);
        assert!((axis[3] - (1e-6 + 3e-9)).abs() < 1e-18);

        let config = DiscreteDelayConfig {
            parameters: parameters(),
            delay_smpl_freq_hz: 1e9,
            links: vec![link.clone()],
        };
        assert!(config.validate().is_ok());

        let mut empty = link;
        empty.nof_delay_samples = 0;
        let config = DiscreteDelayConfig {
            parameters: parameters(),
            delay_smpl_freq_hz: 1e9,
            links: vec![empty],
        };
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_parameters_reject_unknown_fields() {
        let json = r#"{"c0_m_s": 3e8, "cir_rate_hz": 100.0, "transmitter_frequency_hz": 1.5e9}"#;
        let params: Parameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.cir_rate_hz, 100.0);

        let json = r#"{"c0_m_s": 3e8, "cir_rate_hz": 100.0, "transmitter_frequency_hz": 1.5e9, "nof_links": 2}"#;
        assert!(serde_json::from_str::<Parameters>(json).is_err());

        let json = r#"{"c0_m_s": 3e8, "cir_rate_hz": 100.0}"#;
        assert!(serde_json::from_str::<Parameters>(json).is_err());
    }
}
