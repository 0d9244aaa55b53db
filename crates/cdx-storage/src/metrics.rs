//! Channel metrics over CIRs
//!
//! Per-instant metrics are pure functions of one CIR. The power delay profile
//! is accumulated over every CIR of a link by [`PdpAccumulator`].

use ndarray::Array2;
use num_complex::Complex64;

use crate::{
    cir::Component,
    error::{Result, StorageError},
    ids::CirIndex,
};

/// Component types below this value count as line-of-sight
pub const LOS_TYPE_THRESHOLD: u16 = 256;

/// Magnitude substituted for zero or non-finite amplitudes before a logarithm
pub const AMPLITUDE_FLOOR: f64 = 1e-9;

/// Width of one PDP delay bin in seconds
pub const PDP_DELAY_STEP_S: f64 = 10e-9;

/// Number of PDP delay bins (0 to 490 ns)
pub const PDP_NOF_DELAY_BINS: usize = 50;

/// Height of one PDP power bin in dB
pub const PDP_POWER_STEP_DB: f64 = 1.0;

/// Number of PDP power bins (0 to -30 dB)
pub const PDP_NOF_POWER_BINS: usize = 31;

/// Sum of component magnitudes (non-coherent power)
pub fn non_coherent_power(components: &[Component]) -> f64 {
    components.iter().map(|c| c.amplitude.norm()).sum()
}

/// Magnitude of the complex sum of all components (coherent power)
pub fn coherent_power(components: &[Component]) -> f64 {
    components
        .iter()
        .map(|c| c.amplitude)
        .sum::<Complex64>()
        .norm()
}

/// Largest minus smallest component delay, 0 for fewer than two components
pub fn multipath_spread(components: &[Component]) -> f64 {
    if components.len() < 2 {
        return 0.0;
    }
    let (min, max) = components
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), c| {
            (min.min(c.delay), max.max(c.delay))
        });
    max - min
}

/// Whether a component type counts as line-of-sight
pub fn is_los_type(component_type: u16) -> bool {
    component_type < LOS_TYPE_THRESHOLD
}

/// Non-coherent power of the line-of-sight and the multipath components
pub fn los_multipath_split(components: &[Component]) -> (f64, f64) {
    components.iter().fold((0.0, 0.0), |(los, mp), c| {
        if is_los_type(c.component_type) {
            (los + c.amplitude.norm(), mp)
        } else {
            (los, mp + c.amplitude.norm())
        }
    })
}

/// `10 log10(|a|)`, with zero or non-finite magnitudes replaced by [`AMPLITUDE_FLOOR`]
pub fn amplitude_db(amplitude: Complex64) -> f64 {
    let magnitude = amplitude.norm();
    let magnitude = if magnitude > 0.0 && magnitude.is_finite() {
        magnitude
    } else {
        AMPLITUDE_FLOOR
    };
    10.0 * magnitude.log10()
}

/// One value per CIR of a window
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSeries {
    /// Time of every CIR in seconds
    pub times: Vec<f64>,
    /// Metric value of every CIR
    pub values: Vec<f64>,
}

impl TimeSeries {
    /// Number of samples
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// `(time, value)` pairs
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.times.iter().copied().zip(self.values.iter().copied())
    }
}

/// Line-of-sight and multipath power per CIR of a window
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LosMultipathPowers {
    /// Time of every CIR in seconds
    pub times: Vec<f64>,
    /// Non-coherent power of the line-of-sight components
    pub los: Vec<f64>,
    /// Non-coherent power of the remaining components
    pub multipath: Vec<f64>,
}

/// Normalised power delay profile
///
/// `matrix[[r, d]]` is the probability of a component with power
/// `power_axis[r]` dB at delay `delay_axis[d]` s.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pdp {
    /// Power x delay probability matrix, sums to 1
    pub matrix: Array2<f64>,
    /// Delay of every column in seconds
    pub delay_axis: Vec<f64>,
    /// Power of every row in dB, starting at 0 dB
    pub power_axis: Vec<f64>,
    /// Floor added to every cell before normalisation
    pub lower_prob: f64,
    /// Upper display bound
    pub upper_prob: f64,
}

impl Pdp {
    /// Delay axis `0, 10 ns, .., 490 ns`
    pub fn delay_axis() -> Vec<f64> {
        (0..PDP_NOF_DELAY_BINS)
            .map(|d| d as f64 * PDP_DELAY_STEP_S)
            .collect()
    }

    /// Power axis `0, -1, .., -30` dB in row order
    pub fn power_axis() -> Vec<f64> {
        (0..PDP_NOF_POWER_BINS)
            .map(|r| -(r as f64) * PDP_POWER_STEP_DB)
            .collect()
    }
}

/// Histogram of component power over delay
#[derive(Debug, Clone)]
pub struct PdpAccumulator {
    link: String,
    counts: Array2<f64>,
    dropped: u64,
}

impl PdpAccumulator {
    /// Start an empty histogram for `link`
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            counts: Array2::zeros((PDP_NOF_POWER_BINS, PDP_NOF_DELAY_BINS)),
            dropped: 0,
        }
    }

    /// Bin every component of CIR `n`
    ///
    /// A component with a negative delay bin is an integrity violation.
    /// Components outside either axis are dropped.
    pub fn add(&mut self, n: CirIndex, components: &[Component]) -> Result<()> {
        for component in components {
            let delay_bin = (component.delay / PDP_DELAY_STEP_S).round();
            if delay_bin < 0.0 {
                return Err(StorageError::integrity(
                    self.link.clone(),
                    format!(
                        "negative delay {} s (id {}) at CIR {}",
                        component.delay, component.id, n
                    ),
                ));
            }
            let power_bin =
                (amplitude_db(component.amplitude) / -PDP_POWER_STEP_DB).round();

            let in_range = delay_bin < PDP_NOF_DELAY_BINS as f64
                && power_bin >= 0.0
                && power_bin < PDP_NOF_POWER_BINS as f64;
            if in_range {
                self.counts[[power_bin as usize, delay_bin as usize]] += 1.0;
            } else {
                self.dropped += 1;
            }
        }
        Ok(())
    }

    /// Components that fell outside the axes so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Add `lower_prob` to every cell and normalise to a sum of 1
    pub fn finish(self, lower_prob: f64, upper_prob: f64) -> Result<Pdp> {
        if !(lower_prob.is_finite() && lower_prob > 0.0) {
            return Err(StorageError::NumericDegenerate {
                quantity: "lower_prob",
                value: lower_prob,
            });
        }
        if !(upper_prob.is_finite() && upper_prob > 0.0) {
            return Err(StorageError::NumericDegenerate {
                quantity: "upper_prob",
                value: upper_prob,
            });
        }

        if self.dropped > 0 {
            log::debug!(
                "PDP of link '{}': {} components outside the axes",
                self.link,
                self.dropped
            );
        }

        let mut matrix = self.counts + lower_prob;
        let total = matrix.sum();
        matrix /= total;

        Ok(Pdp {
            matrix,
            delay_axis: Pdp::delay_axis(),
            power_axis: Pdp::power_axis(),
            lower_prob,
            upper_prob,
        })
    }
}
