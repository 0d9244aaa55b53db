//! Continuous-delay to discrete-delay conversion
//!
//! Every CIR is band-limited interpolated onto a regular delay grid:
//!
//! ```text
//! h[k][n] = sum_c a_c * sinc(pi * fs * (n / fs - (delay_c - min + before)))
//! ```
//!
//! and optionally low-pass filtered with a Hamming window in the frequency
//! domain.

use std::path::Path;

use num_complex::Complex64;

use crate::{
    cir::Component,
    config::{DiscreteDelayConfig, DiscreteLinkConfig},
    error::{Result, StorageError},
    read_continuous::ContinuousDelayReader,
    spectrum::FftPair,
    traits::CdxReader,
    window::CirRange,
    write_discrete::DiscreteDelayWriter,
};

/// Options of a conversion
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct ConversionOptions {
    /// Sampling frequency of the output delay axis in Hz
    pub delay_smpl_freq_hz: f64,
    /// Delay added before the smallest component delay in seconds
    pub delay_before_min_s: f64,
    /// Delay added after the largest component delay in seconds
    pub delay_after_max_s: f64,
    /// Apply the Hamming low-pass filter to every interpolated CIR
    pub enable_filtering: bool,
    /// Make component delays relative to the reference delay of their CIR
    pub subtract_reference_delay: bool,
    /// Only interpolate components of this type
    pub component_type: Option<u16>,
}

impl ConversionOptions {
    /// Options with no margins, no filtering and all component types
    pub fn new(delay_smpl_freq_hz: f64) -> Self {
        Self {
            delay_smpl_freq_hz,
            delay_before_min_s: 0.0,
            delay_after_max_s: 0.0,
            enable_filtering: false,
            subtract_reference_delay: false,
            component_type: None,
        }
    }

    /// Validate option values
    pub fn validate(&self) -> Result<()> {
        if !(self.delay_smpl_freq_hz.is_finite() && self.delay_smpl_freq_hz > 0.0) {
            return Err(StorageError::config(format!(
                "delay_smpl_freq_hz must be finite and positive, got {}",
                self.delay_smpl_freq_hz
            )));
        }
        for (name, value) in [
            ("delay_before_min_s", self.delay_before_min_s),
            ("delay_after_max_s", self.delay_after_max_s),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(StorageError::config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Delay grid chosen for one link
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkConversion {
    /// Link name
    pub name: String,
    /// Smallest component delay in seconds
    pub min_delay_s: f64,
    /// Largest component delay in seconds
    pub max_delay_s: f64,
    /// Number of delay bins written per CIR
    pub nof_coeffs: u32,
}

/// Result of a conversion
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConversionSummary {
    /// Number of CIRs per link
    pub nof_cirs: u64,
    /// Per-link delay grids in file order
    pub links: Vec<LinkConversion>,
}

/// `sin(x) / x` with `sinc(0) = 1`
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-8 {
        1.0 - x * x / 6.0
    } else {
        x.sin() / x
    }
}

/// Hamming window `0.54 - 0.46 cos(2 pi i / (n - 1))`, `[0.08]` for `n == 1`
pub fn hamming(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.08],
        _ => (0..n)
            .map(|i| 0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos())
            .collect(),
    }
}

/// Hamming window with its halves swapped so the passband sits on bin 0
fn filter_window(n: usize) -> Vec<Complex64> {
    let mut window: Vec<Complex64> = hamming(n).into_iter().map(|w| Complex64::new(w, 0.0)).collect();
    window.rotate_left(n / 2);
    window
}

/// Delay of `component` on the output grid's time base
fn effective_delay(component: &Component, reference_delay: f64, options: &ConversionOptions) -> f64 {
    if options.subtract_reference_delay {
        component.delay - reference_delay
    } else {
        component.delay
    }
}

/// Per-link interpolation state shared by all rows
struct Interpolator<'a> {
    options: &'a ConversionOptions,
    min_delay_s: f64,
    nof_coeffs: usize,
    filter: Option<(FftPair, Vec<Complex64>)>,
}

impl Interpolator<'_> {
    fn row(&self, components: &[Component], reference_delay: f64) -> Vec<Complex64> {
        let fs = self.options.delay_smpl_freq_hz;
        let omega = std::f64::consts::PI * fs;
        let offset = self.options.delay_before_min_s - self.min_delay_s;
        let mut row = vec![Complex64::new(0.0, 0.0); self.nof_coeffs];

        let selected = components.iter().filter(|c| {
            self.options
                .component_type
                .map_or(true, |t| t == c.component_type)
        });
        for component in selected {
            let delay = effective_delay(component, reference_delay, self.options);
            for (n, coeff) in row.iter_mut().enumerate() {
                let x = omega * (n as f64 / fs - (delay + offset));
                *coeff += component.amplitude * sinc(x);
            }
        }

        if let Some((fft, window)) = &self.filter {
            fft.forward(&mut row);
            for (coeff, w) in row.iter_mut().zip(window) {
                *coeff *= w;
            }
            fft.inverse(&mut row);
        }
        row
    }
}

/// Convert every link of `reader` into a discrete-delay file at `output`
pub fn convert_continuous_to_discrete(
    reader: &ContinuousDelayReader,
    output: impl AsRef<Path>,
    options: &ConversionOptions,
) -> Result<ConversionSummary> {
    convert_with_progress(reader, output, options, |_, _| {})
}

/// Like [`convert_continuous_to_discrete`], calling `progress(link, done)`
/// after each link has been written
pub fn convert_with_progress<F>(
    reader: &ContinuousDelayReader,
    output: impl AsRef<Path>,
    options: &ConversionOptions,
    mut progress: F,
) -> Result<ConversionSummary>
where
    F: FnMut(&str, usize),
{
    options.validate()?;
    let nof_cirs = reader.nof_cirs();
    let all = CirRange {
        start: 0,
        end: nof_cirs,
    };

    // First pass: delay span of every link.
    let mut links = Vec::new();
    for name in reader.link_names() {
        let mut bounds: Option<(f64, f64)> = None;
        for n in all.indices() {
            let cir = reader.get_cir(&name, n.raw())?;
            for component in &cir.components {
                let delay = effective_delay(component, cir.reference_delay, options);
                bounds = Some(match bounds {
                    Some((min, max)) => (min.min(delay), max.max(delay)),
                    None => (delay, delay),
                });
            }
        }
        let (min_delay_s, max_delay_s) = bounds.unwrap_or((0.0, 0.0));

        let interval = (max_delay_s + options.delay_after_max_s) - (min_delay_s - options.delay_before_min_s);
        let coeffs = (interval * options.delay_smpl_freq_hz).round();
        if !(coeffs >= 1.0 && coeffs <= u32::MAX as f64) {
            return Err(StorageError::config(format!(
                "link '{}': delay interval {} s at {} Hz gives {} delay bins",
                name, interval, options.delay_smpl_freq_hz, coeffs
            )));
        }
        log::debug!(
            "Link '{}': delays {} s to {} s, {} delay bins",
            name,
            min_delay_s,
            max_delay_s,
            coeffs
        );
        links.push(LinkConversion {
            name,
            min_delay_s,
            max_delay_s,
            nof_coeffs: coeffs as u32,
        });
    }

    let config = DiscreteDelayConfig {
        parameters: reader.parameters(),
        delay_smpl_freq_hz: options.delay_smpl_freq_hz,
        links: links
            .iter()
            .map(|link| DiscreteLinkConfig {
                name: link.name.clone(),
                nof_delay_samples: link.nof_coeffs,
                min_delay_s: link.min_delay_s,
            })
            .collect(),
    };
    let mut writer = DiscreteDelayWriter::create(output, config)?;

    // Second pass: interpolate and write.
    for (i, link) in links.iter().enumerate() {
        let nof_coeffs = link.nof_coeffs as usize;
        let interpolator = Interpolator {
            options,
            min_delay_s: link.min_delay_s,
            nof_coeffs,
            filter: options
                .enable_filtering
                .then(|| (FftPair::new(nof_coeffs), filter_window(nof_coeffs))),
        };

        let rows = all.try_map(|n| {
            let cir = reader.get_cir(&link.name, n.raw())?;
            Ok(interpolator.row(&cir.components, cir.reference_delay))
        })?;
        let reference_delays = reader.reference_delays(&link.name)?;

        for (row, reference_delay) in rows.iter().zip(reference_delays) {
            let reference_delay = if options.subtract_reference_delay {
                0.0
            } else {
                reference_delay
            };
            writer.append_snapshot(&link.name, row, reference_delay + options.delay_before_min_s)?;
        }
        log::debug!("Link '{}': wrote {} interpolated CIRs", link.name, rows.len());
        progress(&link.name, i + 1);
    }

    writer.close()?;
    log::info!(
        "Converted {} links x {} CIRs from {} to discrete delay",
        links.len(),
        nof_cirs,
        reader.path().display()
    );

    Ok(ConversionSummary { nof_cirs, links })
}
