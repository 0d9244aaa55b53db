//! Delay-Doppler spectrum of a discrete-delay grid

use std::fmt;
use std::sync::Arc;

use ndarray::{Array2, Axis};
use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

/// Magnitude floor applied before converting the spectrum to dB
pub const SPECTRUM_FLOOR: f64 = 1e-13;

/// Forward and inverse FFT plans of one size
pub(crate) struct FftPair {
    size: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl fmt::Debug for FftPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftPair").field("size", &self.size).finish()
    }
}

impl FftPair {
    pub(crate) fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            size,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        }
    }

    /// Unnormalised forward transform in place
    pub(crate) fn forward(&self, buffer: &mut [Complex64]) {
        self.forward.process(buffer);
    }

    /// Inverse transform in place, normalised by `1 / N`
    pub(crate) fn inverse(&self, buffer: &mut [Complex64]) {
        self.inverse.process(buffer);
        let scale = 1.0 / self.size as f64;
        for sample in buffer.iter_mut() {
            *sample *= scale;
        }
    }
}

/// Move the zero-frequency bin to the centre (`numpy.fft.fftshift` order)
pub fn fft_shift<T>(data: &mut [T]) {
    let half = data.len() / 2;
    data.rotate_right(half);
}

/// Doppler frequency of every shifted bin for `n` columns at `cir_rate_hz`
///
/// Bin `k` holds `(k - n / 2) * cir_rate_hz / n`, so even `n` spans
/// `[-n/2, n/2 - 1] * df`.
pub fn doppler_axis(n: usize, cir_rate_hz: f64) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let df = cir_rate_hz / n as f64;
    let half = (n / 2) as f64;
    (0..n).map(|k| (k as f64 - half) * df).collect()
}

/// `20 log10(max(|x|, SPECTRUM_FLOOR))`
pub fn magnitude_db(value: Complex64) -> f64 {
    let magnitude = value.norm();
    let magnitude = if magnitude.is_finite() {
        magnitude.max(SPECTRUM_FLOOR)
    } else {
        SPECTRUM_FLOOR
    };
    20.0 * magnitude.log10()
}

/// Delay-Doppler spectrum of one link and window
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DelayDopplerSpectrum {
    /// Complex spectrum, delay bins x Doppler bins
    pub spectrum: Array2<Complex64>,
    /// Floored magnitude in dB, same shape as `spectrum`
    pub magnitude_db: Array2<f64>,
    /// Doppler frequency of every column in Hz
    pub doppler_axis: Vec<f64>,
    /// Delay of every row in seconds
    pub delay_axis: Vec<f64>,
}

impl DelayDopplerSpectrum {
    /// Transform a delay x time grid along its time axis
    ///
    /// Each row is Fourier transformed, divided by `cir_rate_hz` and shifted
    /// so that zero Doppler sits in column `n / 2`.
    pub fn compute(grid: &Array2<Complex64>, delay_axis: Vec<f64>, cir_rate_hz: f64) -> Self {
        let (_, nof_columns) = grid.dim();
        let mut spectrum = grid.clone();

        if nof_columns > 0 {
            let fft = FftPair::new(nof_columns);
            let mut row_buffer = vec![Complex64::new(0.0, 0.0); nof_columns];
            for mut row in spectrum.axis_iter_mut(Axis(0)) {
                for (dst, src) in row_buffer.iter_mut().zip(row.iter()) {
                    *dst = *src;
                }
                fft.forward(&mut row_buffer);
                fft_shift(&mut row_buffer);
                for (dst, src) in row.iter_mut().zip(&row_buffer) {
                    *dst = *src / cir_rate_hz;
                }
            }
        }

        let magnitude_db = spectrum.mapv(magnitude_db);
        Self {
            spectrum,
            magnitude_db,
            doppler_axis: doppler_axis(nof_columns, cir_rate_hz),
            delay_axis,
        }
    }

    /// Whether the window held no column
    pub fn is_empty(&self) -> bool {
        self.spectrum.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fft_shift_matches_numpy() {
        let mut even = vec![0, 1, 2, 3];
        fft_shift(&mut even);
        assert_eq!(even, vec![2, 3, 0, 1]);

        let mut odd = vec![0, 1, 2, 3, 4];
        fft_shift(&mut odd);
        assert_eq!(odd, vec![3, 4, 0, 1, 2]);
    }

    #[test]
    fn test_doppler_axis() {
        let axis = doppler_axis(4, 100.0);
        assert_eq!(axis, vec![-50.0, -25.0, 0.0, 25.0]);
        assert!(doppler_axis(0, 100.0).is_empty());
    }

    #[test]
    fn test_magnitude_floor() {
        assert!((magnitude_db(Complex64::new(0.0, 0.0)) + 260.0).abs() < 1e-9);
        assert!((magnitude_db(Complex64::new(10.0, 0.0)) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_doppler_tone_lands_on_its_bin() {
        let n = 8;
        let rate = 8.0;
        // One delay bin rotating at +2 Hz.
        let grid = Array2::from_shape_fn((1, n), |(_, t)| {
            let phase = 2.0 * std::f64::consts::PI * 2.0 * t as f64 / rate;
            Complex64::new(phase.cos(), phase.sin())
        });
        let dds = DelayDopplerSpectrum::compute(&grid, vec![0.0], rate);
        let peak = dds
            .magnitude_db
            .row(0)
            .iter()
            .enumerate()
            .fold((0, f64::NEG_INFINITY), |best, (k, &v)| if v > best.1 { (k, v) } else { best });
        assert_eq!(dds.doppler_axis[peak.0], 2.0);
        assert!((dds.spectrum[[0, peak.0]].norm() - n as f64 / rate).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_is_normalised() {
        let fft = FftPair::new(4);
        let original = vec![
            Complex64::new(1.0, 0.0),
            Complex64::new(2.0, -1.0),
            Complex64::new(0.0, 0.5),
            Complex64::new(-1.0, 0.0),
        ];
        let mut buffer = original.clone();
        fft.forward(&mut buffer);
        fft.inverse(&mut buffer);
        for (a, b) in buffer.iter().zip(&original) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_empty_grid() {
        let grid = Array2::<Complex64>::zeros((3, 0));
        let dds = DelayDopplerSpectrum::compute(&grid, vec![0.0, 1.0, 2.0], 100.0);
        assert!(dds.is_empty());
        assert!(dds.doppler_axis.is_empty());
    }
}
