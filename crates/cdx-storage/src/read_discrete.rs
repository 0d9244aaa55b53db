//! Discrete-delay reader

use std::path::Path;

use ndarray::Array2;
use num_complex::Complex64;

use crate::{
    config::Parameters,
    error::{Result, StorageError},
    file::MappedFile,
    frame::decode_column,
    ids::{CirIndex, LinkIndex},
    metrics::TimeSeries,
    schema::DelayType,
    spectrum::DelayDopplerSpectrum,
    traits::CdxReader,
    window::{CirRange, Window},
};

/// Windowed slice of a discrete-delay link
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CirGrid {
    /// Amplitudes, delay bins x time instants
    pub amplitudes: Array2<Complex64>,
    /// Time of every column in seconds
    pub times: Vec<f64>,
    /// Delay of every row in seconds
    pub delays: Vec<f64>,
    /// Reference delay of every column in seconds
    pub reference_delays: Vec<f64>,
}

/// Reads a discrete-delay CDX file
#[derive(Debug)]
pub struct DiscreteDelayReader {
    file: MappedFile,
}

impl DiscreteDelayReader {
    /// Open a finalized discrete-delay file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_mapped(MappedFile::open(path.as_ref(), false)?)
    }

    /// Open a file whose writer never closed, recovering every complete column
    pub fn open_unfinalized(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_mapped(MappedFile::open(path.as_ref(), true)?)
    }

    pub(crate) fn from_mapped(file: MappedFile) -> Result<Self> {
        file.expect_delay_type(DelayType::DiscreteDelay)?;
        Ok(Self { file })
    }

    /// Path of the open file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Sampling frequency of the delay axis in Hz
    pub fn delay_smpl_freq_hz(&self) -> f64 {
        self.file.header().delay_smpl_freq_hz
    }

    fn link(&self, name: &str) -> Result<(LinkIndex, &[f64])> {
        self.file.ensure_open()?;
        let (index, entry) = self.file.link(name)?;
        let y_axis = entry
            .y_axis()
            .ok_or_else(|| StorageError::schema(format!("link '{}' has no delay axis", name)))?;
        Ok((index, y_axis))
    }

    /// Delay axis of a link
    pub fn delays(&self, link: &str) -> Result<Vec<f64>> {
        self.link(link).map(|(_, y_axis)| y_axis.to_vec())
    }

    fn column(
        &self,
        link: &str,
        index: LinkIndex,
        nof_delays: usize,
        n: CirIndex,
    ) -> Result<Vec<Complex64>> {
        let (header, payload) = self.file.frame(index, n)?;
        if header.count as usize != nof_delays {
            return Err(StorageError::integrity(
                link,
                format!(
                    "column {} holds {} delay samples, delay axis has {}",
                    n, header.count, nof_delays
                ),
            ));
        }
        decode_column(payload, header.count)
    }

    fn range(&self, window: Window) -> Result<CirRange> {
        window.resolve(self.file.nof_cirs(), self.cir_rate_hz())
    }

    /// Amplitude grid of a link within `window`
    pub fn get_cirs(&self, link: &str, window: Window) -> Result<CirGrid> {
        let (index, y_axis) = self.link(link)?;
        let range = self.range(window)?;
        let nof_delays = y_axis.len();

        let columns = range.try_map(|n| self.column(link, index, nof_delays, n))?;
        let amplitudes =
            Array2::from_shape_fn((nof_delays, columns.len()), |(d, t)| columns[t][d]);

        let reference_delays =
            self.file.reference_delays(index)[range.start as usize..range.end as usize].to_vec();

        Ok(CirGrid {
            amplitudes,
            times: range.times(self.cir_rate_hz()),
            delays: y_axis.to_vec(),
            reference_delays,
        })
    }

    /// Squared magnitude of the coherent column sum per time instant
    pub fn compute_power(&self, link: &str, window: Window) -> Result<TimeSeries> {
        let (index, y_axis) = self.link(link)?;
        let range = self.range(window)?;
        let nof_delays = y_axis.len();
        let values = range.try_map(|n| {
            self.column(link, index, nof_delays, n)
                .map(|column| column.iter().sum::<Complex64>().norm_sqr())
        })?;
        Ok(TimeSeries {
            times: range.times(self.cir_rate_hz()),
            values,
        })
    }

    /// Delay-Doppler spectrum of a link within `window`
    pub fn delay_doppler_spectrum(&self, link: &str, window: Window) -> Result<DelayDopplerSpectrum> {
        let grid = self.get_cirs(link, window)?;
        Ok(DelayDopplerSpectrum::compute(
            &grid.amplitudes,
            grid.delays,
            self.cir_rate_hz(),
        ))
    }
}

impl CdxReader for DiscreteDelayReader {
    fn delay_type(&self) -> DelayType {
        DelayType::DiscreteDelay
    }

    fn parameters(&self) -> Parameters {
        self.file.header().parameters()
    }

    fn link_names(&self) -> Vec<String> {
        self.file.links().iter().map(|l| l.name.clone()).collect()
    }

    fn nof_links(&self) -> usize {
        self.file.links().len()
    }

    fn nof_cirs(&self) -> u64 {
        self.file.nof_cirs()
    }

    fn reference_delays(&self, link: &str) -> Result<Vec<f64>> {
        let (index, _) = self.link(link)?;
        Ok(self.file.reference_delays(index).to_vec())
    }

    fn close(&mut self) {
        self.file.close();
    }

    fn is_closed(&self) -> bool {
        !self.file.is_open()
    }
}
