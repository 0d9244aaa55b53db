//! Continuous-delay reader and its metrics

use std::path::Path;

use crate::{
    cir::{Cir, Component},
    config::Parameters,
    error::{Result, StorageError},
    file::MappedFile,
    frame::decode_components,
    ids::{CirIndex, LinkIndex},
    links::LinkEntry,
    metrics::{
        coherent_power, los_multipath_split, multipath_spread, non_coherent_power,
        LosMultipathPowers, Pdp, PdpAccumulator, TimeSeries,
    },
    registry::ComponentTypes,
    schema::DelayType,
    traits::CdxReader,
    window::{CirRange, Window},
};

/// Reads a continuous-delay CDX file
///
/// Only the header, link table and index are held in memory. CIRs are
/// decoded from the memory map on demand.
#[derive(Debug)]
pub struct ContinuousDelayReader {
    file: MappedFile,
}

impl ContinuousDelayReader {
    /// Open a finalized continuous-delay file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_mapped(MappedFile::open(path.as_ref(), false)?)
    }

    /// Open a file whose writer never closed, recovering every complete CIR
    pub fn open_unfinalized(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_mapped(MappedFile::open(path.as_ref(), true)?)
    }

    pub(crate) fn from_mapped(file: MappedFile) -> Result<Self> {
        file.expect_delay_type(DelayType::ContinuousDelay)?;
        Ok(Self { file })
    }

    /// Path of the open file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn link(&self, name: &str) -> Result<(LinkIndex, &LinkEntry, &ComponentTypes)> {
        self.file.ensure_open()?;
        let (index, entry) = self.file.link(name)?;
        let types = entry.component_types().ok_or_else(|| {
            StorageError::schema(format!("link '{}' has no component-type registry", name))
        })?;
        Ok((index, entry, types))
    }

    /// Decode the components of one CIR, checking them against the registry
    fn components(
        &self,
        index: LinkIndex,
        entry: &LinkEntry,
        types: &ComponentTypes,
        n: CirIndex,
    ) -> Result<Vec<Component>> {
        let (header, payload) = self.file.frame(index, n)?;
        let components = decode_components(payload, header.count)?;
        if let Some(bad) = components.iter().find(|c| !types.contains(c.component_type)) {
            return Err(StorageError::integrity(
                entry.name.clone(),
                format!(
                    "stored component type {} (id {}) at CIR {} is not registered",
                    bad.component_type, bad.id, n
                ),
            ));
        }
        Ok(components)
    }

    fn range(&self, window: Window) -> Result<CirRange> {
        window.resolve(self.file.nof_cirs(), self.cir_rate_hz())
    }

    fn series<F>(&self, link: &str, window: Window, metric: F) -> Result<TimeSeries>
    where
        F: Fn(&[Component]) -> f64 + Sync + Send,
    {
        let (index, entry, types) = self.link(link)?;
        let range = self.range(window)?;
        let values = range.try_map(|n| {
            self.components(index, entry, types, n)
                .map(|components| metric(&components))
        })?;
        Ok(TimeSeries {
            times: range.times(self.cir_rate_hz()),
            values,
        })
    }

    /// One CIR of a link with its reference delay
    pub fn get_cir(&self, link: &str, n: u64) -> Result<Cir> {
        let (index, entry, types) = self.link(link)?;
        let n = CirIndex::new(n);
        let components = self.components(index, entry, types, n)?;
        Ok(Cir {
            components,
            reference_delay: self.file.reference_delays(index)[n.raw() as usize],
        })
    }

    /// Component-type registry of a link
    pub fn type_names(&self, link: &str) -> Result<&ComponentTypes> {
        self.link(link).map(|(_, _, types)| types)
    }

    /// Sum of component magnitudes per CIR
    pub fn compute_power(&self, link: &str, window: Window) -> Result<TimeSeries> {
        self.series(link, window, non_coherent_power)
    }

    /// Magnitude of the complex component sum per CIR
    pub fn compute_coherent_power(&self, link: &str, window: Window) -> Result<TimeSeries> {
        self.series(link, window, coherent_power)
    }

    /// Largest minus smallest component delay per CIR
    pub fn compute_multipath_spread(&self, link: &str, window: Window) -> Result<TimeSeries> {
        self.series(link, window, multipath_spread)
    }

    /// Number of components per CIR
    pub fn compute_nof_components(&self, link: &str, window: Window) -> Result<TimeSeries> {
        self.series(link, window, |components| components.len() as f64)
    }

    /// Line-of-sight and multipath power per CIR
    pub fn compute_los_and_multipath_components_powers(
        &self,
        link: &str,
        window: Window,
    ) -> Result<LosMultipathPowers> {
        let (index, entry, types) = self.link(link)?;
        let range = self.range(window)?;
        let split = range.try_map(|n| {
            self.components(index, entry, types, n)
                .map(|components| los_multipath_split(&components))
        })?;
        let (los, multipath): (Vec<f64>, Vec<f64>) = split.into_iter().unzip();
        Ok(LosMultipathPowers {
            times: range.times(self.cir_rate_hz()),
            los,
            multipath,
        })
    }

    /// Power delay profile over every CIR of a link
    ///
    /// Empty cells hold `lower_prob` before normalisation; `upper_prob` is kept
    /// as the display bound.
    pub fn compute_pdp(&self, link: &str, lower_prob: f64, upper_prob: f64) -> Result<Pdp> {
        let (index, entry, types) = self.link(link)?;
        let mut pdp = PdpAccumulator::new(link);
        for n in self.range(Window::full())?.indices() {
            pdp.add(n, &self.components(index, entry, types, n)?)?;
        }
        pdp.finish(lower_prob, upper_prob)
    }

    /// Smallest and largest component magnitude of a link, `None` without components
    pub fn min_max_amplitude(&self, link: &str) -> Result<Option<(f64, f64)>> {
        let (index, entry, types) = self.link(link)?;
        let mut bounds: Option<(f64, f64)> = None;
        for n in self.range(Window::full())?.indices() {
            for component in self.components(index, entry, types, n)? {
                let magnitude = component.amplitude.norm();
                bounds = Some(match bounds {
                    Some((min, max)) => (min.min(magnitude), max.max(magnitude)),
                    None => (magnitude, magnitude),
                });
            }
        }
        Ok(bounds)
    }
}

impl CdxReader for ContinuousDelayReader {
    fn delay_type(&self) -> DelayType {
        DelayType::ContinuousDelay
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
        let (index, _, _) = self.link(link)?;
        Ok(self.file.reference_delays(index).to_vec())
    }

    fn close(&mut self) {
        self.file.close();
    }

    fn is_closed(&self) -> bool {
        !self.file.is_open()
    }
}
