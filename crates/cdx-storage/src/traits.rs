//! Reader trait shared by both file variants

use crate::{config::Parameters, error::Result, schema::DelayType};

/// Metadata access common to continuous- and discrete-delay readers
pub trait CdxReader {
    /// Variant of the open file
    fn delay_type(&self) -> DelayType;

    /// Scalar parameters of the file
    fn parameters(&self) -> Parameters;

    /// Link names in file order
    fn link_names(&self) -> Vec<String>;

    /// Number of links
    fn nof_links(&self) -> usize {
        self.link_names().len()
    }

    /// Number of CIRs per link
    fn nof_cirs(&self) -> u64;

    /// CIR rate in Hz
    fn cir_rate_hz(&self) -> f64 {
        self.parameters().cir_rate_hz
    }

    /// Duration covered by the file in seconds
    fn length_s(&self) -> f64 {
        self.nof_cirs() as f64 / self.cir_rate_hz()
    }

    /// Reference delay of every CIR of `link`
    fn reference_delays(&self, link: &str) -> Result<Vec<f64>>;

    /// Release the file handle; later calls are no-ops
    fn close(&mut self);

    /// Whether [`close`](Self::close) has been called
    fn is_closed(&self) -> bool;
}
