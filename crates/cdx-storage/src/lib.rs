//! Storage engine for Channel Data Exchange (CDX) files
//!
//! A CDX file stores the channel impulse responses (CIRs) of one or more
//! radio links sampled at a fixed CIR rate, in one of two variants:
//!
//! - **continuous delay**: per time instant, a list of propagation components
//!   (type, id, delay, complex amplitude) plus a reference delay;
//! - **discrete delay**: per time instant, a column of complex amplitudes on a
//!   regular delay grid.
//!
//! Files are written by [`ContinuousDelayWriter`] and [`DiscreteDelayWriter`]
//! and read by [`ContinuousDelayReader`] and [`DiscreteDelayReader`], or by
//! [`CdxFile::open`] when the variant is not known in advance. Readers compute
//! the channel metrics used by plotting tools: power series, multipath spread,
//! power delay profiles and delay-Doppler spectra.
//!
//! ```no_run
//! use cdx_storage::{CdxFile, CdxReader, Window};
//!
//! # fn main() -> cdx_storage::Result<()> {
//! let file = CdxFile::open("scenario.cdx")?;
//! if let Some(reader) = file.as_continuous() {
//!     for link in reader.link_names() {
//!         let power = reader.compute_power(&link, Window::full())?;
//!         println!("{}: {} CIRs", link, power.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod cir;
pub mod config;
pub mod error;
pub mod ids;
pub mod registry;
pub mod schema;
pub mod traits;
pub mod window;

// Binary sections and file handles
mod file;
mod frame;
mod links;

// Readers and writers
pub mod open;
pub mod read_continuous;
pub mod read_discrete;
pub mod write_continuous;
pub mod write_discrete;

// Algorithms
pub mod convert;
pub mod metrics;
pub mod spectrum;

// Re-export essential types
pub use cir::{Cir, Component};
pub use config::{ContinuousDelayConfig, DiscreteDelayConfig, DiscreteLinkConfig, Parameters};
pub use error::{Result, StorageError};
pub use ids::{CirIndex, LinkIndex};
pub use registry::ComponentTypes;
pub use schema::{DelayType, FileHeader};
pub use traits::CdxReader;
pub use window::{CirRange, Window};

// Re-export implementations
pub use convert::{
    convert_continuous_to_discrete, convert_with_progress, ConversionOptions, ConversionSummary,
    LinkConversion,
};
pub use metrics::{LosMultipathPowers, Pdp, TimeSeries};
pub use open::CdxFile;
pub use read_continuous::ContinuousDelayReader;
pub use read_discrete::{CirGrid, DiscreteDelayReader};
pub use spectrum::DelayDopplerSpectrum;
pub use write_continuous::ContinuousDelayWriter;
pub use write_discrete::DiscreteDelayWriter;

/// Container format version written by this crate
pub const FORMAT_VERSION: u32 = 1;

/// Magic numbers of the file sections
pub mod magic {
    /// File header: "CDXF"
    pub const CDXF: [u8; 4] = *b"CDXF";
    /// Frame: "CIRF"
    pub const CIRF: [u8; 4] = *b"CIRF";
    /// Index: "CIDX"
    pub const CIDX: [u8; 4] = *b"CIDX";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_numbers() {
        let magics = [magic::CDXF, magic::CIRF, magic::CIDX];
        for (i, &magic1) in magics.iter().enumerate() {
            for (j, &magic2) in magics.iter().enumerate() {
                if i != j {
                    assert_ne!(magic1, magic2, "Magic numbers must be distinct");
                }
            }
        }
    }
}
