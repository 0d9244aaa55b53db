//! CDX CLI crate
//!
//! Purpose:
//! - Provide a command-line front end over `cdx-storage` for inspecting,
//!   analysing and converting CDX files.
//! - Emit the data shapes consumed by plotting tools (time series, PDP
//!   matrices, delay-Doppler spectra) as JSON or CSV.
//!
//! Major commands (see [commands]):
//! - info: parameters, links, component-type registries and delay axes.
//! - metrics: power, coherent power, multipath spread, component count and
//!   the LOS/multipath power split of continuous-delay links.
//! - pdp: normalised power delay profile of one link.
//! - discrete-power, spectrum: coherent power and delay-Doppler spectrum of
//!   discrete-delay links.
//! - convert: continuous-delay to discrete-delay conversion with a progress bar.
//!
//! Notes:
//! - The binary (src/main.rs) wires up logging and argument parsing, then calls
//!   [`CdxCli::execute`]. Logs go to stderr so that stdout carries only results.

pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use commands::CdxCli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
