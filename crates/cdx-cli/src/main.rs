//! # cdx - command line interface for Channel Data Exchange files
//!
//! Prints file metadata, computes channel metrics for plotting tools and
//! converts continuous-delay files to the discrete-delay variant.

use std::io::IsTerminal;

use anyhow::Context;
use clap::Parser;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cdx_cli::{CdxCli, CliConfig};

fn main() -> anyhow::Result<()> {
    let cli = CdxCli::parse();
    let config = CliConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // --verbose wins over RUST_LOG, which wins over the configured level
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(config.log_level.as_deref().unwrap_or("info"))
        })
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();

    if let Err(err) = cli.execute(config) {
        error!("Command failed: {}", err);
        std::process::exit(1);
    }

    Ok(())
}
