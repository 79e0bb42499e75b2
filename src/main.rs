//! tunebridge - a music player core.
//!
//! A local song library plus online search and internet radio, backed by a
//! remote music service reached through a forwarding proxy. The player
//! itself (state store, playback engine, event loop) lives in [`player`];
//! this binary exposes the library and lookup operations as CLI commands.

pub mod cli;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod library;
pub mod metadata;
pub mod model;
pub mod player;
pub mod scanner;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("tunebridge=info".parse()?))
        .init();

    let config = config::load();
    cli::run_command(&args, &config)?;
    Ok(())
}
