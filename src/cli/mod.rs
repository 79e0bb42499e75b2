//! Command-line interface for tunebridge.
//!
//! This module provides CLI commands for importing and browsing the library,
//! searching the music service, matching metadata and listing radio stations.

mod commands;

pub use commands::{Cli, Commands, RadioCommands, run_command};
