//! Command-line interface for subsonic-bridge.
//!
//! This module provides the `serve` command plus small operational helpers
//! for checking scrobble credentials and locating the config file.

mod commands;

pub use commands::{Cli, Commands, run_command};
