//! Subsonic bridge - a Subsonic-compatible API server with scrobble fan-out.
//!
//! Serves the `/rest` protocol surface (XML, JSON and JSONP envelopes) and
//! forwards play reports to external listen-tracking services such as
//! ListenBrainz.

pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod model;
pub mod scrobble;
pub mod subsonic;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("subsonic_bridge=info".parse()?))
        .init();

    cli::run_command(&args)
}
