//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `serve`: the Subsonic HTTP server
//! - `scrobble`: one-off scrobble through the configured backends

mod scrobble;
mod serve;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config;

pub use scrobble::{ScrobbleArgs, cmd_scrobble};
pub use serve::{build_controller, cmd_serve};

/// Subsonic bridge CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to the OS config directory)
    #[arg(long, global = true, env = "SUBSONIC_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Serve the Subsonic API
    Serve {
        /// Override the configured listen address
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },
    /// Send one scrobble for a configured user and wait for every backend
    Scrobble(ScrobbleArgs),
    /// Print where the default config file lives
    ConfigPath,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::ConfigPath => {
            match config::config_path() {
                Some(path) => println!("{}", path.display()),
                None => eprintln!("Could not determine config directory"),
            }
            Ok(())
        }
        Commands::Serve { listen } => {
            let config = config::load(cli.config.as_deref())?;
            let rt = Runtime::new()?;
            cmd_serve(&rt, config, *listen)
        }
        Commands::Scrobble(args) => {
            let config = config::load(cli.config.as_deref())?;
            let rt = Runtime::new()?;
            cmd_scrobble(&rt, &config, args)
        }
    }
}
