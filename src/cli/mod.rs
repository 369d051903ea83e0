//! Command-line interface.

pub mod doctor;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use doctor::run_doctor_command;

#[derive(Parser, Debug)]
#[command(name = "formo-sync")]
#[command(about = "Wallet- and network-aware analytics lifecycle console")]
#[command(version)]
pub struct Cli {
    /// Explicit TOML config file (default: ~/.formo-sync/config.toml)
    #[arg(long, global = true, env = "FORMO_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Interactive console (default)
    Repl {
        /// Rebuild the analytics client on every wallet or network change
        #[arg(long)]
        reinit_on_change: bool,

        /// Connect the demo wallet on startup
        #[arg(long)]
        auto_connect: bool,
    },

    /// Validate configuration and probe the RPC endpoint
    Doctor {
        /// Exit non-zero when any check fails
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    /// Subcommand to run, defaulting to the console.
    pub fn selected(&self) -> Command {
        self.command.clone().unwrap_or(Command::Repl {
            reinit_on_change: false,
            auto_connect: false,
        })
    }
}
