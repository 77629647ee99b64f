//! CLI definitions for ALE.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ALE CLI.
#[derive(Parser)]
#[command(name = "ale")]
#[command(about = "Application Level Events middleware")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/ale.toml", global = true, env = "ALE_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start every configured cycle and run until Ctrl-C (default)
    Run {
        /// Stop after this many seconds
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Check the configuration and report errors and warnings
    Validate,
}
