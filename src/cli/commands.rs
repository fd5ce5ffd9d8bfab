//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Precoro extraction tap
#[derive(Parser, Debug)]
#[command(name = "precoro-tap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Inline config JSON
    #[arg(long, global = true)]
    pub config_json: Option<String>,

    /// State file (JSON) with the bookmarks of the previous run
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Inline state JSON
    #[arg(long, global = true)]
    pub state_json: Option<String>,

    /// Write the final state to this file as well as to stdout
    #[arg(long, global = true)]
    pub state_out: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Test the credential against the API
    Check,

    /// Print the catalog of available streams
    Discover,

    /// Extract records as SCHEMA/RECORD/STATE lines on stdout
    Read {
        /// Streams to emit (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,
    },
}

impl Commands {
    /// Stream names selected for a read
    pub fn selected_streams(&self) -> Vec<String> {
        match self {
            Commands::Read {
                streams: Some(streams),
            } => streams
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }
}
