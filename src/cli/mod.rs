//! CLI module
//!
//! Command-line interface for running the tap.
//!
//! # Commands
//!
//! - `check` - Test the credential against the API
//! - `discover` - Print the stream catalog
//! - `read` - Extract records from the selected streams

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
