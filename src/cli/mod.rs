//! CLI module
//!
//! Command-line interface for running extraction profiles.
//!
//! # Commands
//!
//! - `run` - Fetch every page, export rows and print field totals
//! - `token` - Check credentials against the token endpoint
//! - `validate` - Validate a run profile and the environment
//! - `profiles` - List built-in run profiles
//! - `show` - Print a run profile as YAML

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
