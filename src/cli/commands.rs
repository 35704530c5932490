//! CLI commands and argument parsing

use crate::config::ProfileOverrides;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SICOP analytics extractor
#[derive(Parser, Debug)]
#[command(name = "sicop-extract")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run profile: built-in name or YAML file
    #[arg(short, long, global = true)]
    pub profile: Option<PathBuf>,

    /// Environment file with credentials (defaults to the nearest .env)
    #[arg(short, long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch every page, sum the profile fields and print the totals
    Run {
        /// Start date (YYYYMMDD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYYMMDD)
        #[arg(long)]
        to: Option<String>,

        /// Frequency filter (e.g. DIARIA, MENSUAL)
        #[arg(long)]
        frequency: Option<String>,

        /// Maximum page requests in flight
        #[arg(long)]
        concurrency: Option<usize>,

        /// Abort when any page fails instead of dropping it
        #[arg(long)]
        fail_fast: bool,

        /// Leave rows that cannot be summed out of the totals
        #[arg(long)]
        skip_bad_rows: bool,

        /// Extra query filter, repeatable (e.g. --param fbyatiende=CAC)
        #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Export rows as CSV into this directory
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Load rows into the profile's table in this DuckDB file
        #[arg(long)]
        database: Option<PathBuf>,
    },

    /// Check that credentials are accepted by the token endpoint
    Token,

    /// Validate the run profile and environment
    Validate,

    /// List built-in run profiles
    Profiles,

    /// Print the resolved run profile as YAML
    Show,
}

impl Commands {
    /// Profile overrides carried by `run`
    pub fn overrides(&self) -> ProfileOverrides {
        match self {
            Commands::Run {
                from,
                to,
                frequency,
                concurrency,
                fail_fast,
                skip_bad_rows,
                params,
                ..
            } => ProfileOverrides {
                from: from.clone(),
                to: to.clone(),
                frequency: frequency.clone(),
                concurrency: *concurrency,
                fail_fast: *fail_fast,
                skip_bad_rows: *skip_bad_rows,
                params: params.clone(),
            },
            _ => ProfileOverrides::default(),
        }
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
