//! CLI runner - executes commands

use crate::aggregate::{aggregate_with_policy, AggregateReport};
use crate::auth::{AccessToken, TokenProvider};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_env_file, Environment, ProfileOverrides, RunProfile};
use crate::error::{Error, Result, ResultExt};
use crate::fetch::HttpPageFetcher;
use crate::http::HttpClient;
use crate::output::{csv_file_name, CsvWriter, TableLoadSummary, TableSink};
use crate::pagination::{fetch_all, ResultSet};
use crate::profiles::list_builtin;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Run {
                csv_dir, database, ..
            } => {
                let overrides = self.cli.command.overrides();
                self.run_profile(&overrides, csv_dir.as_deref(), database.as_deref())
                    .await
            }
            Commands::Token => self.token().await,
            Commands::Validate => self.validate(),
            Commands::Profiles => self.list_profiles(),
            Commands::Show => self.show(),
        }
    }

    /// Load the run profile named by `-p`
    fn load_profile(&self) -> Result<RunProfile> {
        let path = self
            .cli
            .profile
            .as_ref()
            .ok_or_else(|| Error::config("Run profile not specified (use -p flag)"))?;
        RunProfile::load(path)
    }

    /// Load `.env` and read credentials from the environment
    fn load_environment(&self) -> Environment {
        load_env_file(self.cli.env_file.as_deref());
        Environment::from_env()
    }

    /// Acquire a token with the profile's auth settings
    async fn acquire_token(
        &self,
        client: &HttpClient,
        profile: &RunProfile,
        env: &Environment,
    ) -> Result<AccessToken> {
        let provider = TokenProvider::new(client.clone(), profile.auth.clone());
        provider.acquire_token(env.credentials()).await
    }

    /// Fetch, export and aggregate one profile
    async fn run_profile(
        &self,
        overrides: &ProfileOverrides,
        csv_dir: Option<&Path>,
        database: Option<&Path>,
    ) -> Result<()> {
        let start = Instant::now();

        let mut profile = self.load_profile()?;
        profile.apply_overrides(overrides)?;
        let env = self.load_environment();
        let profile = profile.render(&env.template_context())?;

        info!("Running profile '{}'", profile.name);

        let client = HttpClient::with_config(profile.http_client_config())?;
        let token = self.acquire_token(&client, &profile, &env).await?;

        let fetcher = HttpPageFetcher::new(client, profile.endpoint.clone());
        let result = fetch_all(
            &fetcher,
            &profile.query,
            &token,
            &profile.pagination_options(),
        )
        .await?;

        if result.is_partial() {
            warn!(
                "Pages {:?} were dropped; totals may undercount",
                result.failed_pages()
            );
        }

        let csv_path = self.export_csv(&profile, &result, csv_dir)?;
        let table_summary = self.load_table(&profile, &result, database)?;

        let total_pages = result.total_pages();
        let failed_pages = result.failed_pages().to_vec();
        let rows = result.into_rows();
        let report =
            aggregate_with_policy(&rows, &profile.fields, profile.aggregation.on_row_error)?;

        let elapsed = start.elapsed().as_secs_f64();

        match self.cli.format {
            OutputFormat::Json => self.output_message(&json!({
                "type": "RESULT",
                "profile": profile.name,
                "total_pages": total_pages,
                "failed_pages": failed_pages,
                "rows": report.rows_seen,
                "skipped_rows": report.skipped_rows,
                "totals": report.totals,
                "csv": csv_path,
                "table": table_summary.as_ref().map(|s| json!({
                    "rows_inserted": s.rows_inserted,
                    "failed_pages": s.failed_pages,
                })),
                "elapsed_secs": elapsed,
            })),
            OutputFormat::Pretty => print_summary(
                &profile.name,
                total_pages,
                &failed_pages,
                &report,
                csv_path.as_deref(),
                table_summary.as_ref(),
                elapsed,
            ),
        }

        Ok(())
    }

    /// Write the CSV export when asked for on the command line or in the profile
    fn export_csv(
        &self,
        profile: &RunProfile,
        result: &ResultSet,
        csv_dir: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        let dir = match (csv_dir, &profile.csv.dir) {
            (Some(dir), _) => dir.to_path_buf(),
            (None, _) if !profile.csv.enabled => return Ok(None),
            (None, Some(dir)) => PathBuf::from(dir),
            (None, None) => PathBuf::from("."),
        };

        let file_name = csv_file_name(
            chrono::Local::now().date_naive(),
            &profile.name,
            &profile.query,
        );
        CsvWriter::new(dir)
            .with_delimiter(profile.csv.delimiter)
            .write(result, &file_name)
    }

    /// Reload the profile's table when a database file is given
    fn load_table(
        &self,
        profile: &RunProfile,
        result: &ResultSet,
        database: Option<&Path>,
    ) -> Result<Option<TableLoadSummary>> {
        let Some(path) = database else {
            return Ok(None);
        };
        let table = profile.table.clone().ok_or_else(|| {
            Error::config(format!(
                "Profile '{}' has no table definition",
                profile.name
            ))
        })?;

        let mut sink = TableSink::open(path, table)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        sink.load(result).map(Some)
    }

    /// Check credentials against the token endpoint
    async fn token(&self) -> Result<()> {
        let profile = self.load_profile()?;
        let env = self.load_environment();
        let client = HttpClient::with_config(profile.http_client_config())?;

        self.acquire_token(&client, &profile, &env).await?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!("Token acquired from {}", profile.auth.token_url)
            }
        }));
        Ok(())
    }

    /// Validate profile and environment
    fn validate(&self) -> Result<()> {
        let profile = self.load_profile()?;
        let env = self.load_environment();
        profile.render(&env.template_context())?;

        let missing = env.missing();
        let (level, message) = if missing.is_empty() {
            (
                "INFO",
                format!(
                    "Profile '{}' is valid with {} fields",
                    profile.name,
                    profile.fields.len()
                ),
            )
        } else {
            (
                "WARN",
                format!(
                    "Profile '{}' is valid but the environment is missing {}",
                    profile.name,
                    missing.join(", ")
                ),
            )
        };

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": level,
                "message": message
            }
        }));
        Ok(())
    }

    /// List built-in profiles
    fn list_profiles(&self) -> Result<()> {
        let profiles = list_builtin()
            .into_iter()
            .map(|name| {
                let profile = RunProfile::load(name)?;
                Ok(json!({
                    "name": profile.name,
                    "description": profile.description,
                    "method": profile.endpoint.method,
                    "fields": profile.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>(),
                    "table": profile.table.as_ref().map(|t| t.table.as_str()),
                }))
            })
            .collect::<Result<Vec<Value>>>()?;

        self.output_message(&json!({
            "type": "PROFILES",
            "profiles": profiles
        }));
        Ok(())
    }

    /// Print the profile with overrides applied
    fn show(&self) -> Result<()> {
        let profile = self.load_profile()?;
        match self.cli.format {
            OutputFormat::Json => self.output_message(&json!({
                "type": "PROFILE",
                "profile": profile
            })),
            OutputFormat::Pretty => print!("{}", profile.to_yaml()?),
        }
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

fn print_summary(
    profile: &str,
    total_pages: u32,
    failed_pages: &[u32],
    report: &AggregateReport,
    csv_path: Option<&Path>,
    table: Option<&TableLoadSummary>,
    elapsed: f64,
) {
    println!("Profile: {profile}");
    println!(
        "Pages: {} of {}",
        total_pages as usize - failed_pages.len(),
        total_pages
    );
    println!("Rows: {}", report.rows_seen);
    if !report.skipped_rows.is_empty() {
        println!("Skipped rows: {}", report.skipped_rows.len());
    }
    println!("{}", report.totals);
    if !failed_pages.is_empty() {
        println!("Warning: pages {failed_pages:?} failed, totals may undercount");
    }
    if let Some(path) = csv_path {
        println!("CSV: {}", path.display());
    }
    if let Some(summary) = table {
        println!("Table rows inserted: {}", summary.rows_inserted);
        if !summary.failed_pages.is_empty() {
            println!("Table pages rolled back: {:?}", summary.failed_pages);
        }
    }
    println!("Elapsed: {elapsed:.2} s");
}
