//! Run profile configuration
//!
//! A run profile is a YAML document naming the token endpoint, the data
//! endpoint, the shared query filters, the fields to sum and the optional
//! sinks. Credentials and the brand code never live in a profile; they come
//! from the environment (optionally seeded from a `.env` file).

use crate::aggregate::{check_unique, FieldSpec, RowErrorPolicy};
use crate::auth::{AuthConfig, ClientCredentials, Credentials, UserCredentials};
use crate::error::{Error, Result};
use crate::fetch::EndpointConfig;
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::output::{CsvConfig, TableConfig};
use crate::pagination::{PageFailurePolicy, PaginationOptions, DEFAULT_CONCURRENCY};
use crate::profiles;
use crate::query::{QueryTemplate, DATE_FROM_KEY, DATE_TO_KEY, FREQUENCY_KEY};
use crate::template::{self, TemplateContext};
use crate::types::BackoffType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

// ============================================================================
// Run Profile
// ============================================================================

/// Complete run profile loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunProfile {
    /// Profile name (used in export file names)
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Token endpoint
    pub auth: AuthConfig,

    /// Data endpoint
    pub endpoint: EndpointConfig,

    /// Filters shared by every page request
    #[serde(default)]
    pub query: QueryTemplate,

    /// Fields to sum
    pub fields: Vec<FieldSpec>,

    /// Pagination settings
    #[serde(default)]
    pub pagination: PaginationSettings,

    /// Aggregation settings
    #[serde(default)]
    pub aggregation: AggregationSettings,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,

    /// CSV export
    #[serde(default)]
    pub csv: CsvConfig,

    /// Table sink
    #[serde(default)]
    pub table: Option<TableConfig>,
}

/// Pagination settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationSettings {
    /// Maximum page fetches in flight
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// What to do when a page after the first fails
    #[serde(default)]
    pub on_page_error: PageFailurePolicy,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            on_page_error: PageFailurePolicy::default(),
        }
    }
}

/// Aggregation settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSettings {
    /// What to do with a row that cannot be coerced
    #[serde(default)]
    pub on_row_error: RowErrorPolicy,
}

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries for data requests (token requests are never retried)
    #[serde(default)]
    pub max_retries: u32,

    /// Delay growth between retries
    #[serde(default)]
    pub backoff: BackoffType,

    /// First retry delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on a retry delay in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Client-side rate limit
    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

fn default_timeout() -> u64 {
    30
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_secs() -> u64 {
    30
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: 0,
            backoff: BackoffType::default(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_secs: default_max_backoff_secs(),
            requests_per_second: None,
        }
    }
}

/// Command-line overrides applied on top of a profile
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileOverrides {
    /// Start date (`YYYYMMDD`)
    pub from: Option<String>,
    /// End date (`YYYYMMDD`)
    pub to: Option<String>,
    /// Frequency filter
    pub frequency: Option<String>,
    /// Concurrency limit
    pub concurrency: Option<usize>,
    /// Abort on the first failed page
    pub fail_fast: bool,
    /// Skip rows that cannot be coerced
    pub skip_bad_rows: bool,
    /// Extra query filters (e.g. `fbyatiende=CAC`)
    pub params: Vec<(String, String)>,
}

impl RunProfile {
    /// Parse and validate a profile from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let profile: RunProfile = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Failed to parse run profile YAML: {e}")))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a profile by built-in name or from a YAML file path
    pub fn load(name_or_path: impl AsRef<Path>) -> Result<Self> {
        let path = name_or_path.as_ref();
        let path_str = path.to_string_lossy();

        if !path_str.contains('/')
            && !path_str.contains('\\')
            && !path_str.ends_with(".yaml")
            && !path_str.ends_with(".yml")
        {
            if let Some(yaml) = profiles::get_builtin(&path_str) {
                return Self::from_yaml(yaml);
            }
        }

        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::config(format!(
                    "Profile '{}' not found. Built-in profiles: {}. Or provide a path to a YAML file.",
                    path.display(),
                    profiles::list_builtin().join(", ")
                ))
            } else {
                Error::config(format!(
                    "Failed to read profile file '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;
        Self::from_yaml(&content)
    }

    /// Validate the profile
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("name"));
        }

        validate_url("auth.token_url", &self.auth.token_url)?;
        validate_url("endpoint.url", &self.endpoint.url)?;

        if self.endpoint.page_param.is_empty() {
            return Err(Error::invalid_value(
                "endpoint.page_param",
                "must not be empty",
            ));
        }

        self.query.validate()?;

        if self.fields.is_empty() {
            return Err(Error::invalid_value("fields", "at least one field is required"));
        }
        check_unique(&self.fields)?;

        if self.pagination.concurrency == 0 {
            return Err(Error::invalid_value(
                "pagination.concurrency",
                "must be at least 1",
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(Error::invalid_value("http.timeout_secs", "must be at least 1"));
        }

        if let Some(ref table) = self.table {
            table.validate()?;
        }

        Ok(())
    }

    /// Apply command-line overrides and re-validate
    pub fn apply_overrides(&mut self, overrides: &ProfileOverrides) -> Result<()> {
        if let Some(ref from) = overrides.from {
            self.query = self.query.clone().param(DATE_FROM_KEY, from.as_str());
        }
        if let Some(ref to) = overrides.to {
            self.query = self.query.clone().param(DATE_TO_KEY, to.as_str());
        }
        if let Some(ref frequency) = overrides.frequency {
            self.query = self.query.clone().param(FREQUENCY_KEY, frequency.as_str());
        }
        for (key, value) in &overrides.params {
            self.query = self.query.clone().param(key.as_str(), value.as_str());
        }
        if let Some(concurrency) = overrides.concurrency {
            self.pagination.concurrency = concurrency;
        }
        if overrides.fail_fast {
            self.pagination.on_page_error = PageFailurePolicy::FailFast;
        }
        if overrides.skip_bad_rows {
            self.aggregation.on_row_error = RowErrorPolicy::Skip;
        }
        self.validate()
    }

    /// Render `{{ var }}` templates in the endpoint URL and query values
    pub fn render(&self, ctx: &TemplateContext) -> Result<RunProfile> {
        let mut rendered = self.clone();
        rendered.endpoint.url = template::render(&self.endpoint.url, ctx)?;
        rendered.query = self.query.render(ctx)?;
        validate_url("endpoint.url", &rendered.endpoint.url)?;
        rendered.query.validate()?;
        Ok(rendered)
    }

    /// Pagination options for `fetch_all`
    pub fn pagination_options(&self) -> PaginationOptions {
        PaginationOptions::new()
            .with_concurrency(self.pagination.concurrency)
            .with_failure_policy(self.pagination.on_page_error)
    }

    /// HTTP client configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .max_retries(self.http.max_retries)
            .backoff(
                self.http.backoff,
                Duration::from_millis(self.http.initial_backoff_ms),
                Duration::from_secs(self.http.max_backoff_secs),
            );
        if let Some(rps) = self.http.requests_per_second {
            builder = builder.rate_limit(RateLimiterConfig::per_second(rps));
        }
        builder.build()
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Check a URL parses, with any template variables stubbed out
fn validate_url(field: &str, url: &str) -> Result<()> {
    let candidate = if template::has_templates(url) {
        let mut ctx = TemplateContext::new();
        for var in template::extract_variables(url) {
            ctx.set(var, "x");
        }
        template::render(url, &ctx)?
    } else {
        url.to_string()
    };

    url::Url::parse(&candidate)
        .map_err(|e| Error::invalid_value(field, format!("'{url}' is not a valid URL: {e}")))?;
    Ok(())
}

// ============================================================================
// Environment
// ============================================================================

/// User e-mail
pub const ENV_EMAIL: &str = "EMAIL_USER";
/// User password
pub const ENV_PASSWORD: &str = "PWD_USER";
/// Application client id
pub const ENV_CLIENT_ID: &str = "CLIENT_ID";
/// Application secret key
pub const ENV_SECRET_KEY: &str = "SECRET_KEY";
/// Brand code substituted for `{{ marca }}`
pub const ENV_MARCA: &str = "MARCA";

/// Every variable read from the environment
pub const ENV_VARS: [&str; 5] = [
    ENV_EMAIL,
    ENV_PASSWORD,
    ENV_CLIENT_ID,
    ENV_SECRET_KEY,
    ENV_MARCA,
];

/// Load a `.env` file into the process environment
///
/// With no explicit path the nearest `.env` is used, if any. A missing file
/// is not an error.
pub fn load_env_file(path: Option<&Path>) {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => info!("Loaded .env from: {:?}", path),
        Err(e) => warn!("Could not load .env file: {}", e),
    }
}

/// Values read from the environment for one run
#[derive(Debug)]
pub struct Environment {
    credentials: Credentials,
    marca: String,
    missing: Vec<&'static str>,
}

impl Environment {
    /// Read from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup; missing or empty values warn and default to ""
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut missing = Vec::new();
        let mut read = |key: &'static str| match lookup(key).filter(|v| !v.is_empty()) {
            Some(value) => value,
            None => {
                warn!("Environment variable {} is not set, using an empty value", key);
                missing.push(key);
                String::new()
            }
        };

        let email = read(ENV_EMAIL);
        let pwd = read(ENV_PASSWORD);
        let client_id = read(ENV_CLIENT_ID);
        let secret_key = read(ENV_SECRET_KEY);
        let marca = read(ENV_MARCA);

        Self {
            credentials: Credentials::new(
                UserCredentials::new(email, pwd),
                ClientCredentials::new(client_id, secret_key),
            ),
            marca,
            missing,
        }
    }

    /// Token endpoint credentials
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Brand code
    pub fn marca(&self) -> &str {
        &self.marca
    }

    /// Variables that were missing or empty
    pub fn missing(&self) -> &[&'static str] {
        &self.missing
    }

    /// Template context for rendering a profile
    pub fn template_context(&self) -> TemplateContext {
        TemplateContext::new().with("marca", self.marca.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Method, NumericKind};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const PROFILE: &str = r#"
name: funnel-detalle
description: Funnel detail
auth:
  token_url: https://api.sicopweb.com/auth/v3/token
endpoint:
  url: https://api.sicopweb.com/funnel/qa/indicadores/nacional/detalle
query:
  origen: "{{ marca }}"
  fbyfechaini: "20251202"
  fbyfechafin: "20260102"
fields:
  - { name: prospectos }
  - { name: prospectosinactivos, kind: float }
"#;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_parse_profile_with_defaults() {
        let profile = RunProfile::from_yaml(PROFILE).unwrap();

        assert_eq!(profile.name, "funnel-detalle");
        assert_eq!(profile.endpoint.method, Method::GET);
        assert_eq!(profile.fields[1].kind, NumericKind::Float);
        assert_eq!(profile.pagination, PaginationSettings::default());
        assert_eq!(profile.aggregation.on_row_error, RowErrorPolicy::Abort);
        assert_eq!(profile.http, HttpSettings::default());
        assert!(!profile.csv.enabled);
        assert!(profile.table.is_none());
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let yaml = PROFILE.replace("prospectosinactivos, kind: float", "prospectos");
        let err = RunProfile::from_yaml(&yaml).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_reversed_dates_rejected() {
        let yaml = PROFILE.replace("20251202", "20260301");
        assert!(RunProfile::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_bad_url_rejected() {
        let yaml = PROFILE.replace("https://api.sicopweb.com/auth/v3/token", "not a url");
        assert!(RunProfile::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let yaml = format!("{PROFILE}pagination:\n  concurrency: 0\n");
        assert!(RunProfile::from_yaml(&yaml).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut profile = RunProfile::from_yaml(PROFILE).unwrap();
        let overrides = ProfileOverrides {
            from: Some("20260101".to_string()),
            to: Some("20260131".to_string()),
            frequency: Some("MENSUAL".to_string()),
            concurrency: Some(2),
            fail_fast: true,
            skip_bad_rows: true,
            params: vec![("fbyatiende".to_string(), "CAC".to_string())],
        };

        profile.apply_overrides(&overrides).unwrap();

        assert_eq!(profile.query.get_str(DATE_FROM_KEY), Some("20260101"));
        assert_eq!(profile.query.get_str(DATE_TO_KEY), Some("20260131"));
        assert_eq!(profile.query.get_str(FREQUENCY_KEY), Some("MENSUAL"));
        assert_eq!(profile.query.get_str("fbyatiende"), Some("CAC"));
        let options = profile.pagination_options();
        assert_eq!(options.concurrency_limit, 2);
        assert_eq!(options.failure_policy, PageFailurePolicy::FailFast);
        assert_eq!(profile.aggregation.on_row_error, RowErrorPolicy::Skip);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut profile = RunProfile::from_yaml(PROFILE).unwrap();
        let overrides = ProfileOverrides {
            to: Some("20200101".to_string()),
            ..Default::default()
        };
        assert!(profile.apply_overrides(&overrides).is_err());
    }

    #[test]
    fn test_render_substitutes_marca() {
        let yaml = PROFILE.replace(
            "funnel/qa/indicadores/nacional/detalle",
            "bi/prod/indicadores/{{ marca }}/nacional",
        );
        let profile = RunProfile::from_yaml(&yaml).unwrap();
        let env = Environment::from_lookup(lookup(&[(ENV_MARCA, "acme")]));

        let rendered = profile.render(&env.template_context()).unwrap();

        assert_eq!(
            rendered.endpoint.url,
            "https://api.sicopweb.com/bi/prod/indicadores/acme/nacional"
        );
        assert_eq!(rendered.query.get_str("origen"), Some("acme"));
    }

    #[test]
    fn test_http_client_config() {
        let yaml = format!(
            "{PROFILE}http:\n  timeout_secs: 5\n  max_retries: 2\n  backoff: linear\n  \
             initial_backoff_ms: 250\n  max_backoff_secs: 4\n  requests_per_second: 10\n"
        );
        let profile = RunProfile::from_yaml(&yaml).unwrap();
        let config = profile.http_client_config();

        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.backoff_type, BackoffType::Linear);
        assert_eq!(config.initial_backoff, Duration::from_millis(250));
        assert_eq!(config.max_backoff, Duration::from_secs(4));
        assert_eq!(config.rate_limit, Some(RateLimiterConfig::per_second(10)));
    }

    #[test]
    fn test_yaml_round_trip_is_valid() {
        let profile = RunProfile::from_yaml(PROFILE).unwrap();
        let yaml = profile.to_yaml().unwrap();
        assert_eq!(RunProfile::from_yaml(&yaml).unwrap(), profile);
    }

    #[test]
    fn test_environment_reports_missing() {
        let env = Environment::from_lookup(lookup(&[
            (ENV_EMAIL, "ana@example.com"),
            (ENV_PASSWORD, "pw"),
            (ENV_CLIENT_ID, ""),
        ]));

        assert_eq!(env.missing(), &[ENV_CLIENT_ID, ENV_SECRET_KEY, ENV_MARCA]);
        assert_eq!(env.marca(), "");
        assert_eq!(env.credentials().user.email, "ana@example.com");
        assert_eq!(env.credentials().client.client_id, "");
    }

    #[test]
    fn test_load_unknown_profile() {
        let err = RunProfile::load("does-not-exist").unwrap_err();
        assert!(err.to_string().contains("Built-in profiles"));
    }
}
