//! Token provider
//!
//! Exchanges user and application credentials for a bearer token with a
//! single form-encoded POST. No retry and no caching: a failed attempt
//! aborts the run.

use super::types::{AccessToken, AuthConfig, Credentials};
use crate::error::{Error, Result};
use crate::http::{HttpClient, RequestConfig};
use serde_json::Value;
use tracing::{debug, info};

/// Acquires access tokens from the vendor token endpoint
#[derive(Debug, Clone)]
pub struct TokenProvider {
    client: HttpClient,
    config: AuthConfig,
}

impl TokenProvider {
    /// Create a provider that uses the given HTTP client
    pub fn new(client: HttpClient, config: AuthConfig) -> Self {
        Self { client, config }
    }

    /// Get the auth configuration
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Exchange credentials for an access token
    pub async fn acquire_token(&self, credentials: &Credentials) -> Result<AccessToken> {
        debug!("Requesting access token from {}", self.config.token_url);

        let request = RequestConfig::new()
            .form(credentials.form_fields())
            .retries(0);

        let response = self
            .client
            .post(&self.config.token_url, request)
            .await
            .map_err(|e| match e {
                Error::HttpStatus { status, body } => Error::auth_status(status, body),
                other => Error::auth(format!("token request failed: {other}")),
            })?;

        let body = response
            .text()
            .await
            .map_err(|e| Error::auth(format!("failed to read token response: {e}")))?;

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| Error::auth(format!("token response is not valid JSON: {e}")))?;

        let token = extract_jsonpath(&json, &self.config.token_path)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::auth("missing token field"))?;

        info!("Access token acquired");
        Ok(AccessToken::new(token))
    }
}

/// Extract a string value from JSON using a simple dotted path
/// Supports paths like "$.data.token" or "token"
pub fn extract_jsonpath(value: &Value, path: &str) -> Option<String> {
    let path = path.strip_prefix("$.").unwrap_or(path);

    let mut current = value;
    for part in path.split('.') {
        match current {
            Value::Object(map) => {
                current = map.get(part)?;
            }
            _ => return None,
        }
    }

    match current {
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
