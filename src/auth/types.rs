//! Credential and token types
//!
//! Secret halves are held in `SecretString` so they never end up in logs or
//! `Debug` output.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// User-level credentials (e-mail and password)
#[derive(Debug)]
pub struct UserCredentials {
    /// Account e-mail
    pub email: String,
    /// Account password
    pub pwd: SecretString,
}

impl UserCredentials {
    /// Create user credentials
    pub fn new(email: impl Into<String>, pwd: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            pwd: SecretString::from(pwd.into()),
        }
    }
}

/// Application-level credentials (client id and secret key)
#[derive(Debug)]
pub struct ClientCredentials {
    /// Application client id
    pub client_id: String,
    /// Application secret key
    pub secret_key: SecretString,
}

impl ClientCredentials {
    /// Create client credentials
    pub fn new(client_id: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret_key: SecretString::from(secret_key.into()),
        }
    }
}

/// Both credential pairs needed by the token endpoint
#[derive(Debug)]
pub struct Credentials {
    /// User credentials
    pub user: UserCredentials,
    /// Application credentials
    pub client: ClientCredentials,
}

impl Credentials {
    /// Combine user and client credentials
    pub fn new(user: UserCredentials, client: ClientCredentials) -> Self {
        Self { user, client }
    }

    /// Form fields sent to the token endpoint
    pub(crate) fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            ("email".to_string(), self.user.email.clone()),
            ("pwd".to_string(), self.user.pwd.expose_secret().to_string()),
            ("client_id".to_string(), self.client.client_id.clone()),
            (
                "secret_key".to_string(),
                self.client.secret_key.expose_secret().to_string(),
            ),
        ]
    }
}

/// Bearer token obtained once per run
///
/// Never refreshed; shared by reference across all page fetches.
#[derive(Debug)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token value
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// A fresh secret copy for a single request
    pub(crate) fn to_bearer(&self) -> SecretString {
        SecretString::from(self.expose().to_string())
    }
}

/// Token endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Token endpoint URL
    pub token_url: String,
    /// Dotted path of the token in the JSON response
    #[serde(default = "default_token_path")]
    pub token_path: String,
}

fn default_token_path() -> String {
    "token".to_string()
}

impl AuthConfig {
    /// Create a config for the given token URL
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            token_path: default_token_path(),
        }
    }

    /// Override the token path
    #[must_use]
    pub fn with_token_path(mut self, path: impl Into<String>) -> Self {
        self.token_path = path.into();
        self
    }
}
