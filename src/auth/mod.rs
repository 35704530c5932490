//! Authentication module
//!
//! Exchanges user (email/password) and application (client id/secret key)
//! credentials for a short-lived bearer token. The token is acquired once
//! per run and never refreshed.

mod provider;
mod types;

pub use provider::{extract_jsonpath, TokenProvider};
pub use types::{AccessToken, AuthConfig, ClientCredentials, Credentials, UserCredentials};

#[cfg(test)]
mod tests;
