//! HTTP client module
//!
//! Provides the HTTP client shared by the token provider and the page fetcher.
//!
//! # Features
//!
//! - **Retries**: Opt-in retry logic with backoff (single attempt by default)
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Bearer Auth**: Tokens are carried as `SecretString` and never logged

mod client;
mod rate_limit;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestBody, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
