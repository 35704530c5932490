// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # SICOP Extract
//!
//! Pulls paginated indicator data out of the SICOP analytics API and sums
//! the numeric fields of every row.
//!
//! ## Features
//!
//! - **Token Exchange**: User and application credentials traded for one bearer token per run
//! - **Concurrent Pagination**: Page 1 reports the page count, the rest stream with a bounded number in flight
//! - **Ordered Merge**: Rows always come back in ascending page order
//! - **Typed Aggregation**: Integer or float totals per field, with overflow checks
//! - **Optional Sinks**: Pipe-delimited CSV export and a DuckDB table reload
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sicop_extract::{aggregate, fetch_all, Environment, HttpClient, HttpPageFetcher};
//! use sicop_extract::{PaginationOptions, RunProfile, TokenProvider};
//!
//! #[tokio::main]
//! async fn main() -> sicop_extract::Result<()> {
//!     let env = Environment::from_env();
//!     let profile = RunProfile::load("funnel-detalle")?.render(&env.template_context())?;
//!
//!     let client = HttpClient::with_config(profile.http_client_config())?;
//!     let token = TokenProvider::new(client.clone(), profile.auth.clone())
//!         .acquire_token(env.credentials())
//!         .await?;
//!
//!     let fetcher = HttpPageFetcher::new(client, profile.endpoint.clone());
//!     let result = fetch_all(&fetcher, &profile.query, &token, &PaginationOptions::new()).await?;
//!
//!     let totals = aggregate(&result.into_rows(), &profile.fields)?;
//!     println!("{totals}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌─────────────┐   ┌───────────┐
//! │   Auth   │──▶│  Pagination  │──▶│  Aggregate  │──▶│  Totals   │
//! │  token   │   │  fetch_all   │   │  per field  │   └───────────┘
//! └──────────┘   └──────┬───────┘   └─────────────┘
//!                       │ PageFetcher (HTTP + decode)
//!                       ▼
//!                ┌──────────────┐
//!                │    Output    │  CSV file, DuckDB table
//!                └──────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(missing_docs)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Token acquisition
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Query filters and per-page queries
pub mod query;

/// Response decoding
pub mod decode;

/// Single-page fetch
pub mod fetch;

/// Concurrent pagination
pub mod pagination;

/// Field aggregation
pub mod aggregate;

/// CSV export and table sink
pub mod output;

/// Run profiles and environment
pub mod config;

/// Built-in run profiles
pub mod profiles;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use aggregate::{aggregate, aggregate_with_policy, AggregateTotals, FieldSpec, Total};
pub use auth::{AccessToken, AuthConfig, Credentials, TokenProvider};
pub use config::{Environment, RunProfile};
pub use fetch::{HttpPageFetcher, Page, PageFetcher};
pub use http::{HttpClient, HttpClientConfig};
pub use pagination::{fetch_all, PaginationOptions, ResultSet};
pub use query::{PageQuery, QueryTemplate};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
