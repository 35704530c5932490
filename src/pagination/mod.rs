//! Pagination module
//!
//! # Overview
//!
//! Drives a `PageFetcher` across every page of a query. The first page
//! reports the total page count; the remaining pages are fetched with bounded
//! concurrency and merged in ascending page order.

mod coordinator;
mod types;

pub use coordinator::{fetch_all, fetch_all_with_observer};
pub use types::{
    PageBatch, PageFailurePolicy, PageObserver, PageProgress, PaginationOptions, ResultSet,
    TracingObserver, DEFAULT_CONCURRENCY,
};

#[cfg(test)]
mod tests;
