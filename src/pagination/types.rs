//! Pagination types and traits
//!
//! Options, progress reporting and the merged result of a paginated query.

use crate::types::Row;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Default number of page fetches allowed in flight
pub const DEFAULT_CONCURRENCY: usize = 5;

/// What to do when a page after the first one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageFailurePolicy {
    /// Log the failure, omit the page's rows and keep going
    #[default]
    BestEffort,
    /// Abort on the first failure, dropping fetches still in flight
    FailFast,
}

/// Options for `fetch_all`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationOptions {
    /// Maximum page fetches in flight (values below 1 are treated as 1)
    pub concurrency_limit: usize,
    /// Failure policy for pages 2..=N
    pub failure_policy: PageFailurePolicy,
}

impl Default for PaginationOptions {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY,
            failure_policy: PageFailurePolicy::default(),
        }
    }
}

impl PaginationOptions {
    /// Create default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit
    #[must_use]
    pub fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Set the failure policy
    #[must_use]
    pub fn with_failure_policy(mut self, policy: PageFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Concurrency limit clamped to at least one
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency_limit.max(1)
    }
}

/// Progress report for one successfully fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageProgress {
    /// Page number
    pub page: u32,
    /// Total pages of the query
    pub total_pages: u32,
    /// Records in the page
    pub item_count: usize,
}

/// Receives a progress report after each successful page
pub trait PageObserver: Send + Sync {
    /// Called once per successful page, in completion order
    fn on_page(&self, progress: &PageProgress);
}

/// Observer that logs each page at info level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl PageObserver for TracingObserver {
    fn on_page(&self, progress: &PageProgress) {
        info!(
            "Page {} of {}, items: {}",
            progress.page, progress.total_pages, progress.item_count
        );
    }
}

/// The records of one page, tagged with the page number that was requested
#[derive(Debug, Clone, PartialEq)]
pub struct PageBatch {
    /// Requested page number
    pub page: u32,
    /// Records in server order
    pub records: Vec<Row>,
}

/// Ordered merge of all pages fetched for one query
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    pages: Vec<PageBatch>,
    total_pages: u32,
    failed_pages: Vec<u32>,
}

impl ResultSet {
    /// Build a result set; batches are ordered by page number
    pub(crate) fn new(
        mut pages: Vec<PageBatch>,
        total_pages: u32,
        mut failed_pages: Vec<u32>,
    ) -> Self {
        pages.sort_by_key(|b| b.page);
        pages.dedup_by_key(|b| b.page);
        failed_pages.sort_unstable();
        Self {
            pages,
            total_pages,
            failed_pages,
        }
    }

    /// Merged page batches in ascending page order
    pub fn pages(&self) -> &[PageBatch] {
        &self.pages
    }

    /// Total pages reported by the first page
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Pages dropped under the best-effort policy
    pub fn failed_pages(&self) -> &[u32] {
        &self.failed_pages
    }

    /// Whether some pages were dropped
    pub fn is_partial(&self) -> bool {
        !self.failed_pages.is_empty()
    }

    /// Total number of rows across merged pages
    pub fn len(&self) -> usize {
        self.pages.iter().map(|b| b.records.len()).sum()
    }

    /// Whether there are no rows at all
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over all rows in page order
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.pages.iter().flat_map(|b| b.records.iter())
    }

    /// Flatten into rows in page order
    pub fn into_rows(self) -> Vec<Row> {
        self.pages.into_iter().flat_map(|b| b.records).collect()
    }
}
