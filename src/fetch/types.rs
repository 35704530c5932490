//! Page fetch types and traits

use crate::auth::AccessToken;
use crate::decode::RecordShape;
use crate::error::Result;
use crate::query::{PageQuery, DEFAULT_PAGE_PARAM};
use crate::types::{Method, Row};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Default header carrying the page the server answered with
pub const CURRENT_PAGE_HEADER: &str = "x-sicop-api-current-page";

/// Default header carrying the total number of pages
pub const TOTAL_PAGES_HEADER: &str = "x-sicop-api-pages";

/// One page of a paginated response
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Page number that was requested
    pub requested_page: u32,
    /// Page number reported by the server (defaults to 1)
    pub current_page: u32,
    /// Total pages reported by the server (defaults to 1)
    pub total_pages: u32,
    /// Records in server order
    pub records: Vec<Row>,
}

impl Page {
    /// Create a page whose header values match the request
    pub fn new(page: u32, total_pages: u32, records: Vec<Row>) -> Self {
        Self {
            requested_page: page,
            current_page: page,
            total_pages,
            records,
        }
    }

    /// Number of records in this page
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether this page has no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Data endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint URL (may contain `{{ marca }}`)
    pub url: String,

    /// HTTP method; GET sends the query string, POST a JSON body
    #[serde(default)]
    pub method: Method,

    /// Where the records live in the response body
    #[serde(default)]
    pub records: RecordShape,

    /// Name of the page parameter
    #[serde(default = "default_page_param")]
    pub page_param: String,

    /// Header with the current page number
    #[serde(default = "default_current_page_header")]
    pub current_page_header: String,

    /// Header with the total page count
    #[serde(default = "default_total_pages_header")]
    pub total_pages_header: String,
}

fn default_page_param() -> String {
    DEFAULT_PAGE_PARAM.to_string()
}

fn default_current_page_header() -> String {
    CURRENT_PAGE_HEADER.to_string()
}

fn default_total_pages_header() -> String {
    TOTAL_PAGES_HEADER.to_string()
}

impl EndpointConfig {
    /// GET endpoint returning a bare list, with default headers
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            records: RecordShape::BareList,
            page_param: default_page_param(),
            current_page_header: default_current_page_header(),
            total_pages_header: default_total_pages_header(),
        }
    }

    /// POST endpoint returning a bare list, with default headers
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            ..Self::get(url)
        }
    }

    /// Set the record shape
    #[must_use]
    pub fn with_records(mut self, shape: RecordShape) -> Self {
        self.records = shape;
        self
    }

    /// Set the page parameter name
    #[must_use]
    pub fn with_page_param(mut self, name: impl Into<String>) -> Self {
        self.page_param = name.into();
        self
    }
}

/// Fetches a single page of a paginated query
///
/// Implementations must be shareable across concurrently running fetches.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page described by `query`
    ///
    /// Every error returned names the page it belongs to.
    async fn fetch_page(&self, query: &PageQuery, token: &AccessToken) -> Result<Page>;

    /// Name of the page parameter this fetcher expects
    fn page_param(&self) -> &str {
        DEFAULT_PAGE_PARAM
    }
}
