//! Page fetch module
//!
//! One authenticated request per page. Page metadata comes from response
//! headers; missing headers are treated as a single-page response.

mod http;
mod types;

pub use http::HttpPageFetcher;
pub use types::{
    EndpointConfig, Page, PageFetcher, CURRENT_PAGE_HEADER, TOTAL_PAGES_HEADER,
};
