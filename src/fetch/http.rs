//! HTTP page fetcher

use super::types::{EndpointConfig, Page, PageFetcher};
use crate::auth::AccessToken;
use crate::decode::{JsonDecoder, RecordDecoder};
use crate::error::Result;
use crate::http::{HttpClient, RequestConfig};
use crate::query::PageQuery;
use crate::types::Method;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::debug;

/// Fetches pages from a data endpoint over HTTP
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: HttpClient,
    endpoint: EndpointConfig,
    decoder: JsonDecoder,
}

impl HttpPageFetcher {
    /// Create a fetcher for an endpoint whose URL is already rendered
    pub fn new(client: HttpClient, endpoint: EndpointConfig) -> Self {
        let decoder = JsonDecoder::with_shape(endpoint.records.clone());
        Self {
            client,
            endpoint,
            decoder,
        }
    }

    /// Get the endpoint configuration
    pub fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    async fn fetch(&self, query: &PageQuery, token: &AccessToken) -> Result<Page> {
        let page = query.page();
        let mut request = RequestConfig::new().bearer(token.to_bearer());

        request = match self.endpoint.method {
            Method::GET => query
                .to_query_pairs()
                .into_iter()
                .fold(request, |req, (key, value)| req.query(key, value)),
            Method::POST => request.json(query.to_json_body()),
        };

        debug!(
            "Fetching page {} ({:?} {})",
            page, self.endpoint.method, self.endpoint.url
        );

        let response = self
            .client
            .request(self.endpoint.method.into(), &self.endpoint.url, request)
            .await?;

        let current_page = header_number(response.headers(), &self.endpoint.current_page_header);
        let total_pages = header_number(response.headers(), &self.endpoint.total_pages_header);

        let body = response.text().await?;
        let records = self.decoder.decode(&body)?;

        Ok(Page {
            requested_page: page,
            current_page,
            total_pages,
            records,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, query: &PageQuery, token: &AccessToken) -> Result<Page> {
        self.fetch(query, token)
            .await
            .map_err(|e| e.for_page(query.page()))
    }

    fn page_param(&self) -> &str {
        &self.endpoint.page_param
    }
}

/// Read a page number header; absent or unparsable values count as 1
fn header_number(headers: &HeaderMap, name: &str) -> u32 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(1)
}

