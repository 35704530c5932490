//! Pagination coordinator
//!
//! Page 1 is fetched alone to learn the page count. Pages 2..=N then stream
//! through `buffer_unordered`, which keeps at most `concurrency_limit`
//! requests in flight and only builds a page's request when a slot frees up.
//! Batches are merged by requested page number, so completion order never
//! affects row order.

use super::types::{
    PageBatch, PageFailurePolicy, PageObserver, PageProgress, PaginationOptions, ResultSet,
    TracingObserver,
};
use crate::auth::AccessToken;
use crate::error::{Error, Result};
use crate::fetch::{Page, PageFetcher};
use crate::query::QueryTemplate;
use futures::stream::{self, StreamExt, TryStreamExt};
use futures::FutureExt;
use tracing::{debug, error, info};

/// Fetch every page of a query, logging progress with `tracing`
pub async fn fetch_all(
    fetcher: &dyn PageFetcher,
    template: &QueryTemplate,
    token: &AccessToken,
    options: &PaginationOptions,
) -> Result<ResultSet> {
    fetch_all_with_observer(fetcher, template, token, options, &TracingObserver).await
}

/// Fetch every page of a query, reporting progress to `observer`
pub async fn fetch_all_with_observer(
    fetcher: &dyn PageFetcher,
    template: &QueryTemplate,
    token: &AccessToken,
    options: &PaginationOptions,
    observer: &dyn PageObserver,
) -> Result<ResultSet> {
    let page_param = fetcher.page_param();

    let first = fetcher
        .fetch_page(&template.with_page_param(page_param, 1), token)
        .await
        .map_err(|e| e.for_page(1))?;
    check_current_page(&first);

    let total_pages = first.total_pages.max(1);
    observer.on_page(&PageProgress {
        page: 1,
        total_pages,
        item_count: first.len(),
    });

    let mut batches = vec![PageBatch {
        page: 1,
        records: first.records,
    }];

    if total_pages == 1 {
        return Ok(ResultSet::new(batches, total_pages, Vec::new()));
    }

    let limit = options.effective_concurrency();
    debug!(
        "Fetching pages 2..={} with up to {} in flight",
        total_pages, limit
    );

    let fetch_one = |page: u32| {
        let query = template.with_page_param(page_param, page);
        async move {
            let fetched = fetcher
                .fetch_page(&query, token)
                .await
                .map_err(|e| e.for_page(page))?;
            check_current_page(&fetched);

            observer.on_page(&PageProgress {
                page,
                total_pages,
                item_count: fetched.len(),
            });

            Ok::<_, Error>(PageBatch {
                page,
                records: fetched.records,
            })
        }
    };

    let mut failed_pages = Vec::new();

    match options.failure_policy {
        PageFailurePolicy::FailFast => {
            // Stops polling, and so stops issuing requests, at the first error
            let fetched: Vec<PageBatch> = stream::iter(2..=total_pages)
                .map(fetch_one)
                .buffer_unordered(limit)
                .try_collect()
                .await?;
            batches.extend(fetched);
        }
        PageFailurePolicy::BestEffort => {
            let mut results = stream::iter(2..=total_pages)
                .map(|page| fetch_one(page).map(move |result| (page, result)))
                .buffer_unordered(limit);
            while let Some((page, result)) = results.next().await {
                match result {
                    Ok(batch) => batches.push(batch),
                    Err(e) => {
                        error!("Dropping page {}: {}", page, e);
                        failed_pages.push(page);
                    }
                }
            }
            failed_pages.sort_unstable();
        }
    }

    let result = ResultSet::new(batches, total_pages, failed_pages);
    info!(
        "Fetched {} rows from {} of {} pages",
        result.len(),
        result.pages().len(),
        total_pages
    );
    Ok(result)
}

fn check_current_page(page: &Page) {
    if page.current_page != page.requested_page {
        debug!(
            "Server reported page {} for requested page {}",
            page.current_page, page.requested_page
        );
    }
}
