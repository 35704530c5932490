//! Tests for pagination module

use super::*;
use crate::auth::AccessToken;
use crate::error::{Error, Result};
use crate::fetch::{Page, PageFetcher};
use crate::query::{PageQuery, QueryTemplate};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_case::test_case;

// ============================================================================
// Fake fetcher
// ============================================================================

/// Serves `sizes[i]` rows for page `i + 1`; row values encode their page
struct FakeFetcher {
    sizes: Vec<usize>,
    delays: HashMap<u32, Duration>,
    failing: HashSet<u32>,
    reported_total: Option<u32>,
    calls: Mutex<Vec<u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeFetcher {
    fn new(sizes: Vec<usize>) -> Self {
        Self {
            sizes,
            delays: HashMap::new(),
            failing: HashSet::new(),
            reported_total: None,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn delay(mut self, page: u32, millis: u64) -> Self {
        self.delays.insert(page, Duration::from_millis(millis));
        self
    }

    fn fail(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    /// Report `total` in the page headers regardless of `sizes`
    fn report_total(mut self, total: u32) -> Self {
        self.reported_total = Some(total);
        self
    }

    fn calls(&self) -> Vec<u32> {
        let mut calls = self.calls.lock().unwrap().clone();
        calls.sort_unstable();
        calls
    }
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn fetch_page(&self, query: &PageQuery, _token: &AccessToken) -> Result<Page> {
        let page = query.page();
        self.calls.lock().unwrap().push(page);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&page)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(&page) {
            return Err(Error::fetch(page, 500, "server error"));
        }

        let size = self.sizes.get((page - 1) as usize).copied().unwrap_or(1);
        let records = (0..size)
            .map(|i| json!({"page": page, "row": i, "prospectos": 1}))
            .collect();
        let total = self.reported_total.unwrap_or(self.sizes.len() as u32);
        Ok(Page::new(page, total, records))
    }
}

#[derive(Default)]
struct RecordingObserver {
    seen: Mutex<Vec<PageProgress>>,
}

impl PageObserver for RecordingObserver {
    fn on_page(&self, progress: &PageProgress) {
        self.seen.lock().unwrap().push(*progress);
    }
}

/// Collects formatted log output for one test
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route this thread's `tracing` events into `buffer` until the guard drops
fn capture_logs(buffer: &LogBuffer) -> tracing::subscriber::DefaultGuard {
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::set_default(subscriber)
}

fn token() -> AccessToken {
    AccessToken::new("tok")
}

fn template() -> QueryTemplate {
    QueryTemplate::new().date_range("20250601", "20250619")
}

fn row_pages(result: &ResultSet) -> Vec<u64> {
    result
        .rows()
        .map(|r| r["page"].as_u64().unwrap())
        .collect()
}

// ============================================================================
// PaginationOptions Tests
// ============================================================================

#[test]
fn test_options_default() {
    let options = PaginationOptions::default();
    assert_eq!(options.concurrency_limit, 5);
    assert_eq!(options.failure_policy, PageFailurePolicy::BestEffort);
}

#[test_case(0, 1; "zero is clamped")]
#[test_case(1, 1; "one")]
#[test_case(8, 8; "eight")]
fn test_effective_concurrency(limit: usize, expected: usize) {
    let options = PaginationOptions::new().with_concurrency(limit);
    assert_eq!(options.effective_concurrency(), expected);
}

#[test]
fn test_failure_policy_serde() {
    let policy: PageFailurePolicy = serde_yaml::from_str("fail_fast").unwrap();
    assert_eq!(policy, PageFailurePolicy::FailFast);
}

// ============================================================================
// ResultSet Tests
// ============================================================================

#[test]
fn test_result_set_orders_batches() {
    let result = ResultSet::new(
        vec![
            PageBatch {
                page: 3,
                records: vec![json!({"n": 3})],
            },
            PageBatch {
                page: 1,
                records: vec![json!({"n": 1}), json!({"n": 1})],
            },
        ],
        3,
        vec![2],
    );

    let pages: Vec<u32> = result.pages().iter().map(|b| b.page).collect();
    assert_eq!(pages, vec![1, 3]);
    assert_eq!(result.len(), 3);
    assert!(result.is_partial());
    assert_eq!(result.failed_pages(), &[2]);
    assert_eq!(
        result.into_rows(),
        vec![json!({"n": 1}), json!({"n": 1}), json!({"n": 3})]
    );
}

// ============================================================================
// fetch_all Tests
// ============================================================================

#[tokio::test]
async fn test_single_page_returns_immediately() {
    let fetcher = FakeFetcher::new(vec![3]);
    let result = fetch_all(&fetcher, &template(), &token(), &PaginationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.len(), 3);
    assert_eq!(result.total_pages(), 1);
    assert_eq!(fetcher.calls(), vec![1]);
}

#[tokio::test]
async fn test_pages_merge_in_ascending_order_despite_reverse_completion() {
    // Later pages finish first
    let fetcher = FakeFetcher::new(vec![2, 2, 2, 2])
        .delay(2, 60)
        .delay(3, 30)
        .delay(4, 1);

    let result = fetch_all(&fetcher, &template(), &token(), &PaginationOptions::default())
        .await
        .unwrap();

    assert_eq!(row_pages(&result), vec![1, 1, 2, 2, 3, 3, 4, 4]);
    let rows: Vec<u64> = result
        .rows()
        .map(|r| r["row"].as_u64().unwrap())
        .collect();
    assert_eq!(rows, vec![0, 1, 0, 1, 0, 1, 0, 1]);
}

#[tokio::test]
async fn test_len_is_sum_of_page_sizes() {
    let sizes = vec![5, 0, 7, 1, 3];
    let fetcher = FakeFetcher::new(sizes.clone());

    let result = fetch_all(&fetcher, &template(), &token(), &PaginationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.len(), sizes.iter().sum::<usize>());
    assert_eq!(result.pages().len(), 5);
    assert!(!result.is_partial());
}

#[tokio::test]
async fn test_first_page_failure_is_fatal() {
    let fetcher = FakeFetcher::new(vec![1, 1, 1]).fail(1);

    let err = fetch_all(&fetcher, &template(), &token(), &PaginationOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.page(), Some(1));
    assert_eq!(fetcher.calls(), vec![1]);
}

#[tokio::test]
async fn test_best_effort_drops_failed_page() {
    let logs = LogBuffer::default();
    let _guard = capture_logs(&logs);
    let fetcher = FakeFetcher::new(vec![2, 3, 4, 5]).fail(3);

    let result = fetch_all(&fetcher, &template(), &token(), &PaginationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.failed_pages(), &[3]);
    assert_eq!(result.len(), 2 + 3 + 5);
    assert!(!row_pages(&result).contains(&3));
    assert_eq!(fetcher.calls(), vec![1, 2, 3, 4]);

    let output = logs.contents();
    let dropped: Vec<&str> = output
        .lines()
        .filter(|line| line.contains("Dropping page"))
        .collect();
    assert_eq!(dropped.len(), 1, "{output}");
    assert!(dropped[0].contains("ERROR"), "{output}");
    assert!(dropped[0].contains("Dropping page 3"), "{output}");
}

#[tokio::test]
async fn test_best_effort_reports_failed_pages_in_order() {
    // Page 4 fails before page 2
    let fetcher = FakeFetcher::new(vec![1; 5])
        .fail(2)
        .fail(4)
        .delay(2, 40)
        .delay(4, 1);

    let result = fetch_all(&fetcher, &template(), &token(), &PaginationOptions::default())
        .await
        .unwrap();

    assert_eq!(result.failed_pages(), &[2, 4]);
    assert_eq!(row_pages(&result), vec![1, 3, 5]);
}

#[tokio::test]
async fn test_fail_fast_returns_first_error() {
    let fetcher = FakeFetcher::new(vec![1, 1, 1]).fail(2);
    let options = PaginationOptions::new().with_failure_policy(PageFailurePolicy::FailFast);

    let err = fetch_all(&fetcher, &template(), &token(), &options)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Fetch { page: 2, status: Some(500), .. }));
}

#[tokio::test]
async fn test_fail_fast_with_huge_page_count_stops_at_first_error() {
    // A bogus pages header must not turn into billions of queued requests
    let fetcher = FakeFetcher::new(vec![1])
        .report_total(4_000_000_000)
        .fail(2)
        .delay(2, 1)
        .delay(3, 50)
        .delay(4, 50)
        .delay(5, 50)
        .delay(6, 50);
    let options = PaginationOptions::new()
        .with_concurrency(5)
        .with_failure_policy(PageFailurePolicy::FailFast);

    let err = tokio::time::timeout(
        Duration::from_secs(5),
        fetch_all(&fetcher, &template(), &token(), &options),
    )
    .await
    .expect("fetch_all should stop at the first failed page")
    .unwrap_err();

    assert_eq!(err.page(), Some(2));
    assert_eq!(fetcher.calls(), vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_in_flight_never_exceeds_limit() {
    let fetcher = FakeFetcher::new(vec![1; 12]);
    let options = PaginationOptions::new().with_concurrency(3);

    let result = fetch_all(&fetcher, &template(), &token(), &options)
        .await
        .unwrap();

    assert_eq!(result.len(), 12);
    let max = fetcher.max_in_flight.load(Ordering::SeqCst);
    assert!(max <= 3, "max in flight was {max}");
    assert!(max >= 2, "pages never overlapped");
}

#[tokio::test]
async fn test_concurrency_of_one_is_sequential() {
    let fetcher = FakeFetcher::new(vec![1; 4]);
    let options = PaginationOptions::new().with_concurrency(0);

    fetch_all(&fetcher, &template(), &token(), &options)
        .await
        .unwrap();

    assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_observer_sees_every_successful_page() {
    let fetcher = FakeFetcher::new(vec![2, 1, 3]).fail(2);
    let observer = RecordingObserver::default();

    fetch_all_with_observer(
        &fetcher,
        &template(),
        &token(),
        &PaginationOptions::default(),
        &observer,
    )
    .await
    .unwrap();

    let mut seen = observer.seen.lock().unwrap().clone();
    seen.sort_by_key(|p| p.page);
    assert_eq!(
        seen,
        vec![
            PageProgress {
                page: 1,
                total_pages: 3,
                item_count: 2
            },
            PageProgress {
                page: 3,
                total_pages: 3,
                item_count: 3
            },
        ]
    );
}
