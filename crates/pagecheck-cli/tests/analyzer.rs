use async_trait::async_trait;
use chrono::DateTime;
use pagecheck_cli::{PageAnalyzer, Status};
use pagecheck_client::{
    ClientConfig, FetchError, PageSpeedClient, Transport, TransportError, TransportResponse,
};
use pagecheck_core::Strategy;
use pagecheck_store::{Cache, HistoryStore, ManualClock, MemoryStorage, Storage};
use pagecheck_store::{Error as StoreError, Result as StoreResult};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

enum Step {
    Respond(u16, String),
    Hang,
}

struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicU32,
}

impl ScriptedTransport {
    fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, _url: &Url, _timeout: Duration) -> Result<TransportResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Hang);
        match step {
            Step::Respond(status, body) => Ok(TransportResponse::new(status, body)),
            Step::Hang => std::future::pending().await,
        }
    }
}

fn fixture() -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join("pagespeed-mobile.json");
    std::fs::read_to_string(path).unwrap()
}

/// Every write fails as if the storage quota were exhausted
struct FullStorage;

impl Storage for FullStorage {
    fn get_item(&self, _key: &str) -> StoreResult<Option<String>> {
        Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(StoreError::Io(std::io::Error::other("storage quota exceeded")))
    }

    fn remove_item(&self, _key: &str) -> StoreResult<()> {
        Err(StoreError::Io(std::io::Error::other("storage quota exceeded")))
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }
}

struct Harness {
    transport: Arc<ScriptedTransport>,
    cache_storage: Arc<MemoryStorage>,
    history_storage: Arc<MemoryStorage>,
    clock: ManualClock,
    analyzer: PageAnalyzer<Arc<ScriptedTransport>, Arc<MemoryStorage>, ManualClock>,
}

fn harness(steps: Vec<Step>) -> Harness {
    let transport = ScriptedTransport::new(steps);
    let cache_storage = Arc::new(MemoryStorage::new());
    let history_storage = Arc::new(MemoryStorage::new());
    let clock = ManualClock::new(DateTime::from_timestamp_millis(1_714_557_600_000).unwrap());

    let config = ClientConfig::from_endpoint(None).unwrap();
    let client = PageSpeedClient::new(transport.clone(), config).unwrap();
    let analyzer = PageAnalyzer::new(
        client,
        Cache::with_clock(cache_storage.clone(), clock.clone()),
        HistoryStore::with_clock(history_storage.clone(), clock.clone()),
    );

    Harness {
        transport,
        cache_storage,
        history_storage,
        clock,
        analyzer,
    }
}

#[tokio::test(start_paused = true)]
async fn test_fresh_analysis_populates_state_cache_and_history() {
    let h = harness(vec![Step::Respond(200, fixture())]);
    assert_eq!(h.analyzer.status(), Status::Idle);

    let report = h
        .analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();

    let state = h.analyzer.state();
    assert_eq!(state.status(), Status::Result);
    assert!(!state.loading);
    assert!(!state.is_from_cache);
    assert_eq!(state.current_url, "https://example.com");
    assert_eq!(state.current_strategy, Strategy::Mobile);
    assert_eq!(state.results.as_ref(), Some(&report));

    assert_eq!(report.scores.performance, 95);
    assert_eq!(report.scores.accessibility, 80);
    assert_eq!(report.scores.seo, 100);
    assert_eq!(report.scores.best_practices, 70);
    assert_eq!(report.overall_score, 90);

    assert_eq!(
        h.cache_storage.keys().unwrap(),
        vec!["pagecheck-https://example.com_mobile"]
    );
    let entries = h.analyzer.history().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].overall_score, 90);
    assert_eq!(h.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_second_analysis_is_served_from_cache() {
    let h = harness(vec![Step::Respond(200, fixture())]);

    let first = h
        .analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();
    let second = h
        .analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert!(h.analyzer.state().is_from_cache);
    assert_eq!(h.transport.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_expired_cache_goes_back_upstream() {
    let h = harness(vec![
        Step::Respond(200, fixture()),
        Step::Respond(200, fixture()),
    ]);

    h.analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();
    h.clock.advance(chrono::Duration::minutes(31));
    h.analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();

    assert!(!h.analyzer.state().is_from_cache);
    assert_eq!(h.transport.calls(), 2);
    assert_eq!(h.analyzer.history().entries().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_strategies_are_cached_separately() {
    let h = harness(vec![
        Step::Respond(200, fixture()),
        Step::Respond(200, fixture()),
    ]);

    h.analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();
    h.analyzer
        .analyze("https://example.com", Strategy::Desktop)
        .await
        .unwrap();

    assert_eq!(h.transport.calls(), 2);
    assert_eq!(h.analyzer.cache().size(), 2);
    assert_eq!(h.analyzer.history().list_by_url("https://example.com").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_then_rate_limit_writes_nothing() {
    let h = harness(vec![
        Step::Hang,
        Step::Respond(429, r#"{"error": "Too many requests"}"#.to_string()),
    ]);

    let err = h
        .analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::UpstreamRateLimited { .. }));
    assert_eq!(h.transport.calls(), 2);

    let state = h.analyzer.state();
    assert_eq!(state.status(), Status::Error);
    assert!(!state.loading);
    let failure = state.error.unwrap();
    assert_eq!(failure.kind, "upstream_rate_limited");
    assert!(!failure.suggestions.is_empty());

    assert!(h.cache_storage.is_empty());
    assert!(h.history_storage.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_report_leaves_storage_untouched() {
    let h = harness(vec![Step::Respond(
        200,
        r#"{"lighthouseResult": {"audits": {}}}"#.to_string(),
    )]);

    let err = h
        .analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "transform_error");
    assert_eq!(h.analyzer.status(), Status::Error);
    assert!(h.cache_storage.is_empty());
    assert!(h.history_storage.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_invalid_url_never_reaches_network() {
    let h = harness(vec![]);

    let err = h
        .analyzer
        .analyze("not a url", Strategy::Mobile)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_input");
    assert_eq!(h.transport.calls(), 0);
    assert_eq!(h.analyzer.status(), Status::Error);
}

#[tokio::test(start_paused = true)]
async fn test_error_is_cleared_by_next_success() {
    let h = harness(vec![
        Step::Respond(500, "boom".to_string()),
        Step::Respond(200, fixture()),
    ]);

    assert!(h
        .analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .is_err());
    assert_eq!(h.analyzer.status(), Status::Error);

    h.analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();
    let state = h.analyzer.state();
    assert_eq!(state.status(), Status::Result);
    assert!(state.error.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_analysis_writes_nothing() {
    let h = harness(vec![Step::Hang, Step::Hang]);

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        h.analyzer.analyze("https://example.com", Strategy::Mobile),
    )
    .await;

    assert!(outcome.is_err());
    let state = h.analyzer.state();
    assert!(!state.loading);
    assert_eq!(state.status(), Status::Idle);
    assert!(h.cache_storage.is_empty());
    assert!(h.history_storage.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_subscribers_see_loading_then_result() {
    let h = harness(vec![Step::Hang, Step::Respond(200, fixture())]);
    let mut updates = h.analyzer.subscribe();

    let (result, seen) = tokio::join!(
        h.analyzer.analyze("https://example.com", Strategy::Desktop),
        async {
            updates.changed().await.unwrap();
            updates.borrow_and_update().clone()
        }
    );

    result.unwrap();
    assert!(seen.loading);
    assert_eq!(seen.current_strategy, Strategy::Desktop);
    assert_eq!(h.analyzer.status(), Status::Result);
}

#[tokio::test(start_paused = true)]
async fn test_reset_returns_to_idle() {
    let h = harness(vec![Step::Respond(200, fixture())]);
    h.analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();

    h.analyzer.reset();

    assert_eq!(h.analyzer.status(), Status::Idle);
    assert_eq!(h.analyzer.state().current_url, "");
}

#[tokio::test(start_paused = true)]
async fn test_storage_failures_do_not_reach_the_user() {
    let transport = ScriptedTransport::new(vec![
        Step::Respond(200, fixture()),
        Step::Respond(200, fixture()),
    ]);
    let config = ClientConfig::from_endpoint(None).unwrap();
    let client = PageSpeedClient::new(transport.clone(), config).unwrap();
    let analyzer = PageAnalyzer::new(
        client,
        Cache::new(Arc::new(FullStorage)),
        HistoryStore::new(Arc::new(FullStorage)),
    );

    let report = analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();

    let state = analyzer.state();
    assert_eq!(state.status(), Status::Result);
    assert!(state.error.is_none());
    assert!(!state.loading);
    assert_eq!(state.results.as_ref(), Some(&report));
    assert!(analyzer.history().entries().is_empty());

    // Nothing was cached, so the next run goes upstream again
    analyzer
        .analyze("https://example.com", Strategy::Mobile)
        .await
        .unwrap();
    assert!(!analyzer.state().is_from_cache);
    assert_eq!(transport.calls(), 2);
}
