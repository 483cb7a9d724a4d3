//! Analysis façade: cache lookup, bounded fetch, write-through, observable state.
//!
//! `PageAnalyzer` owns the single analysis state of a session and publishes
//! every change on a `watch` channel. Cache and history are only written
//! after a report was fetched and normalized successfully.

use pagecheck_client::{FetchError, PageSpeedClient, Result, Transport};
use pagecheck_core::{AnalysisRequest, NormalizedReport, Strategy};
use pagecheck_store::{Cache, Clock, HistoryStore, Storage, SystemClock};
use serde::Serialize;
use tokio::sync::watch;

/// User-facing failure carried by the state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisFailure {
    pub kind: &'static str,
    pub message: String,
    pub suggestions: Vec<String>,
}

impl From<&FetchError> for AnalysisFailure {
    fn from(err: &FetchError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
            suggestions: err.suggestions().to_vec(),
        }
    }
}

/// Snapshot of the façade for a presentation layer
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisState {
    pub loading: bool,
    pub error: Option<AnalysisFailure>,
    pub results: Option<NormalizedReport>,
    pub current_url: String,
    pub current_strategy: Strategy,
    pub is_from_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Loading,
    Result,
    Error,
}

impl AnalysisState {
    pub fn status(&self) -> Status {
        if self.loading {
            Status::Loading
        } else if self.error.is_some() {
            Status::Error
        } else if self.results.is_some() {
            Status::Result
        } else {
            Status::Idle
        }
    }
}

/// Clears the loading flag however `analyze` exits, including cancellation
struct LoadingGuard<'a>(&'a watch::Sender<AnalysisState>);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|state| state.loading = false);
    }
}

pub struct PageAnalyzer<T: Transport, S: Storage, C: Clock = SystemClock> {
    client: PageSpeedClient<T>,
    cache: Cache<S, C>,
    history: HistoryStore<S, C>,
    state: watch::Sender<AnalysisState>,
}

impl<T: Transport, S: Storage, C: Clock> PageAnalyzer<T, S, C> {
    pub fn new(client: PageSpeedClient<T>, cache: Cache<S, C>, history: HistoryStore<S, C>) -> Self {
        let (state, _) = watch::channel(AnalysisState::default());
        Self {
            client,
            cache,
            history,
            state,
        }
    }

    pub fn state(&self) -> AnalysisState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> Status {
        self.state.borrow().status()
    }

    /// Receive every state change from now on
    pub fn subscribe(&self) -> watch::Receiver<AnalysisState> {
        self.state.subscribe()
    }

    pub fn reset(&self) {
        self.state.send_replace(AnalysisState::default());
    }

    pub fn cache(&self) -> &Cache<S, C> {
        &self.cache
    }

    pub fn history(&self) -> &HistoryStore<S, C> {
        &self.history
    }

    /// Analyze a URL, serving from cache when a fresh entry exists.
    ///
    /// The outcome is both returned and published to the state.
    pub async fn analyze(&self, url: &str, strategy: Strategy) -> Result<NormalizedReport> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
            state.current_url = url.trim().to_string();
            state.current_strategy = strategy;
        });
        let _loading = LoadingGuard(&self.state);

        match self.run(url, strategy).await {
            Ok((report, from_cache)) => {
                self.state.send_modify(|state| {
                    state.results = Some(report.clone());
                    state.is_from_cache = from_cache;
                });
                Ok(report)
            }
            Err(err) => {
                tracing::debug!("Analysis failed: {}", err);
                self.state
                    .send_modify(|state| state.error = Some(AnalysisFailure::from(&err)));
                Err(err)
            }
        }
    }

    async fn run(&self, url: &str, strategy: Strategy) -> Result<(NormalizedReport, bool)> {
        let request = AnalysisRequest::new(url, strategy)?;
        let key = request.cache_key();

        if let Some(report) = self.cache.get::<NormalizedReport>(&key) {
            tracing::info!("Serving {} ({}) from cache", request.url(), strategy);
            return Ok((report, true));
        }

        let report = self.client.fetch(&request).await?;
        self.cache.put(&key, &report);
        self.history.append(&report);
        Ok((report, false))
    }
}
