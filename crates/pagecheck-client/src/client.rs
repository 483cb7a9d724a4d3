use crate::error::{FetchError, Result, rate_limit_suggestions, timeout_suggestions};
use crate::policy::RetryPolicy;
use crate::transport::{Transport, TransportError, TransportResponse, redact_key};
use crate::upstream::{self, DEFAULT_ENDPOINT, UpstreamFailure};
use chrono::Utc;
use pagecheck_core::{AnalysisRequest, NormalizedReport, Normalizer, RawReport, Strategy};
use tokio::time::Instant;
use url::Url;

/// Where and how to reach the upstream analysis API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Url,
    pub api_key: Option<String>,
    pub policy: RetryPolicy,
}

impl ClientConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            api_key: None,
            policy: RetryPolicy::default(),
        }
    }

    /// Parse an endpoint string, falling back to the public API when `None`
    pub fn from_endpoint(endpoint: Option<&str>) -> Result<Self> {
        let raw = endpoint.unwrap_or(DEFAULT_ENDPOINT);
        let endpoint = Url::parse(raw)
            .map_err(|e| FetchError::InvalidInput(format!("Invalid endpoint '{}': {}", raw, e)))?;
        match endpoint.scheme() {
            "http" | "https" => Ok(Self::new(endpoint)),
            other => Err(FetchError::InvalidInput(format!(
                "Endpoint must use http or https, got '{}'",
                other
            ))),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.trim().is_empty());
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// Why an attempt did not produce a usable response
#[derive(Debug)]
enum AttemptFailure {
    TimedOut(Option<UpstreamFailure>),
    Unreachable(String),
}

/// Result of inspecting one completed HTTP exchange
enum Outcome {
    Report(NormalizedReport),
    Retry(AttemptFailure),
    Fail(FetchError),
}

/// Fetches and normalizes a report under a hard wall-clock budget.
///
/// Has no side effects beyond the network call: caching and history are
/// the caller's concern.
pub struct PageSpeedClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    normalizer: Normalizer,
}

impl<T: Transport> PageSpeedClient<T> {
    /// Create a client, rejecting retry plans that cannot fit their budget
    pub fn new(transport: T, config: ClientConfig) -> Result<Self> {
        config.policy.validate()?;
        Ok(Self {
            transport,
            config,
            normalizer: Normalizer::default(),
        })
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Validate, fetch with bounded retries, and normalize
    pub async fn fetch_report(&self, url: &str, strategy: Strategy) -> Result<NormalizedReport> {
        let request = AnalysisRequest::new(url, strategy)?;
        self.fetch(&request).await
    }

    pub async fn fetch(&self, request: &AnalysisRequest) -> Result<NormalizedReport> {
        let policy = &self.config.policy;
        let api_url =
            upstream::build_request_url(&self.config.endpoint, self.config.api_key.as_deref(), request);
        let started = Instant::now();
        let mut attempts_made = 0;
        let mut last_failure: Option<AttemptFailure> = None;

        tracing::info!(
            "Analyzing {} ({}) via {}",
            request.url(),
            request.strategy(),
            redact_key(&api_url)
        );

        for attempt in 1..=policy.max_attempts {
            let remaining = policy.budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                tracing::warn!("Budget exhausted before attempt {}", attempt);
                break;
            }

            let timeout = policy.attempt_timeout(attempt).min(remaining);
            attempts_made = attempt;
            tracing::info!(
                "Attempt {}/{} for {} - timeout {}ms ({}ms of budget left)",
                attempt,
                policy.max_attempts,
                request.url(),
                timeout.as_millis(),
                remaining.as_millis()
            );

            let outcome = tokio::time::timeout(timeout, self.transport.get(&api_url, timeout)).await;

            let failure = match outcome {
                Err(_) | Ok(Err(TransportError::Timeout)) => {
                    tracing::warn!("Attempt {} timed out after {}ms", attempt, timeout.as_millis());
                    AttemptFailure::TimedOut(None)
                }
                Ok(Err(TransportError::Connect(reason))) => {
                    tracing::warn!("Attempt {} failed: {}", attempt, reason);
                    AttemptFailure::Unreachable(reason)
                }
                Ok(Ok(response)) => match self.classify(request, response) {
                    Outcome::Report(report) => {
                        tracing::info!(
                            "Analysis of {} completed in {}ms",
                            request.url(),
                            started.elapsed().as_millis()
                        );
                        return Ok(report);
                    }
                    Outcome::Fail(err) => return Err(err),
                    Outcome::Retry(failure) => failure,
                },
            };
            last_failure = Some(failure);

            if attempt < policy.max_attempts {
                let remaining = policy.budget.saturating_sub(started.elapsed());
                if remaining <= policy.retry_delay {
                    tracing::warn!("Not enough budget left to retry");
                    break;
                }
                tracing::debug!("Retrying in {}ms", policy.retry_delay.as_millis());
                tokio::time::sleep(policy.retry_delay).await;
            }
        }

        Err(self.exhausted(attempts_made, last_failure))
    }

    /// Map a completed HTTP exchange to a report, a retryable failure, or a terminal error
    fn classify(&self, request: &AnalysisRequest, response: TransportResponse) -> Outcome {
        match response.status {
            200..=299 => match self.transform(request, &response.body) {
                Ok(report) => Outcome::Report(report),
                Err(err) => Outcome::Fail(err),
            },
            429 => {
                let failure = upstream::parse_failure(response.status, &response.body);
                tracing::warn!("Upstream rate limit hit: {}", failure.message);
                let mut suggestions = rate_limit_suggestions();
                suggestions.extend(failure.suggestions);
                Outcome::Fail(FetchError::UpstreamRateLimited {
                    message: failure.message,
                    suggestions,
                })
            }
            504 => {
                let failure = upstream::parse_failure(response.status, &response.body);
                tracing::warn!("Upstream gateway timeout: {}", failure.message);
                Outcome::Retry(AttemptFailure::TimedOut(Some(failure)))
            }
            status => {
                let failure = upstream::parse_failure(status, &response.body);
                tracing::error!("Upstream returned HTTP {}: {}", status, failure.message);
                Outcome::Fail(FetchError::UpstreamError {
                    status: Some(status),
                    message: failure.message,
                    body: failure.body,
                    suggestions: failure.suggestions,
                })
            }
        }
    }

    fn transform(&self, request: &AnalysisRequest, body: &str) -> Result<NormalizedReport> {
        RawReport::from_json(body, Utc::now())
            .and_then(|raw| self.normalizer.normalize(request, &raw))
            .map_err(|err| {
                tracing::error!(
                    "Upstream report for {} violates the expected shape: {}",
                    request.url(),
                    err
                );
                FetchError::TransformError(err.to_string())
            })
    }

    fn exhausted(&self, attempts: u32, failure: Option<AttemptFailure>) -> FetchError {
        let budget_secs = self.config.policy.budget.as_secs();
        match failure {
            Some(AttemptFailure::Unreachable(reason)) => {
                tracing::error!("All {} attempt(s) failed: {}", attempts, reason);
                FetchError::UpstreamError {
                    status: None,
                    message: reason,
                    body: String::new(),
                    suggestions: vec!["Check your network connection and the endpoint setting".to_string()],
                }
            }
            Some(AttemptFailure::TimedOut(upstream)) => {
                tracing::error!("Analysis timed out after {} attempt(s)", attempts);
                let mut suggestions = timeout_suggestions();
                if let Some(upstream) = upstream {
                    for suggestion in upstream.suggestions {
                        if !suggestions.contains(&suggestion) {
                            suggestions.push(suggestion);
                        }
                    }
                }
                FetchError::UpstreamTimeout {
                    attempts,
                    budget_secs,
                    suggestions,
                }
            }
            None => FetchError::UpstreamTimeout {
                attempts,
                budget_secs,
                suggestions: timeout_suggestions(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::RetryProfile;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    enum Step {
        Respond(u16, String),
        Fail(TransportError),
        Hang,
    }

    struct ScriptedTransport {
        steps: Mutex<VecDeque<Step>>,
        calls: AtomicU32,
    }

    impl ScriptedTransport {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, _url: &Url, _timeout: Duration) -> std::result::Result<TransportResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self.steps.lock().unwrap().pop_front().unwrap_or(Step::Hang);
            match step {
                Step::Respond(status, body) => Ok(TransportResponse::new(status, body)),
                Step::Fail(err) => Err(err),
                Step::Hang => std::future::pending().await,
            }
        }
    }

    fn fixture(name: &str) -> String {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .parent()
            .unwrap()
            .join("tests/fixtures")
            .join(name);
        std::fs::read_to_string(path).unwrap()
    }

    fn client(steps: Vec<Step>) -> PageSpeedClient<ScriptedTransport> {
        let config = ClientConfig::from_endpoint(None).unwrap();
        PageSpeedClient::new(ScriptedTransport::new(steps), config).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_returns_normalized_report() {
        let client = client(vec![Step::Respond(200, fixture("pagespeed-mobile.json"))]);

        let report = client
            .fetch_report("https://example.com", Strategy::Mobile)
            .await
            .unwrap();

        assert_eq!(report.url, "https://example.com");
        assert_eq!(report.overall_score, 90);
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_rate_limit_is_terminal() {
        let client = client(vec![
            Step::Hang,
            Step::Respond(429, r#"{"error": {"code": 429, "message": "Quota exceeded"}}"#.to_string()),
        ]);

        let err = client
            .fetch_report("https://example.com", Strategy::Mobile)
            .await
            .unwrap_err();

        match err {
            FetchError::UpstreamRateLimited { message, suggestions } => {
                assert_eq!(message, "Quota exceeded");
                assert!(!suggestions.is_empty());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.transport().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_time_out_within_budget() {
        let client = client(vec![Step::Hang, Step::Hang]);
        let started = Instant::now();

        let err = client
            .fetch_report("https://example.com", Strategy::Desktop)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            FetchError::UpstreamTimeout {
                attempts: 2,
                budget_secs: 110,
                suggestions: timeout_suggestions(),
            }
        );
        assert!(started.elapsed() <= Duration::from_secs(110));
        assert!(started.elapsed() >= Duration::from_secs(100));
        assert_eq!(client.transport().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_serverless_profile_stays_under_ceiling() {
        let config = ClientConfig::from_endpoint(None)
            .unwrap()
            .with_policy(RetryProfile::Serverless.policy());
        let client = PageSpeedClient::new(ScriptedTransport::new(vec![]), config).unwrap();
        let started = Instant::now();

        let err = client
            .fetch_report("https://example.com", Strategy::Mobile)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "upstream_timeout");
        assert!(started.elapsed() <= Duration::from_secs(26));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_timeout_is_retried() {
        let client = client(vec![
            Step::Respond(504, r#"{"error": "Gateway Timeout"}"#.to_string()),
            Step::Respond(200, fixture("pagespeed-mobile.json")),
        ]);

        let report = client
            .fetch_report("https://example.com", Strategy::Mobile)
            .await
            .unwrap();

        assert_eq!(report.scores.performance, 95);
        assert_eq!(client.transport().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gateway_timeout_suggestions_are_merged() {
        let client = client(vec![
            Step::Respond(504, r#"{"error": "Timed out", "suggestions": ["Try a lighter page"]}"#.to_string()),
            Step::Respond(504, r#"{"error": "Timed out", "suggestions": ["Try a lighter page"]}"#.to_string()),
        ]);

        let err = client
            .fetch_report("https://example.com", Strategy::Mobile)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "upstream_timeout");
        assert!(err.suggestions().contains(&"Try a lighter page".to_string()));
        assert_eq!(err.suggestions().len(), timeout_suggestions().len() + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_input_makes_no_request() {
        let client = client(vec![]);

        for bad in ["", "   ", "not a url", "ftp://example.com/file"] {
            let err = client.fetch_report(bad, Strategy::Mobile).await.unwrap_err();
            assert_eq!(err.kind(), "invalid_input", "input {:?}", bad);
        }
        assert_eq!(client.transport().calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_terminal() {
        let client = client(vec![Step::Respond(500, "Internal Server Error".to_string())]);

        let err = client
            .fetch_report("https://example.com", Strategy::Mobile)
            .await
            .unwrap_err();

        match err {
            FetchError::UpstreamError { status, message, body, .. } => {
                assert_eq!(status, Some(500));
                assert_eq!(message, "Internal Server Error");
                assert_eq!(body, "Internal Server Error");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_report_is_transform_error() {
        let client = client(vec![Step::Respond(200, r#"{"lighthouseResult": {}}"#.to_string())]);

        let err = client
            .fetch_report("https://example.com", Strategy::Mobile)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "transform_error");
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_upstream_after_retries() {
        let client = client(vec![
            Step::Fail(TransportError::Connect("connection refused".to_string())),
            Step::Fail(TransportError::Connect("connection refused".to_string())),
        ]);

        let err = client
            .fetch_report("https://example.com", Strategy::Mobile)
            .await
            .unwrap_err();

        match err {
            FetchError::UpstreamError { status, message, .. } => {
                assert_eq!(status, None);
                assert_eq!(message, "connection refused");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(client.transport().calls(), 2);
    }

    #[test]
    fn test_rejects_policy_over_budget() {
        let config = ClientConfig::from_endpoint(None)
            .unwrap()
            .with_policy(RetryPolicy::standard().with_budget(Duration::from_secs(30)));

        let result = PageSpeedClient::new(ScriptedTransport::new(vec![]), config);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_from_endpoint() {
        let config = ClientConfig::from_endpoint(Some("http://localhost:8888/api"))
            .unwrap()
            .with_api_key(Some("  ".to_string()));
        assert_eq!(config.endpoint.as_str(), "http://localhost:8888/api");
        assert_eq!(config.api_key, None);

        assert!(ClientConfig::from_endpoint(Some("not a url")).is_err());
        assert!(ClientConfig::from_endpoint(Some("ftp://example.com")).is_err());
    }
}
