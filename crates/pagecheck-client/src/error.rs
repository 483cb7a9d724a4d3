use thiserror::Error;

/// Longest upstream body kept on an error for display
pub const MAX_BODY_DISPLAY: usize = 512;

/// Remediation steps offered when the analysis runs out of time
pub fn timeout_suggestions() -> Vec<String> {
    [
        "Retry the analysis in a moment; the upstream service may be busy",
        "Analyze a specific sub-page instead of the home page",
        "Try the mobile-site variant of the URL (e.g. m.example.com)",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Remediation steps offered when the upstream quota is exhausted
pub fn rate_limit_suggestions() -> Vec<String> {
    [
        "Wait a minute before retrying",
        "Configure your own API key with --api-key or PAGECHECK_API_KEY",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Terminal outcome of a report fetch
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream rate limit exceeded: {message}")]
    UpstreamRateLimited {
        message: String,
        suggestions: Vec<String>,
    },

    #[error("Analysis did not finish after {attempts} attempt(s) within {budget_secs}s")]
    UpstreamTimeout {
        attempts: u32,
        budget_secs: u64,
        suggestions: Vec<String>,
    },

    #[error("{}", upstream_display(.status, .message))]
    UpstreamError {
        status: Option<u16>,
        message: String,
        body: String,
        suggestions: Vec<String>,
    },

    #[error("Malformed analysis report: {0}")]
    TransformError(String),
}

fn upstream_display(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("Upstream returned HTTP {}: {}", status, message),
        None => format!("Upstream unreachable: {}", message),
    }
}

impl FetchError {
    /// Short, user-facing description of the failure
    pub fn user_message(&self) -> String {
        match self {
            FetchError::InvalidInput(reason) => reason.clone(),
            FetchError::UpstreamRateLimited { .. } => {
                "The analysis service request limit was exceeded. Please try again shortly."
                    .to_string()
            }
            FetchError::UpstreamTimeout { budget_secs, .. } => format!(
                "The analysis did not complete within {} seconds. The site may be complex or the service busy.",
                budget_secs
            ),
            FetchError::UpstreamError { .. } => self.to_string(),
            FetchError::TransformError(_) => {
                "The analysis service returned an unexpected report format.".to_string()
            }
        }
    }

    /// Concrete next steps for the user; empty when there is nothing to suggest
    pub fn suggestions(&self) -> &[String] {
        match self {
            FetchError::UpstreamRateLimited { suggestions, .. }
            | FetchError::UpstreamTimeout { suggestions, .. }
            | FetchError::UpstreamError { suggestions, .. } => suggestions,
            FetchError::InvalidInput(_) | FetchError::TransformError(_) => &[],
        }
    }

    /// Stable machine-readable kind name
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidInput(_) => "invalid_input",
            FetchError::UpstreamRateLimited { .. } => "upstream_rate_limited",
            FetchError::UpstreamTimeout { .. } => "upstream_timeout",
            FetchError::UpstreamError { .. } => "upstream_error",
            FetchError::TransformError(_) => "transform_error",
        }
    }
}

impl From<pagecheck_core::Error> for FetchError {
    fn from(err: pagecheck_core::Error) -> Self {
        match err {
            pagecheck_core::Error::InvalidInput(reason) => FetchError::InvalidInput(reason),
            other => FetchError::TransformError(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
