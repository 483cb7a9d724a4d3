use crate::error::MAX_BODY_DISPLAY;
use pagecheck_core::AnalysisRequest;
use pagecheck_core::format::truncate_text;
use pagecheck_core::report::CATEGORY_ORDER;
use serde::Deserialize;
use url::Url;

/// Public PageSpeed Insights v5 endpoint
pub const DEFAULT_ENDPOINT: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Build the upstream GET URL for a request
pub fn build_request_url(endpoint: &Url, api_key: Option<&str>, request: &AnalysisRequest) -> Url {
    let mut url = endpoint.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("url", request.url())
            .append_pair("strategy", request.strategy().as_str());
        for category in CATEGORY_ORDER {
            query.append_pair("category", category);
        }
        query.append_pair("locale", "en");
        if let Some(key) = api_key.filter(|key| !key.is_empty()) {
            query.append_pair("key", key);
        }
    }
    url
}

/// What could be recovered from a non-2xx body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamFailure {
    pub message: String,
    pub suggestions: Vec<String>,
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    suggestions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Api {
        #[serde(default)]
        message: Option<String>,
    },
}

/// Best-effort parse of an error body.
///
/// Understands the proxy form `{error, details?, suggestions?}` and the upstream
/// API form `{error: {code, message}}`; anything else is carried as raw text.
pub fn parse_failure(status: u16, body: &str) -> UpstreamFailure {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();

    let message = parsed
        .as_ref()
        .and_then(|parsed| {
            let from_error = match &parsed.error {
                Some(ErrorField::Text(text)) => Some(text.clone()),
                Some(ErrorField::Api { message }) => message.clone(),
                None => None,
            };
            from_error
                .or_else(|| parsed.message.clone())
                .or_else(|| parsed.details.clone())
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status)
            } else {
                truncate_text(trimmed, 200)
            }
        });

    let suggestions = parsed
        .and_then(|parsed| parsed.suggestions)
        .unwrap_or_default();

    UpstreamFailure {
        message,
        suggestions,
        body: truncate_text(body, MAX_BODY_DISPLAY),
    }
}
