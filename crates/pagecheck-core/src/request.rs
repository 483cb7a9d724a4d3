use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Device emulation mode used by the upstream analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "mobile" => Ok(Strategy::Mobile),
            "desktop" => Ok(Strategy::Desktop),
            other => Err(Error::InvalidInput(format!(
                "Strategy must be mobile or desktop, got '{}'",
                other
            ))),
        }
    }
}

/// A validated analysis target.
///
/// Identity for caching and history is the pair of the URL string as given
/// (trimmed) and the strategy; `target()` is the parsed form used on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    url: String,
    target: Url,
    strategy: Strategy,
}

impl AnalysisRequest {
    /// Validate `url` as an absolute http(s) URL with a host
    pub fn new(url: &str, strategy: Strategy) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::InvalidInput("URL parameter is required".to_string()));
        }

        let target = Url::parse(url)
            .map_err(|e| Error::InvalidInput(format!("Invalid URL format '{}': {}", url, e)))?;

        if target.scheme() != "http" && target.scheme() != "https" {
            return Err(Error::InvalidInput(format!(
                "Unsupported URL scheme '{}', expected http or https",
                target.scheme()
            )));
        }

        if target.host_str().is_none_or(str::is_empty) {
            return Err(Error::InvalidInput(format!("URL '{}' has no host", url)));
        }

        Ok(Self {
            url: url.to_string(),
            target,
            strategy,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Key shared by the cache and history: `<url>_<strategy>`
    pub fn cache_key(&self) -> String {
        cache_key(&self.url, self.strategy)
    }
}

/// Build the `<url>_<strategy>` identity key without validating the URL
pub fn cache_key(url: &str, strategy: Strategy) -> String {
    format!("{}_{}", url.trim(), strategy)
}
