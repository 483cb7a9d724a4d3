use crate::analyzer::PageAnalyzer;
use anyhow::{Context, Result, anyhow};
use pagecheck_client::{
    ClientConfig, PageSpeedClient, ReqwestTransport, RetryPolicy, RetryProfile,
};
use pagecheck_store::{Cache, FavoritesStore, FileStorage, HistoryStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved runtime configuration (flag > environment > default)
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: ClientConfig,
    pub profile: RetryProfile,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn resolve(
        endpoint: Option<&str>,
        api_key: Option<String>,
        data_dir: Option<PathBuf>,
        profile: RetryProfile,
        budget_secs: Option<u64>,
    ) -> Result<Self> {
        let mut policy = profile.policy();
        if let Some(secs) = budget_secs {
            policy = policy.with_budget(Duration::from_secs(secs));
        }
        policy.validate()?;

        let client = ClientConfig::from_endpoint(endpoint)?
            .with_api_key(api_key)
            .with_policy(policy);

        let data_dir = match data_dir {
            Some(dir) => dir,
            None => FileStorage::default_root()
                .ok_or_else(|| anyhow!("Could not determine a data directory; pass --data-dir"))?,
        };

        Ok(Self {
            client,
            profile,
            data_dir,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.client.policy
    }

    /// Reports are cached apart from history and favorites
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn open_cache(&self) -> Result<Cache<FileStorage>> {
        Ok(Cache::new(open_storage(&self.cache_dir())?))
    }

    pub fn open_history(&self) -> Result<HistoryStore<FileStorage>> {
        Ok(HistoryStore::new(open_storage(&self.data_dir)?))
    }

    pub fn open_favorites(&self) -> Result<FavoritesStore<FileStorage>> {
        Ok(FavoritesStore::new(open_storage(&self.data_dir)?))
    }

    pub fn build_analyzer(&self) -> Result<PageAnalyzer<ReqwestTransport, FileStorage>> {
        let transport = ReqwestTransport::new()?;
        let client = PageSpeedClient::new(transport, self.client.clone())?;
        Ok(PageAnalyzer::new(
            client,
            self.open_cache()?,
            self.open_history()?,
        ))
    }

    /// Display form with the API key masked
    pub fn summary(&self) -> SettingsSummary {
        let policy = self.policy();
        SettingsSummary {
            endpoint: self.client.endpoint.to_string(),
            api_key: self.client.api_key.as_ref().map(|_| "********".to_string()),
            data_dir: self.data_dir.display().to_string(),
            profile: self.profile.as_str(),
            max_attempts: policy.max_attempts,
            attempt_timeouts_secs: (1..=policy.max_attempts)
                .map(|attempt| policy.attempt_timeout(attempt).as_secs_f64())
                .collect(),
            retry_delay_ms: policy.retry_delay.as_millis() as u64,
            budget_secs: policy.budget.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SettingsSummary {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub data_dir: String,
    pub profile: &'static str,
    pub max_attempts: u32,
    pub attempt_timeouts_secs: Vec<f64>,
    pub retry_delay_ms: u64,
    pub budget_secs: u64,
}

fn open_storage(dir: &Path) -> Result<FileStorage> {
    FileStorage::open(dir).with_context(|| format!("Failed to open data directory {}", dir.display()))
}
