use crate::storage::Storage;
use crate::{Error, Result};
use chrono::DateTime;
use pagecheck_core::report::{CoreWebVitals, VitalMetric};
use pagecheck_core::{NormalizedReport, Scores, Strategy};

pub fn report(url: &str, strategy: Strategy, captured_ms: i64, performance: u8) -> NormalizedReport {
    let scores = Scores {
        performance,
        accessibility: 90,
        seo: 100,
        best_practices: 80,
    };
    NormalizedReport {
        url: url.to_string(),
        strategy,
        scores,
        overall_score: scores.overall(),
        core_web_vitals: CoreWebVitals {
            lcp: VitalMetric::missing(),
            fid: VitalMetric::missing(),
            cls: VitalMetric::missing(),
        },
        improvements: Vec::new(),
        audits: Vec::new(),
        timestamp: DateTime::from_timestamp_millis(captured_ms).unwrap(),
    }
}

/// Storage that rejects writes, and reads too unless built with `writes_only`
pub struct FailingStorage {
    fail_reads: bool,
}

impl FailingStorage {
    pub fn everything() -> Self {
        Self { fail_reads: true }
    }

    pub fn writes_only() -> Self {
        Self { fail_reads: false }
    }

    fn quota() -> Error {
        Error::Io(std::io::Error::other("storage quota exceeded"))
    }
}

impl Storage for FailingStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>> {
        if self.fail_reads { Err(Self::quota()) } else { Ok(None) }
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
        Err(Self::quota())
    }

    fn remove_item(&self, _key: &str) -> Result<()> {
        Err(Self::quota())
    }

    fn keys(&self) -> Result<Vec<String>> {
        if self.fail_reads { Err(Self::quota()) } else { Ok(Vec::new()) }
    }
}
