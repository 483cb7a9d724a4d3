use crate::request::{Strategy, cache_key};
use crate::score::{ScoreLevel, Scores};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category tag for checks that no category references
pub const OTHER_CATEGORY: &str = "other";

/// Fixed category keys in display order
pub const CATEGORY_ORDER: [&str; 4] = ["performance", "accessibility", "best-practices", "seo"];

/// Canonical report produced by the normalizer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReport {
    pub url: String,
    pub strategy: Strategy,
    pub scores: Scores,
    #[serde(rename = "overallScore")]
    pub overall_score: u8,
    #[serde(rename = "coreWebVitals")]
    pub core_web_vitals: CoreWebVitals,
    pub improvements: Vec<Improvement>,
    pub audits: Vec<Audit>,
    pub timestamp: DateTime<Utc>,
}

impl NormalizedReport {
    /// `<url>_<strategy>`, the key shared by cache and history
    pub fn identity_key(&self) -> String {
        cache_key(&self.url, self.strategy)
    }

    pub fn overall_level(&self) -> ScoreLevel {
        ScoreLevel::from_percent(self.overall_score)
    }

    pub fn audit(&self, id: &str) -> Option<&Audit> {
        self.audits.iter().find(|audit| audit.id == id)
    }

    /// Audits grouped by category tag: the four fixed categories first, then any
    /// other upstream categories alphabetically, then `other`. Empty groups are skipped.
    pub fn audits_by_category(&self) -> Vec<(&str, Vec<&Audit>)> {
        let mut extra: Vec<&str> = self
            .audits
            .iter()
            .map(|audit| audit.category.as_str())
            .filter(|category| !CATEGORY_ORDER.contains(category) && *category != OTHER_CATEGORY)
            .collect();
        extra.sort_unstable();
        extra.dedup();

        CATEGORY_ORDER
            .iter()
            .copied()
            .chain(extra)
            .chain(std::iter::once(OTHER_CATEGORY))
            .filter_map(|category| {
                let audits: Vec<&Audit> = self
                    .audits
                    .iter()
                    .filter(|audit| audit.category == category)
                    .collect();
                (!audits.is_empty()).then_some((category, audits))
            })
            .collect()
    }
}

/// A single Core Web Vital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VitalMetric {
    pub value: f64,
    #[serde(rename = "displayValue")]
    pub display_value: String,
    pub score: f64,
    /// Check id the metric was read from, if any candidate was present
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub source: Option<String>,
}

impl VitalMetric {
    pub fn missing() -> Self {
        Self {
            value: 0.0,
            display_value: "N/A".to_string(),
            score: 0.0,
            source: None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.source.is_none()
    }

    pub fn level(&self) -> ScoreLevel {
        ScoreLevel::from_fraction(self.score)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreWebVitals {
    pub lcp: VitalMetric,
    pub fid: VitalMetric,
    pub cls: VitalMetric,
}

/// A check scoring below the passing threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub id: String,
    pub title: String,
    pub description: String,
    pub score: f64,
    #[serde(rename = "displayValue", skip_serializing_if = "Option::is_none", default)]
    pub display_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<serde_json::Value>,
}

impl Improvement {
    pub fn level(&self) -> ScoreLevel {
        ScoreLevel::from_fraction(self.score)
    }
}

/// Every check from the upstream report, tagged with its owning category.
///
/// `score` is `None` when the check was not scored, which is distinct from a zero score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audit {
    pub id: String,
    pub title: String,
    pub description: String,
    pub score: Option<f64>,
    #[serde(rename = "scoreDisplayMode", skip_serializing_if = "Option::is_none", default)]
    pub score_display_mode: Option<String>,
    #[serde(rename = "displayValue", skip_serializing_if = "Option::is_none", default)]
    pub display_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<serde_json::Value>,
    pub category: String,
}

impl Audit {
    pub fn level(&self) -> Option<ScoreLevel> {
        self.score.map(ScoreLevel::from_fraction)
    }
}
