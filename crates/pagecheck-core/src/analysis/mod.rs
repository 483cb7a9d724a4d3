mod categories;
mod vitals;

pub use categories::CategoryMembership;
pub use vitals::{
    CLS_CANDIDATES, INTERACTION_CANDIDATES, LCP_CANDIDATES, VitalCandidates, resolve_vital,
};

use crate::report::{
    Audit, CATEGORY_ORDER, CoreWebVitals, Improvement, NormalizedReport, RawCheck, RawReport,
};
use crate::request::AnalysisRequest;
use crate::score::{GOOD_THRESHOLD, Scores, overall_score, percent_from_fraction};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Reshapes a raw upstream report into the canonical `NormalizedReport`.
///
/// Pure: the same request and raw report always yield the same output. The
/// capture time comes from the raw report, never from the system clock.
#[derive(Debug, Clone)]
pub struct Normalizer {
    max_improvements: usize,
    improvement_threshold: f64,
    vitals: VitalCandidates,
}

impl Normalizer {
    pub fn new(max_improvements: usize) -> Self {
        Self {
            max_improvements,
            improvement_threshold: GOOD_THRESHOLD,
            vitals: VitalCandidates::default(),
        }
    }

    /// Replace the candidate check ids used for Core Web Vitals
    pub fn with_vitals(mut self, vitals: VitalCandidates) -> Self {
        self.vitals = vitals;
        self
    }

    pub fn normalize(&self, request: &AnalysisRequest, raw: &RawReport) -> Result<NormalizedReport> {
        tracing::debug!("Normalizing report for {} ({})", request.url(), request.strategy());

        let categories = raw
            .categories
            .as_ref()
            .ok_or_else(|| Error::Transform("report has no categories map".to_string()))?;
        let checks = raw
            .checks
            .as_ref()
            .ok_or_else(|| Error::Transform("report has no checks map".to_string()))?;

        for key in CATEGORY_ORDER {
            if !categories.contains_key(key) {
                tracing::debug!("Category '{}' missing from report, scoring it 0", key);
            }
        }

        let category_score =
            |key: &str| percent_from_fraction(categories.get(key).and_then(|c| c.score));
        let scores = Scores {
            performance: category_score("performance"),
            accessibility: category_score("accessibility"),
            seo: category_score("seo"),
            best_practices: category_score("best-practices"),
        };

        let core_web_vitals = CoreWebVitals {
            lcp: resolve_vital(checks, &self.vitals.lcp),
            fid: resolve_vital(checks, &self.vitals.fid),
            cls: resolve_vital(checks, &self.vitals.cls),
        };

        let membership = CategoryMembership::build(categories);
        let audits: Vec<Audit> = checks
            .iter()
            .map(|(id, check)| Audit {
                id: id.clone(),
                title: check.title.clone(),
                description: check.description.clone(),
                score: check.score,
                score_display_mode: check.score_display_mode.clone(),
                display_value: check.display_value.clone(),
                details: check.details.clone(),
                category: membership.category_of(id).to_string(),
            })
            .collect();

        let improvements = self.improvements(checks);

        let report = NormalizedReport {
            url: request.url().to_string(),
            strategy: request.strategy(),
            overall_score: overall_score(&scores),
            scores,
            core_web_vitals,
            improvements,
            audits,
            timestamp: raw.captured_at,
        };

        tracing::info!(
            "Normalized report for {}: overall={}, {} audits, {} improvements",
            report.url,
            report.overall_score,
            report.audits.len(),
            report.improvements.len()
        );

        Ok(report)
    }

    /// Scored checks below the threshold, worst first. Ties keep check id order.
    fn improvements(&self, checks: &BTreeMap<String, RawCheck>) -> Vec<Improvement> {
        let mut failing: Vec<(&String, &RawCheck, f64)> = checks
            .iter()
            .filter_map(|(id, check)| match check.score {
                Some(score) if score < self.improvement_threshold => Some((id, check, score)),
                _ => None,
            })
            .collect();

        failing.sort_by(|a, b| a.2.total_cmp(&b.2));
        failing.truncate(self.max_improvements);

        failing
            .into_iter()
            .map(|(id, check, score)| Improvement {
                id: id.clone(),
                title: check.title.clone(),
                description: check.description.clone(),
                score,
                display_value: check.display_value.clone(),
                details: check.details.clone(),
            })
            .collect()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(5)
    }
}
