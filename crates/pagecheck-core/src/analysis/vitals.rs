use crate::report::{RawCheck, VitalMetric};
use std::collections::BTreeMap;

/// Check ids for the load-speed vital, most preferred first
pub const LCP_CANDIDATES: &[&str] = &["largest-contentful-paint"];

/// Check ids for the interaction-responsiveness vital, most preferred first.
/// Newer reports carry the successor metric; lab runs usually only report the
/// max potential input delay, and very old ones only total blocking time.
pub const INTERACTION_CANDIDATES: &[&str] = &[
    "interaction-to-next-paint",
    "experimental-interaction-to-next-paint",
    "max-potential-fid",
    "total-blocking-time",
];

/// Check ids for the visual-stability vital, most preferred first
pub const CLS_CANDIDATES: &[&str] = &["cumulative-layout-shift"];

/// Ordered candidate ids for each Core Web Vital
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VitalCandidates {
    pub lcp: Vec<String>,
    pub fid: Vec<String>,
    pub cls: Vec<String>,
}

impl Default for VitalCandidates {
    fn default() -> Self {
        Self {
            lcp: to_owned(LCP_CANDIDATES),
            fid: to_owned(INTERACTION_CANDIDATES),
            cls: to_owned(CLS_CANDIDATES),
        }
    }
}

fn to_owned(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

/// Read a vital from the first candidate check present in the report
pub fn resolve_vital(checks: &BTreeMap<String, RawCheck>, candidates: &[String]) -> VitalMetric {
    let Some((id, check)) = candidates
        .iter()
        .find_map(|id| checks.get(id).map(|check| (id, check)))
    else {
        tracing::debug!("No vital check found among {:?}", candidates);
        return VitalMetric::missing();
    };

    VitalMetric {
        value: check.numeric_value.filter(|v| v.is_finite()).unwrap_or(0.0),
        display_value: check
            .display_value
            .clone()
            .filter(|display| !display.is_empty())
            .unwrap_or_else(|| "N/A".to_string()),
        score: check.score.filter(|s| s.is_finite()).unwrap_or(0.0),
        source: Some(id.clone()),
    }
}
