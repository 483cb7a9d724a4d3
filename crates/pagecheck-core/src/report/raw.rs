use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The upstream report as received, reduced to the parts the normalizer reads.
///
/// `categories` and `checks` stay optional so that a payload missing either map
/// still parses and is rejected by the normalizer with a transform error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawReport {
    pub categories: Option<BTreeMap<String, RawCategory>>,
    pub checks: Option<BTreeMap<String, RawCheck>>,
    pub captured_at: DateTime<Utc>,
    pub final_url: Option<String>,
    pub lighthouse_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawCategory {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(rename = "auditRefs", default)]
    pub audit_refs: Vec<AuditRef>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AuditRef {
    pub id: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawCheck {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(rename = "scoreDisplayMode", default)]
    pub score_display_mode: Option<String>,
    #[serde(rename = "displayValue", default)]
    pub display_value: Option<String>,
    #[serde(rename = "numericValue", default)]
    pub numeric_value: Option<f64>,
    #[serde(rename = "numericUnit", default)]
    pub numeric_unit: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Upstream envelope around the report body
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "analysisUTCTimestamp", default)]
    analysis_utc_timestamp: Option<String>,
    #[serde(rename = "lighthouseResult", default)]
    lighthouse_result: Option<ReportBody>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportBody {
    #[serde(default)]
    categories: Option<BTreeMap<String, RawCategory>>,
    #[serde(default)]
    audits: Option<BTreeMap<String, RawCheck>>,
    #[serde(rename = "fetchTime", default)]
    fetch_time: Option<String>,
    #[serde(rename = "finalUrl", default)]
    final_url: Option<String>,
    #[serde(rename = "lighthouseVersion", default)]
    lighthouse_version: Option<String>,
}

impl RawReport {
    /// Parse an upstream response body.
    ///
    /// Accepts the full envelope (`{analysisUTCTimestamp, lighthouseResult: {...}}`)
    /// or a bare report body (`{categories, audits, fetchTime}`). The capture time is
    /// taken from `analysisUTCTimestamp`, then `fetchTime`, then `received_at`.
    pub fn from_json(body: &str, received_at: DateTime<Utc>) -> Result<Self> {
        tracing::debug!("Parsing upstream report ({} bytes)", body.len());

        let value: Value = serde_json::from_str(body)?;
        let Value::Object(object) = value else {
            return Err(Error::Transform(
                "Report body is not a JSON object".to_string(),
            ));
        };

        let (envelope_time, body) = if object.contains_key("lighthouseResult") {
            let envelope: Envelope = serde_json::from_value(Value::Object(object))?;
            (
                envelope.analysis_utc_timestamp,
                envelope.lighthouse_result.unwrap_or_default(),
            )
        } else {
            (None, serde_json::from_value(Value::Object(object))?)
        };

        let captured_at = [envelope_time.as_deref(), body.fetch_time.as_deref()]
            .into_iter()
            .flatten()
            .find_map(parse_timestamp)
            .unwrap_or(received_at);

        let report = RawReport {
            categories: body.categories,
            checks: body.audits,
            captured_at,
            final_url: body.final_url,
            lighthouse_version: body.lighthouse_version,
        };

        tracing::debug!(
            "Parsed upstream report with {} categories and {} checks",
            report.categories.as_ref().map_or(0, BTreeMap::len),
            report.check_count()
        );

        Ok(report)
    }

    pub fn check_count(&self) -> usize {
        self.checks.as_ref().map_or(0, BTreeMap::len)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|time| time.with_timezone(&Utc))
        .ok()
}
