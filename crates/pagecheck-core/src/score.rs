use serde::{Deserialize, Serialize};
use std::fmt;

/// Category weights used for the overall score: performance, accessibility, seo, best practices
pub const WEIGHTS: [u32; 4] = [4, 2, 2, 1];

/// Raw-score threshold at or above which a check counts as passing
pub const GOOD_THRESHOLD: f64 = 0.9;

/// Raw-score threshold at or above which a check needs improvement rather than being poor
pub const AVERAGE_THRESHOLD: f64 = 0.5;

/// The four category scores, each 0-100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scores {
    pub performance: u8,
    pub accessibility: u8,
    pub seo: u8,
    #[serde(rename = "bestPractices")]
    pub best_practices: u8,
}

impl Scores {
    /// Weighted overall score, `round((4p + 2a + 2s + b) / 9)`
    pub fn overall(&self) -> u8 {
        overall_score(self)
    }
}

/// Weighted overall score.
///
/// Integer arithmetic: a weighted sum divided by 9 never lands on exactly .5,
/// so adding 4 before the integer division rounds to nearest.
pub fn overall_score(scores: &Scores) -> u8 {
    let values = [
        scores.performance,
        scores.accessibility,
        scores.seo,
        scores.best_practices,
    ];
    let total_weight: u32 = WEIGHTS.iter().sum();
    let weighted: u32 = values
        .iter()
        .zip(WEIGHTS)
        .map(|(value, weight)| u32::from(*value) * weight)
        .sum();

    ((weighted + total_weight / 2) / total_weight) as u8
}

/// Convert a raw 0-1 score to a 0-100 integer. Missing or non-finite scores map to 0.
pub fn percent_from_fraction(score: Option<f64>) -> u8 {
    match score {
        Some(value) if value.is_finite() => (value * 100.0).round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

/// Three-tier severity used for coloring scores, vitals, and checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreLevel {
    Good,
    NeedsImprovement,
    Poor,
}

impl ScoreLevel {
    /// Classify an unrounded 0-1 score
    pub fn from_fraction(score: f64) -> Self {
        if score >= GOOD_THRESHOLD {
            ScoreLevel::Good
        } else if score >= AVERAGE_THRESHOLD {
            ScoreLevel::NeedsImprovement
        } else {
            ScoreLevel::Poor
        }
    }

    /// Classify a 0-100 percentage score
    pub fn from_percent(score: u8) -> Self {
        if score >= 90 {
            ScoreLevel::Good
        } else if score >= 50 {
            ScoreLevel::NeedsImprovement
        } else {
            ScoreLevel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreLevel::Good => "good",
            ScoreLevel::NeedsImprovement => "needs improvement",
            ScoreLevel::Poor => "poor",
        }
    }

    /// Hex color conventionally used for this level
    pub fn color(&self) -> &'static str {
        match self {
            ScoreLevel::Good => "#10B981",
            ScoreLevel::NeedsImprovement => "#F59E0B",
            ScoreLevel::Poor => "#EF4444",
        }
    }
}

impl fmt::Display for ScoreLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
