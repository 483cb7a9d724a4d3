use crate::{FetchError, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound on attempts; more would not fit any realistic budget
pub const MAX_ATTEMPTS: u32 = 3;

/// Attempt and deadline plan for one report fetch.
///
/// Attempt `n` (1-based) waits at most `min(base_timeout + n * timeout_step, timeout_ceiling)`,
/// and every attempt plus the delays between them must fit inside `budget`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_timeout: Duration,
    pub timeout_step: Duration,
    pub timeout_ceiling: Duration,
    pub retry_delay: Duration,
    pub budget: Duration,
}

impl RetryPolicy {
    /// Tuned for function hosts with a ~26 second execution ceiling: 10s then 12s
    pub fn serverless() -> Self {
        Self {
            max_attempts: 2,
            base_timeout: Duration::from_secs(6),
            timeout_step: Duration::from_secs(4),
            timeout_ceiling: Duration::from_secs(12),
            retry_delay: Duration::from_millis(500),
            budget: Duration::from_secs(26),
        }
    }

    /// Interactive default: 40s then 60s inside a 110 second budget
    pub fn standard() -> Self {
        Self {
            max_attempts: 2,
            base_timeout: Duration::from_secs(20),
            timeout_step: Duration::from_secs(20),
            timeout_ceiling: Duration::from_secs(60),
            retry_delay: Duration::from_millis(500),
            budget: Duration::from_secs(110),
        }
    }

    /// Long-running hosts with a 9 minute ceiling: 90s, 150s, 210s
    pub fn extended() -> Self {
        Self {
            max_attempts: 3,
            base_timeout: Duration::from_secs(30),
            timeout_step: Duration::from_secs(60),
            timeout_ceiling: Duration::from_secs(210),
            retry_delay: Duration::from_secs(1),
            budget: Duration::from_secs(540),
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Timeout for a 1-based attempt number
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        self.base_timeout
            .saturating_add(self.timeout_step.saturating_mul(attempt))
            .min(self.timeout_ceiling)
    }

    /// Worst-case wall-clock time of the whole plan
    pub fn planned_duration(&self) -> Duration {
        let attempts: Duration = (1..=self.max_attempts)
            .map(|attempt| self.attempt_timeout(attempt))
            .sum();
        let delays = self
            .retry_delay
            .saturating_mul(self.max_attempts.saturating_sub(1));
        attempts.saturating_add(delays)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS {
            return Err(FetchError::InvalidInput(format!(
                "Retry policy must allow 1 to {} attempts, got {}",
                MAX_ATTEMPTS, self.max_attempts
            )));
        }

        if self.attempt_timeout(1).is_zero() {
            return Err(FetchError::InvalidInput(
                "Retry policy attempt timeout must be positive".to_string(),
            ));
        }

        if self.max_attempts > 1 && self.timeout_step.is_zero() {
            return Err(FetchError::InvalidInput(
                "Retry policy attempt timeouts must increase between attempts".to_string(),
            ));
        }

        for attempt in 2..=self.max_attempts {
            if self.attempt_timeout(attempt) <= self.attempt_timeout(attempt - 1) {
                return Err(FetchError::InvalidInput(format!(
                    "Retry policy ceiling of {:.1}s leaves attempt {} no more time than attempt {}",
                    self.timeout_ceiling.as_secs_f64(),
                    attempt,
                    attempt - 1
                )));
            }
        }

        let planned = self.planned_duration();
        if planned > self.budget {
            return Err(FetchError::InvalidInput(format!(
                "Retry plan needs {:.1}s but the budget is only {:.1}s",
                planned.as_secs_f64(),
                self.budget.as_secs_f64()
            )));
        }

        Ok(())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

/// Named retry presets, selected per deployment target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryProfile {
    Serverless,
    #[default]
    Standard,
    Extended,
}

impl RetryProfile {
    pub fn policy(&self) -> RetryPolicy {
        match self {
            RetryProfile::Serverless => RetryPolicy::serverless(),
            RetryProfile::Standard => RetryPolicy::standard(),
            RetryProfile::Extended => RetryPolicy::extended(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RetryProfile::Serverless => "serverless",
            RetryProfile::Standard => "standard",
            RetryProfile::Extended => "extended",
        }
    }
}

impl fmt::Display for RetryProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetryProfile {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "serverless" => Ok(RetryProfile::Serverless),
            "standard" => Ok(RetryProfile::Standard),
            "extended" => Ok(RetryProfile::Extended),
            other => Err(FetchError::InvalidInput(format!(
                "Unknown retry profile '{}'",
                other
            ))),
        }
    }
}
