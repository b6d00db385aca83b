use std::time::Duration;

use thiserror::Error;

use crate::hints::HintPricing;

/// Countdown budget of a session: ten minutes.
pub const DEFAULT_TIME_BUDGET_SECS: u32 = 600;

/// How long the correct/incorrect pulse stays up before the session advances.
pub const DEFAULT_FEEDBACK_DELAY: Duration = Duration::from_millis(2_000);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionConfigError {
    #[error("time budget must be > 0 seconds")]
    InvalidTimeBudget,

    #[error("feedback delay must be > 0")]
    InvalidFeedbackDelay,
}

/// Tunables of an assessment session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    time_budget_secs: u32,
    feedback_delay: Duration,
    hint_pricing: HintPricing,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            feedback_delay: DEFAULT_FEEDBACK_DELAY,
            hint_pricing: HintPricing::default(),
        }
    }
}

impl SessionConfig {
    /// # Errors
    ///
    /// Returns `SessionConfigError` if the budget or the feedback delay is zero.
    pub fn new(
        time_budget_secs: u32,
        feedback_delay: Duration,
        hint_pricing: HintPricing,
    ) -> Result<Self, SessionConfigError> {
        if time_budget_secs == 0 {
            return Err(SessionConfigError::InvalidTimeBudget);
        }
        if feedback_delay.is_zero() {
            return Err(SessionConfigError::InvalidFeedbackDelay);
        }
        Ok(Self {
            time_budget_secs,
            feedback_delay,
            hint_pricing,
        })
    }

    #[must_use]
    pub fn time_budget_secs(&self) -> u32 {
        self.time_budget_secs
    }

    #[must_use]
    pub fn feedback_delay(&self) -> Duration {
        self.feedback_delay
    }

    #[must_use]
    pub fn hint_pricing(&self) -> HintPricing {
        self.hint_pricing
    }
}
