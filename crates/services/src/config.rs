use std::env;
use std::time::Duration;

use backend::HttpConfig;
use backend::http::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use quest_core::hints::HintPricing;
use quest_core::session::{DEFAULT_FEEDBACK_DELAY, DEFAULT_TIME_BUDGET_SECS, SessionConfig};

use crate::error::ConfigError;

pub const API_URL_VAR: &str = "QUEST_API_URL";
pub const TIME_BUDGET_VAR: &str = "QUEST_TIME_BUDGET_SECS";
pub const FEEDBACK_DELAY_VAR: &str = "QUEST_FEEDBACK_DELAY_MS";
pub const HTTP_TIMEOUT_VAR: &str = "QUEST_HTTP_TIMEOUT_SECS";

/// Runtime settings of the quest client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestConfig {
    pub api_url: String,
    pub time_budget_secs: u32,
    pub feedback_delay: Duration,
    pub http_timeout: Duration,
}

impl Default for QuestConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_BASE_URL.to_string(),
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            feedback_delay: DEFAULT_FEEDBACK_DELAY,
            http_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl QuestConfig {
    /// Read settings from the process environment; unset variables keep defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` for a numeric variable that is not
    /// a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`QuestConfig::from_env`] with an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` for malformed numbers.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let api_url = lookup(API_URL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_url);

        let time_budget_secs = match lookup(TIME_BUDGET_VAR) {
            Some(raw) => u32::try_from(parse_positive(TIME_BUDGET_VAR, &raw)?).map_err(|_| {
                ConfigError::InvalidNumber {
                    key: TIME_BUDGET_VAR,
                    value: raw,
                }
            })?,
            None => defaults.time_budget_secs,
        };
        let feedback_delay = lookup(FEEDBACK_DELAY_VAR)
            .map(|raw| parse_positive(FEEDBACK_DELAY_VAR, &raw).map(Duration::from_millis))
            .transpose()?
            .unwrap_or(defaults.feedback_delay);
        let http_timeout = lookup(HTTP_TIMEOUT_VAR)
            .map(|raw| parse_positive(HTTP_TIMEOUT_VAR, &raw).map(Duration::from_secs))
            .transpose()?
            .unwrap_or(defaults.http_timeout);

        Ok(Self {
            api_url,
            time_budget_secs,
            feedback_delay,
            http_timeout,
        })
    }

    #[must_use]
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Session` if the budget or delay is zero.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        Ok(SessionConfig::new(
            self.time_budget_secs,
            self.feedback_delay,
            HintPricing::default(),
        )?)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Backend` if the API URL is unusable.
    pub fn http_config(&self) -> Result<HttpConfig, ConfigError> {
        Ok(HttpConfig::new(&self.api_url, self.http_timeout)?)
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidNumber {
            key,
            value: raw.to_string(),
        }),
    }
}
