//! Configuration types for review agents and logging

use crate::error::{Error, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry behaviour of an agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `retry_limit + 1` attempts in total
    pub retry_limit: u32,
    /// Delay before the first retry, in milliseconds
    pub base_delay_ms: u64,
    /// Upper bound of the delay between attempts, in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_limit: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given retry budget and default delays
    pub fn new(retry_limit: u32) -> Self {
        Self {
            retry_limit,
            ..Self::default()
        }
    }

    /// Retry without sleeping between attempts
    pub fn immediate(retry_limit: u32) -> Self {
        Self {
            retry_limit,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Set the delays
    pub fn with_delays(mut self, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Delay before retry number `retry` (1-based), doubling each time
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64
            .checked_shl(retry.saturating_sub(1))
            .unwrap_or(u64::MAX);
        let delay = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Defaults applied to agents that do not override them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDefaults {
    /// Maximum in-flight evaluations per agent
    pub concurrency_limit: usize,
    /// Retry policy
    pub retry: RetryPolicy,
    /// Per-attempt timeout in seconds; `None` disables it
    pub timeout_secs: Option<u64>,
    /// Number of interactions kept in an agent's log
    pub log_capacity: usize,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            concurrency_limit: 20,
            retry: RetryPolicy::default(),
            timeout_secs: Some(120),
            log_capacity: 1_000,
        }
    }
}

impl AgentDefaults {
    /// Per-attempt timeout
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSettings {
    /// Agent defaults
    pub agents: AgentDefaults,
    /// Logging
    pub logging: LoggingSettings,
}

impl ReviewSettings {
    /// Load settings from `config/default`, `config/local` and `REVIEW__*` variables
    pub fn load() -> Result<Self> {
        // Load .env if present so local overrides reach the environment source
        let _ = dotenv();
        Self::load_from(["config/default", "config/local"])
    }

    /// Load settings from the given optional files (extension inferred) and the environment
    pub fn load_from<I, S>(files: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = config::Config::builder();
        for file in files {
            builder = builder.add_source(config::File::with_name(file.as_ref()).required(false));
        }
        let settings: Self = builder
            .add_source(
                config::Environment::with_prefix("REVIEW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings that cannot drive an agent
    pub fn validate(&self) -> Result<()> {
        if self.agents.concurrency_limit == 0 {
            return Err(Error::config("agents.concurrency_limit must be at least 1"));
        }
        if self.agents.log_capacity == 0 {
            return Err(Error::config("agents.log_capacity must be at least 1"));
        }
        if self.agents.retry.base_delay_ms > self.agents.retry.max_delay_ms {
            return Err(Error::config(
                "agents.retry.base_delay_ms must not exceed max_delay_ms",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(5).with_delays(100, 350);
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(350));
        assert_eq!(policy.delay_for(70), Duration::from_millis(350));
        assert_eq!(RetryPolicy::immediate(2).delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new()
            .prefix("review-settings")
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "agents:\n  concurrency_limit: 4\n  retry:\n    retry_limit: 1\n    base_delay_ms: 10\n    max_delay_ms: 20\nlogging:\n  format: json"
        )
        .unwrap();
        let path = file.path().with_extension("");
        let path = path.to_str().unwrap();

        let settings = ReviewSettings::load_from([path]).unwrap();
        assert_eq!(settings.agents.concurrency_limit, 4);
        assert_eq!(settings.agents.retry.retry_limit, 1);
        assert_eq!(settings.agents.log_capacity, 1_000);
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let settings = ReviewSettings::load_from(["does/not/exist"]).unwrap();
        assert_eq!(settings.agents, AgentDefaults::default());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut settings = ReviewSettings::default();
        settings.agents.concurrency_limit = 0;
        assert!(settings.validate().is_err());
    }
}
