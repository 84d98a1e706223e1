//! Tracing setup and per-round execution reports

use crate::config::{LogFormat, LoggingSettings};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Fails if a subscriber is already set.
pub fn init_tracing(settings: &LoggingSettings) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    let installed = match settings.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_span_events(FmtSpan::CLOSE))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init(),
    };
    installed.map_err(|e| Error::config(format!("tracing already initialized: {}", e)))?;

    tracing::info!(level = %settings.level, "Logging initialized");
    Ok(())
}

/// What happened during one round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round id
    pub round: String,
    /// Rows that passed the filter
    pub eligible_rows: usize,
    /// Agent calls dispatched (eligible rows times agents)
    pub dispatched: usize,
    /// Calls that produced conforming output
    pub succeeded: usize,
    /// Calls that ended in a sentinel
    pub degraded: usize,
    /// Cost incurred by the round
    pub cost: f64,
    /// Round start
    pub started_at: DateTime<Utc>,
    /// Round end
    pub finished_at: DateTime<Utc>,
}

impl RoundReport {
    pub(crate) fn begin(round: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            round: round.into(),
            eligible_rows: 0,
            dispatched: 0,
            succeeded: 0,
            degraded: 0,
            cost: 0.0,
            started_at: now,
            finished_at: now,
        }
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Wall-clock duration in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Whether no row was eligible
    pub fn is_empty(&self) -> bool {
        self.eligible_rows == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lifecycle() {
        let mut report = RoundReport::begin("A");
        assert!(report.is_empty());
        report.eligible_rows = 2;
        report.dispatched = 4;
        report.finish();
        assert!(report.finished_at >= report.started_at);
        assert!(report.duration_ms() >= 0);
        assert!(!report.is_empty());
    }
}
