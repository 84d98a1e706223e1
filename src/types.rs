//! Core type definitions shared across agents and workflows

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for one workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random run ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a run ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a row in a dataset. Stable for the lifetime of the dataset.
pub type RowIndex = usize;

/// Progress of a batch of evaluations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Round being executed, if the batch belongs to a workflow round
    pub round: Option<String>,
    /// Evaluations finished so far (succeeded or degraded)
    pub completed: usize,
    /// Evaluations dispatched in the batch
    pub total: usize,
}

impl Progress {
    /// Fraction of the batch that is finished, in `0.0..=1.0`
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// Accept a capability-reported cost only if it is finite and non-negative
pub(crate) fn checked_cost(cost: f64) -> Option<f64> {
    (cost.is_finite() && cost >= 0.0).then_some(cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio() {
        let p = Progress { round: None, completed: 1, total: 4 };
        assert!((p.ratio() - 0.25).abs() < f64::EPSILON);
        let empty = Progress { round: Some("A".into()), completed: 0, total: 0 };
        assert_eq!(empty.ratio(), 1.0);
    }

    #[test]
    fn test_checked_cost() {
        assert_eq!(checked_cost(0.5), Some(0.5));
        assert_eq!(checked_cost(0.0), Some(0.0));
        assert_eq!(checked_cost(-0.1), None);
        assert_eq!(checked_cost(f64::NAN), None);
    }
}
