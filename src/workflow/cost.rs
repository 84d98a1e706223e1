//! Cost bookkeeping for one run

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Costs accumulated during one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    /// Cost per agent name
    pub per_agent: BTreeMap<String, f64>,
    /// Cost per round id
    pub per_round: BTreeMap<String, f64>,
    /// Grand total
    pub total: f64,
}

impl CostSummary {
    /// Add one call's cost. Negative or non-finite amounts are ignored.
    pub fn record(&mut self, round: &str, agent: &str, cost: f64) {
        if !cost.is_finite() || cost < 0.0 {
            tracing::warn!(round, agent, cost, "ignoring invalid cost");
            return;
        }
        *self.per_agent.entry(agent.to_string()).or_default() += cost;
        *self.per_round.entry(round.to_string()).or_default() += cost;
        self.total += cost;
    }

    /// Cost charged to an agent
    pub fn agent(&self, agent: &str) -> f64 {
        self.per_agent.get(agent).copied().unwrap_or_default()
    }

    /// Cost of a round
    pub fn round(&self, round: &str) -> f64 {
        self.per_round.get(round).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_all_views() {
        let mut costs = CostSummary::default();
        costs.record("A", "X", 0.5);
        costs.record("A", "Y", 0.25);
        costs.record("B", "X", 1.0);
        costs.record("B", "X", f64::NAN);
        costs.record("B", "X", -1.0);

        assert!((costs.total - 1.75).abs() < 1e-9);
        assert!((costs.agent("X") - 1.5).abs() < 1e-9);
        assert!((costs.round("A") - 0.75).abs() < 1e-9);
        assert_eq!(costs.agent("Z"), 0.0);
    }
}
