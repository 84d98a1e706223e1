//! Workflow schema and its up-front validation

use super::columns::{agent_columns, derived_round, is_valid_round_id};
use super::round::RoundSpec;
use crate::error::{Error, Result};
use std::collections::{HashMap, HashSet};

/// Ordered rounds. Order is execution order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowSchema {
    rounds: Vec<RoundSpec>,
}

impl WorkflowSchema {
    /// Validate and wrap a list of rounds
    pub fn new(rounds: Vec<RoundSpec>) -> Result<Self> {
        let schema = Self { rounds };
        schema.validate()?;
        Ok(schema)
    }

    /// Rounds in execution order
    pub fn rounds(&self) -> &[RoundSpec] {
        &self.rounds
    }

    /// Look up a round by id
    pub fn round(&self, id: &str) -> Option<&RoundSpec> {
        self.rounds.iter().find(|r| r.id == id)
    }

    /// Position of a round
    pub fn position(&self, id: &str) -> Option<usize> {
        self.rounds.iter().position(|r| r.id == id)
    }

    /// Whether `column` is written by a round that runs before `position`
    pub fn produced_before(&self, column: &str, position: usize) -> bool {
        let Some(round_id) = derived_round(column) else {
            return false;
        };
        match self.position(round_id) {
            Some(pos) if pos < position => self.rounds[pos]
                .agents
                .iter()
                .any(|agent| agent_columns(round_id, agent).iter().any(|c| c == column)),
            _ => false,
        }
    }

    /// Check everything that can be checked without data.
    ///
    /// A derived-looking column that names an unknown round is treated as an
    /// original column and left to the runtime dataset check.
    pub fn validate(&self) -> Result<()> {
        if self.rounds.is_empty() {
            return Err(Error::schema("workflow has no rounds"));
        }

        let positions: HashMap<&str, usize> = self
            .rounds
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.as_str(), i))
            .collect();

        let mut seen = HashSet::new();
        for (position, round) in self.rounds.iter().enumerate() {
            if !is_valid_round_id(&round.id) {
                return Err(Error::schema(format!(
                    "round id '{}' must be non-empty and use only letters, digits and '-'",
                    round.id
                )));
            }
            if !seen.insert(round.id.as_str()) {
                return Err(Error::schema(format!("duplicate round id '{}'", round.id)));
            }
            if round.agents.is_empty() {
                return Err(Error::schema(format!("round '{}' has no agents", round.id)));
            }

            let mut names = HashSet::new();
            for agent in &round.agents {
                if !names.insert(agent.name.as_str()) {
                    return Err(Error::schema(format!(
                        "round '{}' lists agent '{}' twice",
                        round.id, agent.name
                    )));
                }
            }

            if round.inputs.is_empty() && round.image_inputs.is_empty() {
                return Err(Error::schema(format!(
                    "round '{}' declares no input columns",
                    round.id
                )));
            }

            for column in round.referenced_columns() {
                let Some(source) = derived_round(&column) else {
                    continue;
                };
                match positions.get(source) {
                    Some(&pos) if pos >= position => {
                        return Err(Error::schema(format!(
                            "round '{}' reads '{}', which is produced by {} round '{}'",
                            round.id,
                            column,
                            if pos == position { "the same" } else { "the later" },
                            source
                        )));
                    }
                    Some(_) if !self.produced_before(&column, position) => {
                        return Err(Error::schema(format!(
                            "round '{}' reads '{}', which round '{}' never produces",
                            round.id, column, source
                        )));
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::error::Result as ReviewResult;
    use crate::llm_client::{EvaluationRequest, EvaluationResponse, LlmClient};
    use crate::shape::OutputShape;
    use crate::workflow::filter::FilterConfig;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct Unused;

    #[async_trait]
    impl LlmClient for Unused {
        async fn evaluate(&self, _request: EvaluationRequest) -> ReviewResult<EvaluationResponse> {
            Ok(EvaluationResponse::new(json!({}), 0.0))
        }

        fn client_type(&self) -> &str {
            "unused"
        }
    }

    fn agent(name: &str) -> Arc<Agent> {
        Arc::new(
            Agent::builder()
                .name(name)
                .output_shape(OutputShape::scoring(&[1, 2, 3, 4, 5]))
                .client(Arc::new(Unused))
                .build()
                .unwrap(),
        )
    }

    fn round(id: &str) -> RoundSpec {
        RoundSpec::new(id).agent(agent("X")).inputs(["title"])
    }

    fn schema_error(rounds: Vec<RoundSpec>) -> String {
        match WorkflowSchema::new(rounds) {
            Err(Error::Schema(msg)) => msg,
            other => panic!("expected schema error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_rejects_structural_problems() {
        assert!(schema_error(vec![]).contains("no rounds"));
        assert!(schema_error(vec![round("A"), round("A")]).contains("duplicate"));
        assert!(schema_error(vec![round("full_text")]).contains("round id"));
        assert!(schema_error(vec![RoundSpec::new("A")]).contains("no agents"));
        assert!(schema_error(vec![round("A").agent(agent("X"))]).contains("twice"));
        assert!(schema_error(vec![round("A").inputs(Vec::<String>::new())]).contains("no input"));
    }

    #[test]
    fn test_rejects_same_and_later_round_references() {
        let same = round("A").inputs(["title", "round-A_X_score"]);
        assert!(schema_error(vec![same]).contains("the same"));

        let forward = round("A").filter_with(Arc::new(FilterConfig::NotNull {
            column: "round-B_X_score".into(),
        }));
        assert!(schema_error(vec![forward, round("B")]).contains("the later"));
    }

    #[test]
    fn test_rejects_columns_an_earlier_round_never_writes() {
        let b = round("B").inputs(["round-A_X_evaluation"]);
        assert!(schema_error(vec![round("A"), b]).contains("never produces"));
    }

    #[test]
    fn test_accepts_earlier_round_columns() {
        let b = round("B").inputs(["title", "round-A_X_score", "round-A_X_output"]);
        let schema = WorkflowSchema::new(vec![round("A"), b]).unwrap();
        assert_eq!(schema.rounds().len(), 2);
        assert!(schema.produced_before("round-A_X_reasoning", 1));
        assert!(!schema.produced_before("round-A_X_reasoning", 0));
        assert_eq!(schema.position("B"), Some(1));
    }

    #[test]
    fn test_unknown_round_prefix_is_an_original_column() {
        let a = round("A").inputs(["round-legacy_notes"]);
        assert!(WorkflowSchema::new(vec![a]).is_ok());
    }
}
