//! Per-row digest of a finished workflow

use super::columns::column_name;
use super::schema::WorkflowSchema;
use crate::dataset::{render_value, Dataset};
use crate::shape::FieldType;
use crate::types::RowIndex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

const REASONING_EXCERPT_CHARS: usize = 200;

/// Digest of everything the workflow wrote for one row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSummary {
    /// Row index
    pub row: RowIndex,
    /// `evaluation` of the deciding agent
    pub final_decision: Option<Value>,
    /// `score` of the deciding agent
    pub final_score: Option<f64>,
    /// First characters of the deciding agent's explanation
    pub reasoning_summary: Option<String>,
    /// `column: value` lines for every non-empty derived cell, in schema order
    pub detailed_log: Vec<String>,
    /// Union of every list-valued field
    pub extracted: BTreeSet<String>,
}

/// Summarize each row of a dataset produced by `schema`.
///
/// The deciding agent is the first agent of the last round that reviewed the row.
pub fn review_summary(dataset: &Dataset, schema: &WorkflowSchema) -> Vec<RowSummary> {
    dataset
        .iter()
        .map(|row| {
            let mut summary = RowSummary {
                row: row.index(),
                ..Default::default()
            };

            for round in schema.rounds() {
                for agent in &round.agents {
                    for field in agent.output_shape().fields() {
                        let column = column_name(&round.id, &agent.name, &field.name);
                        let Some(value) = row.get(&column) else {
                            continue;
                        };
                        if matches!(value, Value::String(s) if s.is_empty()) {
                            continue;
                        }
                        summary
                            .detailed_log
                            .push(format!("{}: {}", column, render_value(value)));
                        if field.field_type == FieldType::StringList {
                            if let Value::Array(items) = value {
                                summary.extracted.extend(
                                    items.iter().filter_map(Value::as_str).map(str::to_string),
                                );
                            }
                        }
                    }
                }
            }

            let decider = schema.rounds().iter().rev().find_map(|round| {
                let agent = round.agents.first()?;
                let reviewed = agent
                    .output_shape()
                    .fields()
                    .iter()
                    .any(|f| row.contains(&column_name(&round.id, &agent.name, &f.name)));
                reviewed.then_some((round, agent))
            });

            if let Some((round, agent)) = decider {
                let cell = |field: &str| row.get(&column_name(&round.id, &agent.name, field));
                summary.final_decision = cell("evaluation").cloned();
                summary.final_score = cell("score").and_then(|v| match v {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse().ok(),
                    _ => None,
                });
                summary.reasoning_summary = agent
                    .output_shape()
                    .explanation_field()
                    .and_then(|field| cell(field))
                    .and_then(Value::as_str)
                    .map(excerpt);
            }

            summary
        })
        .collect()
}

fn excerpt(text: &str) -> String {
    let cut: String = text.chars().take(REASONING_EXCERPT_CHARS).collect();
    format!("{}...", cut)
}
