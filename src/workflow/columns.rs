//! Derived column naming
//!
//! Derived columns are named `round-{round}_{agent}_{field}`. Names depend only
//! on the round id, the agent name and the field name.

use crate::agent::Agent;
use regex::Regex;
use std::sync::OnceLock;

/// Field name of the column holding the full structured output
pub const OUTPUT_FIELD: &str = "output";

fn round_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9-]+$").expect("valid round id regex"))
}

fn derived_column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^round-([A-Za-z0-9-]+)_(.+)$").expect("valid derived column regex")
    })
}

/// Whether `id` can be used as a round id (`_` separates name parts and is not allowed)
pub fn is_valid_round_id(id: &str) -> bool {
    round_id_pattern().is_match(id)
}

/// Name of the column holding `field` produced by `agent` in `round`
pub fn column_name(round: &str, agent: &str, field: &str) -> String {
    format!("round-{}_{}_{}", round, agent, field)
}

/// Name of the column holding the full output of `agent` in `round`
pub fn output_column(round: &str, agent: &str) -> String {
    column_name(round, agent, OUTPUT_FIELD)
}

/// Round id encoded in a derived column name
pub fn derived_round(column: &str) -> Option<&str> {
    derived_column_pattern()
        .captures(column)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Every column an agent writes in a round: declared fields in order, then `output`
pub fn agent_columns(round: &str, agent: &Agent) -> Vec<String> {
    agent
        .output_shape()
        .fields()
        .iter()
        .map(|f| column_name(round, &agent.name, &f.name))
        .chain(std::iter::once(output_column(round, &agent.name)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_are_deterministic() {
        assert_eq!(column_name("A", "X", "score"), "round-A_X_score");
        assert_eq!(output_column("B", "Dr Smith"), "round-B_Dr Smith_output");
    }

    #[test]
    fn test_derived_round_parsing() {
        assert_eq!(derived_round("round-A_X_score"), Some("A"));
        assert_eq!(derived_round("round-A-2_my_agent_score"), Some("A-2"));
        assert_eq!(derived_round("title"), None);
        assert_eq!(derived_round("round-_X"), None);
    }

    #[test]
    fn test_round_id_charset() {
        assert!(is_valid_round_id("A"));
        assert!(is_valid_round_id("screen-2"));
        assert!(!is_valid_round_id("full_text"));
        assert!(!is_valid_round_id(""));
    }
}
