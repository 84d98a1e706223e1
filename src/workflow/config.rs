//! Workflow definitions loaded from YAML
//!
//! A workflow file lists reusable agents and the rounds that use them:
//!
//! ```yaml
//! agents:
//!   - name: Alice
//!     kind: title_abstract
//!     inclusion_criteria: "Adult ICU patients"
//! rounds:
//!   - agents: [Alice, Bob]
//!   - inputs: [title, abstract, round-A_Alice_reasoning]
//!     filter: { type: columns_differ, left: round-A_Alice_evaluation, right: round-A_Bob_evaluation }
//!     agents:
//!       - name: Senior
//!         kind: scoring
//!         score_set: [1, 2]
//! ```

use super::filter::FilterConfig;
use super::round::{RoundSpec, DEFAULT_INPUTS};
use super::schema::WorkflowSchema;
use crate::agent::{Agent, AgentBuilder};
use crate::config::AgentDefaults;
use crate::context::AuxContext;
use crate::error::{Error, Result};
use crate::llm_client::LlmClient;
use crate::prompt::{presets, PromptConfig};
use crate::shape::OutputShape;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Top-level workflow file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Agent defaults for this workflow, replacing the caller's
    #[serde(default)]
    pub defaults: Option<AgentDefaults>,
    /// Agents referenced by name from rounds
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
    /// Rounds in execution order
    pub rounds: Vec<RoundConfig>,
}

/// One round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundConfig {
    /// Round id; defaults to `A`, `B`, ... by position
    #[serde(default)]
    pub id: Option<String>,
    /// Input columns
    #[serde(default = "default_inputs")]
    pub inputs: Vec<String>,
    /// Image columns
    #[serde(default)]
    pub image_inputs: Vec<String>,
    /// Row filter
    #[serde(default)]
    pub filter: Option<FilterConfig>,
    /// Agents by name or inline
    pub agents: Vec<RoundAgent>,
}

fn default_inputs() -> Vec<String> {
    DEFAULT_INPUTS.iter().map(|c| c.to_string()).collect()
}

/// Agent entry of a round
/// NOTE: Order matters for serde untagged! A bare name must be tried first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoundAgent {
    /// Reference to a top-level agent
    Named(String),
    /// Agent defined in place
    Inline(AgentConfig),
}

/// Reviewer kinds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerKind {
    /// Include/exclude screening on a 1 to 5 scale
    #[default]
    TitleAbstract,
    /// Score from a fixed set
    Scoring,
    /// Free-text extraction of named keys
    Abstraction,
}

/// Abstraction key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyConfig {
    /// Output field name
    pub name: String,
    /// What to extract
    #[serde(default)]
    pub description: String,
}

/// Agent instantiation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Agent name
    pub name: String,
    /// Reviewer kind
    #[serde(default)]
    pub kind: ReviewerKind,
    /// Persona given to the model
    #[serde(default)]
    pub backstory: String,
    /// Task override
    #[serde(default)]
    pub task: Option<String>,
    /// Inclusion criteria
    #[serde(default)]
    pub inclusion_criteria: String,
    /// Exclusion criteria
    #[serde(default)]
    pub exclusion_criteria: String,
    /// Allowed scores for `scoring` agents
    #[serde(default = "default_score_set")]
    pub score_set: Vec<i64>,
    /// Meaning of each score
    #[serde(default)]
    pub score_descriptions: Vec<String>,
    /// Keys for `abstraction` agents
    #[serde(default)]
    pub keys: Vec<KeyConfig>,
    /// Ask for a 0 to 100 certainty
    #[serde(default)]
    pub certainty: bool,
    /// Constant context sent with every item
    #[serde(default)]
    pub additional_context: Option<String>,
    /// Worked examples
    #[serde(default)]
    pub examples: Vec<String>,
    /// Concurrency override
    #[serde(default)]
    pub concurrency_limit: Option<usize>,
    /// Retry budget override
    #[serde(default)]
    pub retry_limit: Option<u32>,
    /// Timeout override in seconds; 0 disables the timeout
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_score_set() -> Vec<i64> {
    vec![1, 2]
}

impl AgentConfig {
    /// Output shape for this reviewer kind
    pub fn output_shape(&self) -> Result<OutputShape> {
        let shape = match self.kind {
            ReviewerKind::TitleAbstract => OutputShape::title_abstract(),
            ReviewerKind::Scoring => {
                if self.score_set.is_empty() {
                    return Err(Error::config(format!(
                        "Agent '{}' needs a non-empty score_set",
                        self.name
                    )));
                }
                OutputShape::scoring(&self.score_set)
            }
            ReviewerKind::Abstraction => {
                OutputShape::abstraction(self.keys.iter().map(|k| k.name.clone()))?
            }
        };
        Ok(if self.certainty {
            shape.with_certainty()
        } else {
            shape
        })
    }

    /// Prompt configuration, filling kind-specific defaults
    pub fn prompt(&self) -> PromptConfig {
        let default_task = match self.kind {
            ReviewerKind::TitleAbstract => presets::TITLE_ABSTRACT_TASK,
            ReviewerKind::Scoring => "",
            ReviewerKind::Abstraction => presets::ABSTRACTION_TASK,
        };
        let score_descriptions = match (self.kind, self.score_descriptions.is_empty()) {
            (ReviewerKind::TitleAbstract, true) => presets::TITLE_ABSTRACT_SCALE
                .iter()
                .map(|s| s.to_string())
                .collect(),
            _ => self.score_descriptions.clone(),
        };

        let mut prompt = PromptConfig::new(&self.backstory)
            .with_task(self.task.as_deref().unwrap_or(default_task))
            .with_criteria(&self.inclusion_criteria, &self.exclusion_criteria)
            .with_score_descriptions(score_descriptions);
        for key in &self.keys {
            prompt = prompt.with_key_description(&key.name, &key.description);
        }
        for example in &self.examples {
            prompt = prompt.with_example(example);
        }
        prompt
    }

    /// Build an Agent from this configuration
    pub fn build(&self, client: Arc<dyn LlmClient>, defaults: &AgentDefaults) -> Result<Agent> {
        let mut builder = AgentBuilder::with_defaults(defaults)
            .name(&self.name)
            .prompt(self.prompt())
            .output_shape(self.output_shape()?)
            .client(client);

        if let Some(limit) = self.concurrency_limit {
            builder = builder.concurrency_limit(limit);
        }
        if let Some(retries) = self.retry_limit {
            builder = builder.retry_limit(retries);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout((secs > 0).then(|| Duration::from_secs(secs)));
        }
        if let Some(context) = &self.additional_context {
            builder = builder.context(AuxContext::constant(context));
        }
        builder.build()
    }
}

/// Id given to the round at `index` when none is declared
pub fn default_round_id(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
        _ => format!("R{}", index + 1),
    }
}

impl WorkflowConfig {
    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Instantiate agents and rounds, then validate the resulting schema.
    ///
    /// Agents referenced by name are built once and shared by every round that lists them.
    pub fn build(&self, client: Arc<dyn LlmClient>, defaults: &AgentDefaults) -> Result<WorkflowSchema> {
        let defaults = self.defaults.as_ref().unwrap_or(defaults);

        let mut named: HashMap<&str, Arc<Agent>> = HashMap::new();
        for config in &self.agents {
            let agent = Arc::new(config.build(client.clone(), defaults)?);
            if named.insert(config.name.as_str(), agent).is_some() {
                return Err(Error::config(format!("Agent '{}' is defined twice", config.name)));
            }
        }

        let mut rounds = Vec::with_capacity(self.rounds.len());
        for (index, round) in self.rounds.iter().enumerate() {
            let id = round.id.clone().unwrap_or_else(|| default_round_id(index));

            let mut agents = Vec::with_capacity(round.agents.len());
            for entry in &round.agents {
                let agent = match entry {
                    RoundAgent::Named(name) => named.get(name.as_str()).cloned().ok_or_else(|| {
                        Error::config(format!("Round '{}' references unknown agent '{}'", id, name))
                    })?,
                    RoundAgent::Inline(config) => Arc::new(config.build(client.clone(), defaults)?),
                };
                agents.push(agent);
            }

            let mut spec = RoundSpec::new(id)
                .agents(agents)
                .inputs(round.inputs.clone())
                .image_inputs(round.image_inputs.clone());
            if let Some(filter) = &round.filter {
                spec = spec.filter_with(Arc::new(filter.clone()));
            }
            rounds.push(spec);
        }

        tracing::debug!(
            rounds = rounds.len(),
            shared_agents = named.len(),
            "Built workflow from configuration"
        );
        WorkflowSchema::new(rounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::{EvaluationRequest, EvaluationResponse};
    use crate::shape::CERTAINTY_FIELD;
    use async_trait::async_trait;
    use serde_json::json;

    struct Unused;

    #[async_trait]
    impl LlmClient for Unused {
        async fn evaluate(&self, _request: EvaluationRequest) -> Result<EvaluationResponse> {
            Ok(EvaluationResponse::new(json!({}), 0.0))
        }

        fn client_type(&self) -> &str {
            "unused"
        }
    }

    const TWO_ROUNDS: &str = r#"
defaults:
  concurrency_limit: 4
  timeout_secs: 30
agents:
  - name: Alice
    backstory: "a clinician"
    inclusion_criteria: "ICU cohorts"
  - name: Bob
    kind: title_abstract
    certainty: true
    retry_limit: 0
rounds:
  - agents: [Alice, Bob]
  - inputs: [title, round-A_Alice_reasoning]
    filter:
      type: columns_differ
      left: round-A_Alice_evaluation
      right: round-A_Bob_evaluation
    agents:
      - name: Senior
        kind: scoring
        score_set: [1, 2, 3]
        timeout_secs: 0
      - Alice
"#;

    #[test]
    fn test_build_two_round_workflow() {
        let config = WorkflowConfig::from_yaml(TWO_ROUNDS).unwrap();
        let schema = config.build(Arc::new(Unused), &AgentDefaults::default()).unwrap();

        let ids: Vec<_> = schema.rounds().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);

        let a = &schema.rounds()[0];
        assert_eq!(a.inputs, vec!["title", "abstract"]);
        assert!(a.filter.is_none());
        assert_eq!(a.agents[0].concurrency_limit(), 4);
        assert_eq!(a.agents[1].retry_policy().retry_limit, 0);
        assert!(a.agents[1].output_shape().field(CERTAINTY_FIELD).is_some());
        assert_eq!(a.agents[0].prompt.score_descriptions.len(), 5);
        assert_eq!(a.agents[0].prompt.task, presets::TITLE_ABSTRACT_TASK);

        let b = &schema.rounds()[1];
        assert!(b.filter.is_some());
        assert!(b.agents[0].output_shape().field("score").is_some());
        assert!(Arc::ptr_eq(&a.agents[0], &b.agents[1]));
    }

    #[test]
    fn test_unknown_agent_reference() {
        let yaml = "rounds:\n  - agents: [Nobody]\n";
        let err = WorkflowConfig::from_yaml(yaml)
            .unwrap()
            .build(Arc::new(Unused), &AgentDefaults::default())
            .unwrap_err();
        assert!(err.to_string().contains("unknown agent 'Nobody'"));
    }

    #[test]
    fn test_abstraction_agent_needs_keys() {
        let yaml = r#"
rounds:
  - agents:
      - name: Extractor
        kind: abstraction
"#;
        let config = WorkflowConfig::from_yaml(yaml).unwrap();
        assert!(config.build(Arc::new(Unused), &AgentDefaults::default()).is_err());

        let yaml = r#"
rounds:
  - agents:
      - name: Extractor
        kind: abstraction
        keys:
          - name: population
            description: "Who was studied"
          - name: outcome
"#;
        let schema = WorkflowConfig::from_yaml(yaml)
            .unwrap()
            .build(Arc::new(Unused), &AgentDefaults::default())
            .unwrap();
        let agent = &schema.rounds()[0].agents[0];
        assert_eq!(agent.output_shape().fields().len(), 2);
        assert_eq!(agent.prompt.key_descriptions[0].1, "Who was studied");
    }

    #[test]
    fn test_schema_errors_surface_from_build() {
        let yaml = r#"
rounds:
  - id: A
    inputs: [round-A_X_score]
    agents:
      - name: X
        kind: scoring
"#;
        let err = WorkflowConfig::from_yaml(yaml)
            .unwrap()
            .build(Arc::new(Unused), &AgentDefaults::default())
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_bundled_workflow_file() {
        let path = concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/workflows/title_abstract_two_round.yaml"
        );
        let schema = WorkflowConfig::from_file(path)
            .unwrap()
            .build(Arc::new(Unused), &AgentDefaults::default())
            .unwrap();
        assert_eq!(schema.rounds().len(), 2);
        assert_eq!(schema.rounds()[1].agents[0].name, "Senior");
    }

    #[test]
    fn test_default_round_ids() {
        assert_eq!(default_round_id(0), "A");
        assert_eq!(default_round_id(25), "Z");
        assert_eq!(default_round_id(26), "R27");
    }
}
