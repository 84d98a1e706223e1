//! Per-agent prompt configuration
//!
//! Agents carry their own instructions; there is no shared template registry.
//! Turning these fields into provider-specific prompt text is the provider's job.

use serde::{Deserialize, Serialize};

/// Instructions handed to the provider with every request of an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Persona of the reviewer
    #[serde(default)]
    pub backstory: String,
    /// What the reviewer is asked to do
    #[serde(default)]
    pub task: String,
    /// Criteria an item must meet to be included
    #[serde(default)]
    pub inclusion_criteria: String,
    /// Criteria that exclude an item
    #[serde(default)]
    pub exclusion_criteria: String,
    /// Meaning of each allowed score
    #[serde(default)]
    pub score_descriptions: Vec<String>,
    /// Descriptions for abstraction keys, by key
    #[serde(default)]
    pub key_descriptions: Vec<(String, String)>,
    /// Free-form worked examples
    #[serde(default)]
    pub examples: Vec<String>,
}

impl PromptConfig {
    /// Create a prompt configuration with a backstory
    pub fn new(backstory: impl Into<String>) -> Self {
        Self {
            backstory: backstory.into(),
            ..Self::default()
        }
    }

    /// Set the task description
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    /// Set inclusion and exclusion criteria
    pub fn with_criteria(
        mut self,
        inclusion: impl Into<String>,
        exclusion: impl Into<String>,
    ) -> Self {
        self.inclusion_criteria = inclusion.into();
        self.exclusion_criteria = exclusion.into();
        self
    }

    /// Describe what each score means
    pub fn with_score_descriptions(mut self, descriptions: Vec<String>) -> Self {
        self.score_descriptions = descriptions;
        self
    }

    /// Describe an abstraction key
    pub fn with_key_description(
        mut self,
        key: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.key_descriptions.push((key.into(), description.into()));
        self
    }

    /// Add a worked example
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }
}

/// Task and score meanings used for title/abstract screening
pub mod presets {
    /// Screening task description
    pub const TITLE_ABSTRACT_TASK: &str =
        "Decide whether the item should be included based on its title and abstract.";

    /// Meaning of evaluations 1 to 5
    pub const TITLE_ABSTRACT_SCALE: [&str; 5] = [
        "1: absolutely exclude",
        "2: better to exclude",
        "3: not sure if to include or exclude",
        "4: better to include",
        "5: absolutely include",
    ];

    /// Abstraction task description
    pub const ABSTRACTION_TASK: &str = "Extract the requested information from the item.";
}
