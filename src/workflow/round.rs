//! Round declarations

use super::filter::RowFilter;
use crate::agent::Agent;
use crate::dataset::RowView;
use std::fmt;
use std::sync::Arc;

/// Default columns fed to agents when a round does not name its inputs
pub const DEFAULT_INPUTS: [&str; 2] = ["title", "abstract"];

/// One stage of a workflow
#[derive(Clone)]
pub struct RoundSpec {
    /// Round id, unique within the schema
    pub id: String,
    /// Agents evaluating every eligible row
    pub agents: Vec<Arc<Agent>>,
    /// Columns projected into each item
    pub inputs: Vec<String>,
    /// Columns holding image references
    pub image_inputs: Vec<String>,
    /// Row eligibility; `None` means every row
    pub filter: Option<Arc<dyn RowFilter>>,
}

impl RoundSpec {
    /// Create a round reading the default `title` and `abstract` inputs
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            agents: Vec::new(),
            inputs: DEFAULT_INPUTS.iter().map(|c| c.to_string()).collect(),
            image_inputs: Vec::new(),
            filter: None,
        }
    }

    /// Add an agent
    pub fn agent(mut self, agent: Arc<Agent>) -> Self {
        self.agents.push(agent);
        self
    }

    /// Replace the agent list
    pub fn agents(mut self, agents: impl IntoIterator<Item = Arc<Agent>>) -> Self {
        self.agents = agents.into_iter().collect();
        self
    }

    /// Replace the input columns
    pub fn inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the image columns
    pub fn image_inputs<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_inputs = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the round with a closure over the row
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RowView<'_>) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(predicate));
        self
    }

    /// Restrict the round with a prepared filter
    pub fn filter_with(mut self, filter: Arc<dyn RowFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Whether the row takes part in this round
    pub fn is_eligible(&self, row: &RowView<'_>) -> bool {
        self.filter.as_ref().map_or(true, |f| f.eligible(row))
    }

    /// Every column the round reads up front
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .inputs
            .iter()
            .chain(self.image_inputs.iter())
            .cloned()
            .collect();
        if let Some(filter) = &self.filter {
            columns.extend(filter.columns());
        }
        columns
    }
}

impl fmt::Debug for RoundSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundSpec")
            .field("id", &self.id)
            .field(
                "agents",
                &self.agents.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(),
            )
            .field("inputs", &self.inputs)
            .field("image_inputs", &self.image_inputs)
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
