//! Capability boundary between agents and model providers
//!
//! Concrete transports live outside this crate; they implement [`LlmClient`]
//! and turn an [`EvaluationRequest`] into raw structured output plus the
//! incremental cost of the call.

use crate::error::Result;
use crate::prompt::PromptConfig;
use crate::shape::OutputShape;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a provider needs to judge one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Name of the evaluating agent
    pub agent_name: String,
    /// Per-agent instructions (backstory, criteria, task)
    pub prompt: PromptConfig,
    /// Item fields projected onto the round's inputs, in declared order
    pub inputs: Vec<(String, Value)>,
    /// The same fields rendered as text
    pub item_text: String,
    /// Resolved auxiliary context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Image references (paths or URLs)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Shape the answer must conform to
    pub output_shape: OutputShape,
    /// 1-based attempt number
    pub attempt: u32,
}

/// Raw provider answer, validated by the agent before use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResponse {
    /// Structured output, expected to be a JSON object
    pub output: Value,
    /// Incremental cost of this call
    pub cost: f64,
}

impl EvaluationResponse {
    /// Create a response
    pub fn new(output: Value, cost: f64) -> Self {
        Self { output, cost }
    }
}

/// Trait implemented by model provider adapters
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Evaluate one item. Transport failures surface as [`crate::Error::Transport`].
    async fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResponse>;

    /// Get the client type for debugging/logging
    fn client_type(&self) -> &str;
}
