//! # review-rounds
//!
//! Round-based, multi-agent review of tabular item batches.
//!
//! Items (rows of a [`Dataset`]) pass through an ordered list of rounds. In
//! each round a fixed set of [`Agent`]s evaluates every eligible row; each
//! result lands in `round-{round}_{agent}_{field}` columns that later rounds
//! can read and filter on.
//!
//! ## Features
//!
//! - **Bounded fan-out**: each agent owns its concurrency ceiling and retry budget
//! - **Typed outputs**: every agent declares the fields it produces; non-conforming answers are retried
//! - **Partial failure isolation**: exhausted retries degrade one cell, never the run
//! - **Cost accounting**: per agent, per round and total
//! - **YAML workflows**: rounds, agents and filters from a file
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use review_rounds::prelude::*;
//! use std::sync::Arc;
//!
//! # async fn demo(client: Arc<dyn LlmClient>) -> anyhow::Result<()> {
//! let screener = Arc::new(
//!     Agent::builder()
//!         .name("Alice")
//!         .output_shape(OutputShape::title_abstract())
//!         .client(client)
//!         .build()?,
//! );
//!
//! let schema = WorkflowSchema::new(vec![RoundSpec::new("A").agent(screener)])?;
//! let dataset = Dataset::from_json(r#"[{"title": "Sepsis in the ICU", "abstract": "..."}]"#)?;
//!
//! let outcome = ReviewWorkflow::new(schema).run(dataset).await?;
//! println!("total cost: {}", outcome.costs.total);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agent;
pub mod config;
pub mod context;
pub mod dataset;
pub mod error;
pub mod item;
pub mod llm_client;
pub mod prompt;
pub mod shape;
pub mod telemetry;
pub mod types;
pub mod workflow;

// Re-exports for convenience
pub use agent::{Agent, AgentBuilder, AgentHooks, Evaluation, EvaluationStatus};
pub use config::{AgentDefaults, LogFormat, LoggingSettings, RetryPolicy, ReviewSettings};
pub use context::{AuxContext, ContextResolver, FnResolver};
pub use dataset::{Dataset, Row, RowView};
pub use error::{Error, Result};
pub use item::ReviewItem;
pub use llm_client::{EvaluationRequest, EvaluationResponse, LlmClient};
pub use prompt::PromptConfig;
pub use shape::{FieldSpec, FieldType, OutputShape, StructuredOutput};
pub use telemetry::{init_tracing, RoundReport};
pub use types::{Progress, RowIndex, RunId};
pub use workflow::{
    review_summary, CostSummary, DegradedEntry, FilterConfig, ReviewWorkflow, RoundSpec,
    RowFilter, WorkflowConfig, WorkflowHooks, WorkflowOutcome, WorkflowSchema,
};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agent::{Agent, AgentBuilder, Evaluation};
    pub use crate::dataset::{Dataset, RowView};
    pub use crate::error::{Error, Result};
    pub use crate::llm_client::{EvaluationRequest, EvaluationResponse, LlmClient};
    pub use crate::shape::OutputShape;
    pub use crate::types::*;
    pub use crate::workflow::{ReviewWorkflow, RoundSpec, WorkflowSchema};
}
