//! Workflow module - Round-based review over a dataset
//!
//! A [`WorkflowSchema`] is an ordered list of [`RoundSpec`]s. The
//! [`ReviewWorkflow`] engine runs them in order: each round filters rows,
//! fans out every (row, agent) call and merges the results into
//! `round-{round}_{agent}_{field}` columns that later rounds may read.
//!
//! # Example
//!
//! ```rust,ignore
//! use review_rounds::workflow::{ReviewWorkflow, RoundSpec, WorkflowSchema};
//!
//! let schema = WorkflowSchema::new(vec![
//!     RoundSpec::new("A").agent(alice.clone()).agent(bob.clone()),
//!     RoundSpec::new("B")
//!         .agent(senior)
//!         .filter(|row| row.get("round-A_Alice_evaluation") != row.get("round-A_Bob_evaluation")),
//! ])?;
//! let outcome = ReviewWorkflow::new(schema).run(dataset).await?;
//! ```

pub mod columns;
pub mod config;
pub mod cost;
pub mod engine;
pub mod filter;
pub mod round;
pub mod schema;
pub mod summary;

// Re-exports
pub use columns::{column_name, output_column, OUTPUT_FIELD};
pub use config::{AgentConfig, KeyConfig, ReviewerKind, RoundAgent, RoundConfig, WorkflowConfig};
pub use cost::CostSummary;
pub use engine::{
    DegradedEntry, ReviewWorkflow, RoundPhase, RunState, WorkflowHooks, WorkflowOutcome,
};
pub use filter::{FilterConfig, RowFilter};
pub use round::RoundSpec;
pub use schema::WorkflowSchema;
pub use summary::{review_summary, RowSummary};
