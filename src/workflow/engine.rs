//! Round-by-round execution of a workflow schema over a dataset
//!
//! Rounds run strictly in sequence. Within a round every (row, agent) pair is
//! dispatched at once; each agent's semaphore bounds its own calls. Results are
//! merged by the engine task as they complete, keyed by row index, into
//! columns registered before dispatch, so the final table does not depend on
//! completion order.

use super::columns::{agent_columns, column_name, output_column};
use super::cost::CostSummary;
use super::round::RoundSpec;
use super::schema::WorkflowSchema;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::item::ReviewItem;
use crate::telemetry::RoundReport;
use crate::types::{Progress, RowIndex, RunId};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Run-level state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum RunState {
    /// Not started
    Idle,
    /// Executing the round at this position
    RunningRound(usize),
    /// Every round completed
    Finished,
    /// Stopped by a schema, dataset or hook error
    Aborted(String),
}

/// Phase of a single round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Evaluating the filter
    Filtering,
    /// Dispatching agent calls
    Dispatching,
    /// Writing completed calls into the dataset
    Merging,
    /// All calls finished
    Complete,
}

/// A (row, round, agent) call that ended in a sentinel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedEntry {
    /// Row index
    pub row: RowIndex,
    /// Round id
    pub round: String,
    /// Agent name
    pub agent: String,
    /// Last error seen
    pub error: String,
}

/// Result of a run
#[derive(Debug, Clone)]
pub struct WorkflowOutcome {
    /// Run identifier, also attached to log events
    pub run_id: RunId,
    /// The dataset with derived columns added
    pub dataset: Dataset,
    /// Costs incurred by this run
    pub costs: CostSummary,
    /// Calls that exhausted their retries, ordered by round, row and agent
    pub degraded: Vec<DegradedEntry>,
    /// One report per executed round
    pub rounds: Vec<RoundReport>,
}

impl WorkflowOutcome {
    /// Rows carrying at least one sentinel
    pub fn degraded_rows(&self) -> BTreeSet<RowIndex> {
        self.degraded.iter().map(|d| d.row).collect()
    }

    /// Whether every call succeeded
    pub fn is_clean(&self) -> bool {
        self.degraded.is_empty()
    }
}

type RoundStartHook = Arc<dyn Fn(&str) + Send + Sync>;
type RoundCompleteHook = Arc<dyn Fn(&RoundReport) -> Result<()> + Send + Sync>;
type ProgressHook = Arc<dyn Fn(Progress) + Send + Sync>;
type StateHook = Arc<dyn Fn(&RunState) + Send + Sync>;

/// Workflow lifecycle hooks
#[derive(Clone, Default)]
pub struct WorkflowHooks {
    /// Called before a round starts filtering
    pub on_round_start: Option<RoundStartHook>,
    /// Called after a round merged its last result; an error abandons the run
    pub on_round_complete: Option<RoundCompleteHook>,
    /// Called after every merged call
    pub on_progress: Option<ProgressHook>,
    /// Called on every run state transition
    pub on_state_change: Option<StateHook>,
}

impl fmt::Debug for WorkflowHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowHooks")
            .field("on_round_start", &self.on_round_start.is_some())
            .field("on_round_complete", &self.on_round_complete.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .field("on_state_change", &self.on_state_change.is_some())
            .finish()
    }
}

/// Executes a [`WorkflowSchema`]. Holds no state between runs.
#[derive(Debug, Clone)]
pub struct ReviewWorkflow {
    schema: WorkflowSchema,
    hooks: WorkflowHooks,
}

impl ReviewWorkflow {
    /// Create a workflow for a validated schema
    pub fn new(schema: WorkflowSchema) -> Self {
        Self {
            schema,
            hooks: WorkflowHooks::default(),
        }
    }

    /// Set the hooks
    pub fn with_hooks(mut self, hooks: WorkflowHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// The schema being executed
    pub fn schema(&self) -> &WorkflowSchema {
        &self.schema
    }

    /// Run every round in order
    pub async fn run(&self, dataset: Dataset) -> Result<WorkflowOutcome> {
        let positions: Vec<usize> = (0..self.schema.rounds().len()).collect();
        self.execute(dataset, &positions).await
    }

    /// Run a single round again, overwriting its previous columns.
    ///
    /// Columns from earlier rounds are read from `dataset` as they are.
    pub async fn rerun_round(&self, dataset: Dataset, round_id: &str) -> Result<WorkflowOutcome> {
        let position = self
            .schema
            .position(round_id)
            .ok_or_else(|| Error::schema(format!("unknown round '{}'", round_id)))?;
        self.execute(dataset, &[position]).await
    }

    async fn execute(&self, mut dataset: Dataset, positions: &[usize]) -> Result<WorkflowOutcome> {
        self.schema.validate()?;

        let run_id = RunId::new();
        let mut state = RunState::Idle;
        if let Some(hook) = &self.hooks.on_state_change {
            hook(&state);
        }
        tracing::info!(
            %run_id,
            rounds = positions.len(),
            rows = dataset.len(),
            "Starting review workflow"
        );

        if let Err(err) = self.check_dataset(&dataset, positions) {
            self.transition(&run_id, &mut state, RunState::Aborted(err.to_string()));
            return Err(err);
        }

        let mut costs = CostSummary::default();
        let mut degraded = Vec::new();
        let mut reports = Vec::new();

        for &position in positions {
            let round = &self.schema.rounds()[position];
            self.transition(&run_id, &mut state, RunState::RunningRound(position));

            if let Some(hook) = &self.hooks.on_round_start {
                hook(&round.id);
            }

            let report = match self
                .run_round(&run_id, round, &mut dataset, &mut costs, &mut degraded)
                .await
            {
                Ok(report) => report,
                Err(err) => {
                    self.transition(&run_id, &mut state, RunState::Aborted(err.to_string()));
                    return Err(err);
                }
            };

            tracing::info!(
                %run_id,
                round = %report.round,
                eligible = report.eligible_rows,
                succeeded = report.succeeded,
                degraded = report.degraded,
                cost = report.cost,
                duration_ms = report.duration_ms(),
                "Round complete"
            );

            if let Some(hook) = &self.hooks.on_round_complete {
                if let Err(err) = hook(&report) {
                    let err = Error::HookAborted {
                        round: round.id.clone(),
                        reason: err.to_string(),
                    };
                    self.transition(&run_id, &mut state, RunState::Aborted(err.to_string()));
                    return Err(err);
                }
            }
            reports.push(report);
        }

        self.transition(&run_id, &mut state, RunState::Finished);
        tracing::info!(
            %run_id,
            total_cost = costs.total,
            degraded = degraded.len(),
            "Review workflow finished"
        );

        Ok(WorkflowOutcome {
            run_id,
            dataset,
            costs,
            degraded,
            rounds: reports,
        })
    }

    /// Every column a scheduled round reads must already exist unless an
    /// earlier round produces it. Checked once, before any agent call.
    fn check_dataset(&self, dataset: &Dataset, positions: &[usize]) -> Result<()> {
        for &position in positions {
            let round = &self.schema.rounds()[position];
            for column in round.referenced_columns() {
                if !dataset.has_column(&column) && !self.schema.produced_before(&column, position) {
                    return Err(Error::missing_column(&round.id, &column));
                }
            }
        }
        Ok(())
    }

    async fn run_round(
        &self,
        run_id: &RunId,
        round: &RoundSpec,
        dataset: &mut Dataset,
        costs: &mut CostSummary,
        degraded: &mut Vec<DegradedEntry>,
    ) -> Result<RoundReport> {
        let mut report = RoundReport::begin(&round.id);

        self.phase(run_id, round, RoundPhase::Filtering);
        let produced: Vec<String> = round
            .agents
            .iter()
            .flat_map(|agent| agent_columns(&round.id, agent))
            .collect();
        let cleared = dataset.remove_columns(&produced);
        if cleared > 0 {
            tracing::debug!(%run_id, round = %round.id, cleared, "Cleared previous round output");
        }

        let items: Vec<(RowIndex, ReviewItem)> = dataset
            .iter()
            .filter(|row| round.is_eligible(row))
            .map(|row| {
                (
                    row.index(),
                    ReviewItem::from_row(&row, &round.inputs, &round.image_inputs),
                )
            })
            .collect();
        report.eligible_rows = items.len();

        if items.is_empty() {
            tracing::info!(%run_id, round = %round.id, "No eligible rows, skipping round");
            self.phase(run_id, round, RoundPhase::Complete);
            report.finish();
            return Ok(report);
        }

        for column in produced {
            dataset.register_column(column);
        }

        self.phase(run_id, round, RoundPhase::Dispatching);
        let mut pending = FuturesUnordered::new();
        for (row, item) in &items {
            let row = *row;
            for (slot, agent) in round.agents.iter().enumerate() {
                let agent = Arc::clone(agent);
                pending.push(async move {
                    let evaluation = agent.evaluate_one(item, None).await;
                    (row, slot, evaluation)
                });
            }
        }
        report.dispatched = pending.len();
        tracing::debug!(
            %run_id,
            round = %round.id,
            rows = items.len(),
            agents = round.agents.len(),
            calls = report.dispatched,
            "Dispatched round"
        );

        self.phase(run_id, round, RoundPhase::Merging);
        let mut round_degraded = Vec::new();
        let mut completed = 0;
        while let Some((row, slot, evaluation)) = pending.next().await {
            let agent = &round.agents[slot];
            for (field, value) in evaluation.output.fields() {
                dataset.set(row, &column_name(&round.id, &agent.name, field), value.clone());
            }
            dataset.set(
                row,
                &output_column(&round.id, &agent.name),
                evaluation.output.to_value(),
            );

            costs.record(&round.id, &agent.name, evaluation.cost);
            report.cost += evaluation.cost;

            match evaluation.error() {
                None => report.succeeded += 1,
                Some(error) => {
                    report.degraded += 1;
                    round_degraded.push((
                        slot,
                        DegradedEntry {
                            row,
                            round: round.id.clone(),
                            agent: agent.name.clone(),
                            error: error.to_string(),
                        },
                    ));
                }
            }

            completed += 1;
            if let Some(hook) = &self.hooks.on_progress {
                hook(Progress {
                    round: Some(round.id.clone()),
                    completed,
                    total: report.dispatched,
                });
            }
        }

        round_degraded.sort_by_key(|(slot, entry)| (entry.row, *slot));
        degraded.extend(round_degraded.into_iter().map(|(_, entry)| entry));

        self.phase(run_id, round, RoundPhase::Complete);
        report.finish();
        Ok(report)
    }

    fn transition(&self, run_id: &RunId, state: &mut RunState, next: RunState) {
        tracing::debug!(%run_id, from = ?state, to = ?next, "Run state change");
        *state = next;
        if let Some(hook) = &self.hooks.on_state_change {
            hook(state);
        }
    }

    fn phase(&self, run_id: &RunId, round: &RoundSpec, phase: RoundPhase) {
        tracing::debug!(%run_id, round = %round.id, ?phase, "Round phase");
    }
}
