//! Review agents: bounded, retrying wrappers around an evaluation capability
//!
//! An [`Agent`] turns one [`ReviewItem`] into a validated [`StructuredOutput`]
//! and its cost. It owns its concurrency ceiling, retry budget, running cost
//! and a bounded interaction log. It knows nothing about rounds or datasets.

use crate::config::{AgentDefaults, RetryPolicy};
use crate::context::AuxContext;
use crate::error::{Error, Result};
use crate::item::ReviewItem;
use crate::llm_client::{EvaluationRequest, EvaluationResponse, LlmClient};
use crate::prompt::PromptConfig;
use crate::shape::{OutputShape, StructuredOutput};
use crate::types::{checked_cost, Progress};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Outcome status of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationStatus {
    /// The capability produced conforming output
    Succeeded,
    /// Retries were exhausted; the output is a sentinel
    Failed {
        /// Last error seen
        error: String,
    },
}

/// Result of evaluating one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Validated output, or the sentinel on failure
    pub output: StructuredOutput,
    /// Incremental cost; zero for sentinels
    pub cost: f64,
    /// Attempts made, including the first
    pub attempts: u32,
    /// Success or failure
    pub status: EvaluationStatus,
}

impl Evaluation {
    /// Whether the output came from the capability
    pub fn is_success(&self) -> bool {
        matches!(self.status, EvaluationStatus::Succeeded)
    }

    /// Error message of a failed evaluation
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            EvaluationStatus::Succeeded => None,
            EvaluationStatus::Failed { error } => Some(error),
        }
    }
}

/// One logged interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Inputs sent
    pub inputs: Vec<(String, Value)>,
    /// Context used, if any
    pub context: Option<String>,
    /// Output received
    pub output: Value,
    /// Cost of the call
    pub cost: f64,
    /// Attempts needed
    pub attempts: u32,
    /// When the evaluation finished
    pub timestamp: DateTime<Utc>,
}

/// One evaluation that exhausted its retries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Inputs sent
    pub inputs: Vec<(String, Value)>,
    /// Last error
    pub error: String,
    /// Attempts made
    pub attempts: u32,
    /// When the evaluation gave up
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct AgentState {
    running_cost: f64,
    interactions: VecDeque<Interaction>,
    log_capacity: usize,
    failures: Vec<FailureRecord>,
}

impl AgentState {
    fn record(&mut self, interaction: Interaction) {
        self.running_cost += interaction.cost;
        if self.interactions.len() == self.log_capacity {
            self.interactions.pop_front();
        }
        self.interactions.push_back(interaction);
    }
}

/// Agent lifecycle hooks
#[derive(Clone, Default)]
pub struct AgentHooks {
    /// Called after every failed attempt with the error and the 1-based attempt number
    pub on_attempt_error: Option<Arc<dyn Fn(&Error, u32) + Send + Sync>>,
    /// Called when an evaluation finishes, successfully or not
    pub on_complete: Option<Arc<dyn Fn(&Evaluation) + Send + Sync>>,
}

impl std::fmt::Debug for AgentHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHooks")
            .field("on_attempt_error", &self.on_attempt_error.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// Review agent
pub struct Agent {
    /// Human-readable name, part of every derived column name
    pub name: String,
    /// Instructions passed with every request
    pub prompt: PromptConfig,
    /// Agent lifecycle hooks
    pub hooks: AgentHooks,
    output_shape: OutputShape,
    context: Option<AuxContext>,
    concurrency_limit: usize,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    permits: Semaphore,
    state: Mutex<AgentState>,
    client: Arc<dyn LlmClient>,
}

impl Agent {
    /// Create a new agent builder
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// Declared output shape
    pub fn output_shape(&self) -> &OutputShape {
        &self.output_shape
    }

    /// Maximum number of in-flight evaluations
    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Retry policy
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Configured auxiliary context
    pub fn aux_context(&self) -> Option<&AuxContext> {
        self.context.as_ref()
    }

    /// Cost accumulated since creation or the last reset
    pub fn running_cost(&self) -> f64 {
        self.state.lock().running_cost
    }

    /// Logged interactions, oldest first
    pub fn interactions(&self) -> Vec<Interaction> {
        self.state.lock().interactions.iter().cloned().collect()
    }

    /// Evaluations that exhausted their retries
    pub fn failures(&self) -> Vec<FailureRecord> {
        self.state.lock().failures.clone()
    }

    /// Clear cost, interaction log and failures. Configuration is untouched.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.running_cost = 0.0;
        state.interactions.clear();
        state.failures.clear();
    }

    /// Evaluate one item.
    ///
    /// `context` overrides the agent's configured auxiliary context. This never
    /// fails: once the retry budget is spent the sentinel output is returned.
    pub async fn evaluate_one(&self, item: &ReviewItem, context: Option<&str>) -> Evaluation {
        let evaluation = match self.permits.acquire().await {
            Ok(_permit) => self.evaluate_with_retries(item, context).await,
            Err(_) => self.give_up(item, &Error::other("agent concurrency gate closed"), 0),
        };

        if let Some(hook) = &self.hooks.on_complete {
            hook(&evaluation);
        }
        evaluation
    }

    /// Evaluate a batch concurrently, bounded by the agent's concurrency limit.
    ///
    /// Results come back in input order. `contexts[i]`, when present, overrides
    /// the context for `items[i]`.
    pub async fn evaluate_many(
        &self,
        items: &[ReviewItem],
        contexts: Option<&[String]>,
    ) -> Vec<Evaluation> {
        self.evaluate_many_with_progress(items, contexts, |_| {}).await
    }

    /// [`Agent::evaluate_many`] reporting progress after each finished item
    pub async fn evaluate_many_with_progress<F>(
        &self,
        items: &[ReviewItem],
        contexts: Option<&[String]>,
        on_progress: F,
    ) -> Vec<Evaluation>
    where
        F: Fn(Progress) + Send + Sync,
    {
        let total = items.len();
        let completed = AtomicUsize::new(0);
        let on_progress = &on_progress;
        let completed = &completed;

        let futures = items.iter().enumerate().map(|(index, item)| {
            let context = contexts.and_then(|c| c.get(index)).map(String::as_str);
            async move {
                let evaluation = self.evaluate_one(item, context).await;
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                on_progress(Progress {
                    round: None,
                    completed: done,
                    total,
                });
                evaluation
            }
        });

        join_all(futures).await
    }

    async fn evaluate_with_retries(&self, item: &ReviewItem, context: Option<&str>) -> Evaluation {
        let max_attempts = self.retry.retry_limit.saturating_add(1);
        let mut resolved_context = context.map(str::to_string);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.attempt(item, &mut resolved_context, attempt).await {
                Ok((output, cost)) => {
                    let interaction = Interaction {
                        inputs: item.inputs.clone(),
                        context: resolved_context,
                        output: output.to_value(),
                        cost,
                        attempts: attempt,
                        timestamp: Utc::now(),
                    };
                    self.state.lock().record(interaction);
                    tracing::debug!(agent = %self.name, attempts = attempt, cost, "evaluation succeeded");
                    return Evaluation {
                        output,
                        cost,
                        attempts: attempt,
                        status: EvaluationStatus::Succeeded,
                    };
                }
                Err(err) => {
                    if let Some(hook) = &self.hooks.on_attempt_error {
                        hook(&err, attempt);
                    }
                    if !err.is_retryable() || attempt >= max_attempts {
                        return self.give_up(item, &err, attempt);
                    }
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        agent = %self.name,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "evaluation attempt failed, retrying"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn attempt(
        &self,
        item: &ReviewItem,
        resolved_context: &mut Option<String>,
        attempt: u32,
    ) -> Result<(StructuredOutput, f64)> {
        // Resolved once per item; a failed lookup is retried with the call.
        if resolved_context.is_none() {
            if let Some(aux) = &self.context {
                let text = aux
                    .resolve(&item.row)
                    .await
                    .map_err(|e| Error::context(e.to_string()))?;
                *resolved_context = Some(text);
            }
        }

        let request = EvaluationRequest {
            agent_name: self.name.clone(),
            prompt: self.prompt.clone(),
            inputs: item.inputs.clone(),
            item_text: item.text(),
            context: resolved_context.clone(),
            images: item.images.clone(),
            output_shape: self.output_shape.clone(),
            attempt,
        };

        let response = self.call(request).await?;
        let cost = checked_cost(response.cost).ok_or_else(|| {
            Error::validation(format!("invalid cost reported: {}", response.cost))
        })?;
        let output = self.output_shape.validate(&response.output)?;
        Ok((output, cost))
    }

    async fn call(&self, request: EvaluationRequest) -> Result<EvaluationResponse> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.client.evaluate(request))
                .await
                .map_err(|_| {
                    Error::Timeout(format!("{} did not answer within {:?}", self.name, limit))
                })?,
            None => self.client.evaluate(request).await,
        }
    }

    fn give_up(&self, item: &ReviewItem, err: &Error, attempts: u32) -> Evaluation {
        let diagnostic = format!("Evaluation failed after {} attempt(s): {}", attempts, err);
        tracing::error!(agent = %self.name, attempts, error = %err, "evaluation failed, writing sentinel");

        self.state.lock().failures.push(FailureRecord {
            inputs: item.inputs.clone(),
            error: err.to_string(),
            attempts,
            timestamp: Utc::now(),
        });

        Evaluation {
            output: self.output_shape.sentinel(diagnostic),
            cost: 0.0,
            attempts,
            status: EvaluationStatus::Failed {
                error: err.to_string(),
            },
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("client", &self.client.client_type())
            .field("output_shape", &self.output_shape)
            .field("concurrency_limit", &self.concurrency_limit)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Agent builder
pub struct AgentBuilder {
    name: Option<String>,
    prompt: PromptConfig,
    output_shape: Option<OutputShape>,
    context: Option<AuxContext>,
    concurrency_limit: usize,
    retry: RetryPolicy,
    timeout: Option<Duration>,
    log_capacity: usize,
    hooks: AgentHooks,
    client: Option<Arc<dyn LlmClient>>,
}

impl AgentBuilder {
    /// Create a new agent builder
    pub fn new() -> Self {
        Self::with_defaults(&AgentDefaults::default())
    }

    /// Create a builder seeded from configured defaults
    pub fn with_defaults(defaults: &AgentDefaults) -> Self {
        Self {
            name: None,
            prompt: PromptConfig::default(),
            output_shape: None,
            context: None,
            concurrency_limit: defaults.concurrency_limit,
            retry: defaults.retry,
            timeout: defaults.timeout(),
            log_capacity: defaults.log_capacity,
            hooks: AgentHooks::default(),
            client: None,
        }
    }

    /// Set the agent name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the prompt configuration
    pub fn prompt(mut self, prompt: PromptConfig) -> Self {
        self.prompt = prompt;
        self
    }

    /// Set the output shape
    pub fn output_shape(mut self, shape: OutputShape) -> Self {
        self.output_shape = Some(shape);
        self
    }

    /// Set the auxiliary context
    pub fn context(mut self, context: AuxContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Set the maximum number of in-flight evaluations
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Set the retry budget, keeping the configured delays
    pub fn retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry.retry_limit = retry_limit;
        self
    }

    /// Set the full retry policy
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the per-attempt timeout; `None` disables it
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of interactions kept in the log
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Set the hooks
    pub fn hooks(mut self, hooks: AgentHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the evaluation capability
    pub fn client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Build the agent
    pub fn build(self) -> Result<Agent> {
        let name = self.name.ok_or_else(|| Error::config("Agent name is required"))?;
        if name.trim().is_empty() {
            return Err(Error::config("Agent name must not be blank"));
        }
        let output_shape = self
            .output_shape
            .ok_or_else(|| Error::config(format!("Agent '{}' needs an output shape", name)))?;
        let client = self
            .client
            .ok_or_else(|| Error::config(format!("Agent '{}' needs an LLM client", name)))?;
        if self.concurrency_limit == 0 {
            return Err(Error::config(format!(
                "Agent '{}' concurrency limit must be at least 1",
                name
            )));
        }
        if self.log_capacity == 0 {
            return Err(Error::config(format!(
                "Agent '{}' log capacity must be at least 1",
                name
            )));
        }

        Ok(Agent {
            name,
            prompt: self.prompt,
            hooks: self.hooks,
            output_shape,
            context: self.context,
            concurrency_limit: self.concurrency_limit,
            retry: self.retry,
            timeout: self.timeout,
            permits: Semaphore::new(self.concurrency_limit),
            state: Mutex::new(AgentState {
                running_cost: 0.0,
                interactions: VecDeque::new(),
                log_capacity: self.log_capacity,
                failures: Vec::new(),
            }),
            client,
        })
    }
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::FnResolver;
    use crate::dataset::Row;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;

    // Fails the first `failures` calls, then answers with a fixed score
    struct FlakyClient {
        failures: u32,
        calls: AtomicU32,
        score: i64,
        cost: f64,
    }

    impl FlakyClient {
        fn new(failures: u32, score: i64) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                score,
                cost: 0.25,
            }
        }
    }

    #[async_trait]
    impl LlmClient for FlakyClient {
        async fn evaluate(&self, _request: EvaluationRequest) -> Result<EvaluationResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                return Err(Error::transport(format!("call {} refused", n)));
            }
            Ok(EvaluationResponse::new(
                json!({"reasoning": "matches inclusion criteria", "score": self.score}),
                self.cost,
            ))
        }

        fn client_type(&self) -> &str {
            "flaky"
        }
    }

    // Tracks how many calls are in flight at once
    struct CountingClient {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for CountingClient {
        async fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResponse> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let index = request.inputs[0].1.as_i64().unwrap_or_default();
            Ok(EvaluationResponse::new(
                json!({"reasoning": format!("item {}", index), "score": 1}),
                0.0,
            ))
        }

        fn client_type(&self) -> &str {
            "counting"
        }
    }

    // Echoes the context it received
    struct ContextEcho;

    #[async_trait]
    impl LlmClient for ContextEcho {
        async fn evaluate(&self, request: EvaluationRequest) -> Result<EvaluationResponse> {
            Ok(EvaluationResponse::new(
                json!({"reasoning": request.context.unwrap_or_default(), "score": 1}),
                0.1,
            ))
        }

        fn client_type(&self) -> &str {
            "echo"
        }
    }

    fn scoring_agent(client: Arc<dyn LlmClient>, retry_limit: u32) -> Agent {
        Agent::builder()
            .name("Scorer")
            .output_shape(OutputShape::scoring(&[1, 2, 3, 4, 5]))
            .retry_policy(RetryPolicy::immediate(retry_limit))
            .client(client)
            .build()
            .unwrap()
    }

    fn item(title: &str) -> ReviewItem {
        ReviewItem::new([("title", json!(title))])
    }

    #[tokio::test]
    async fn test_succeeds_on_last_allowed_attempt() {
        let client = Arc::new(FlakyClient::new(2, 4));
        let agent = scoring_agent(client.clone(), 2);

        let evaluation = agent.evaluate_one(&item("Sepsis"), None).await;
        assert!(evaluation.is_success());
        assert_eq!(evaluation.attempts, 3);
        assert_eq!(evaluation.output.get("score"), Some(&json!(4)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
        assert!((agent.running_cost() - 0.25).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_sentinel() {
        let client = Arc::new(FlakyClient::new(3, 4));
        let agent = scoring_agent(client.clone(), 2);

        let evaluation = agent.evaluate_one(&item("Sepsis"), None).await;
        assert!(!evaluation.is_success());
        assert_eq!(evaluation.attempts, 3);
        assert_eq!(evaluation.cost, 0.0);
        assert_eq!(evaluation.output.get("score"), Some(&Value::Null));
        let reasoning = evaluation.output.get("reasoning").and_then(Value::as_str).unwrap();
        assert!(reasoning.contains("call 3 refused"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 3);
        assert_eq!(agent.failures().len(), 1);
        assert_eq!(agent.running_cost(), 0.0);
    }

    #[tokio::test]
    async fn test_out_of_range_output_is_retried() {
        // Score 9 is outside the allowed set on every attempt
        let client = Arc::new(FlakyClient::new(0, 9));
        let agent = scoring_agent(client.clone(), 1);

        let evaluation = agent.evaluate_one(&item("Sepsis"), None).await;
        assert!(!evaluation.is_success());
        assert!(evaluation.error().unwrap().contains("not one of"));
        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrency_limit_respected() {
        let client = Arc::new(CountingClient {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let agent = Agent::builder()
            .name("Counter")
            .output_shape(OutputShape::scoring(&[1]))
            .concurrency_limit(3)
            .client(client.clone())
            .build()
            .unwrap();

        let items: Vec<_> = (0..25).map(|i| ReviewItem::new([("n", json!(i))])).collect();
        let progress = Mutex::new(Vec::new());
        let results = agent
            .evaluate_many_with_progress(&items, None, |p| progress.lock().push(p.completed))
            .await;

        assert!(client.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(results.len(), 25);
        for (i, evaluation) in results.iter().enumerate() {
            assert_eq!(
                evaluation.output.get("reasoning"),
                Some(&json!(format!("item {}", i)))
            );
        }
        let mut seen = progress.into_inner();
        seen.sort_unstable();
        assert_eq!(seen, (1..=25).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_context_resolution_and_override() {
        let resolver = FnResolver(|row: Row| async move {
            Ok::<_, Error>(format!(
                "background for {}",
                row.get("title").and_then(Value::as_str).unwrap_or_default()
            ))
        });
        let agent = Agent::builder()
            .name("Contextual")
            .output_shape(OutputShape::scoring(&[1]))
            .context(AuxContext::resolver(Arc::new(resolver)))
            .client(Arc::new(ContextEcho))
            .build()
            .unwrap();

        let items = vec![item("Sepsis"), item("Stroke")];
        let overrides = vec!["explicit".to_string()];
        let results = agent.evaluate_many(&items, Some(&overrides)).await;

        assert_eq!(results[0].output.get("reasoning"), Some(&json!("explicit")));
        assert_eq!(
            results[1].output.get("reasoning"),
            Some(&json!("background for Stroke"))
        );
        assert_eq!(agent.interactions().len(), 2);
    }

    #[tokio::test]
    async fn test_log_is_bounded_and_reset_clears_state() {
        let agent = Agent::builder()
            .name("Bounded")
            .output_shape(OutputShape::scoring(&[1]))
            .log_capacity(2)
            .client(Arc::new(ContextEcho))
            .build()
            .unwrap();

        let items: Vec<_> = (0..5).map(|i| item(&format!("t{}", i))).collect();
        agent.evaluate_many(&items, None).await;
        assert_eq!(agent.interactions().len(), 2);
        assert!((agent.running_cost() - 0.5).abs() < 1e-9);

        agent.reset();
        assert!(agent.interactions().is_empty());
        assert_eq!(agent.running_cost(), 0.0);
        assert_eq!(agent.concurrency_limit(), AgentDefaults::default().concurrency_limit);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failed_attempt() {
        struct Slow;

        #[async_trait]
        impl LlmClient for Slow {
            async fn evaluate(&self, _request: EvaluationRequest) -> Result<EvaluationResponse> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(EvaluationResponse::new(json!({}), 0.0))
            }

            fn client_type(&self) -> &str {
                "slow"
            }
        }

        let attempts = Arc::new(AtomicU32::new(0));
        let seen = attempts.clone();
        let agent = Agent::builder()
            .name("Impatient")
            .output_shape(OutputShape::scoring(&[1]))
            .retry_policy(RetryPolicy::immediate(1))
            .timeout(Some(Duration::from_millis(10)))
            .hooks(AgentHooks {
                on_attempt_error: Some(Arc::new(move |err: &Error, _attempt: u32| {
                    assert!(matches!(err, Error::Timeout(_)));
                    seen.fetch_add(1, Ordering::SeqCst);
                })),
                on_complete: None,
            })
            .client(Arc::new(Slow))
            .build()
            .unwrap();

        let evaluation = agent.evaluate_one(&item("Sepsis"), None).await;
        assert!(!evaluation.is_success());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_builder_requires_name_shape_and_client() {
        assert!(Agent::builder().build().is_err());
        assert!(Agent::builder().name("X").build().is_err());
        assert!(Agent::builder()
            .name("X")
            .output_shape(OutputShape::title_abstract())
            .build()
            .is_err());
        assert!(Agent::builder()
            .name("X")
            .output_shape(OutputShape::title_abstract())
            .client(Arc::new(ContextEcho))
            .concurrency_limit(0)
            .build()
            .is_err());
    }
}
