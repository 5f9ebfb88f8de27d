// src/core/orchestrator.rs — Proposal refinement state machine
//
// INIT → GENERATE → EVALUATE → ARBITRATE → { OPTIMIZE → EVALUATE | DONE }

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::arbitrator::ArbitrationPolicy;
use super::state::{check_histories, save_snapshot};
use super::types::*;
use crate::agents::{AgentFactory, AgentSet, Optimizer, Proposer};
use crate::evaluator::aggregator::{AggregationPolicy, MAX_SCORE};
use crate::evaluator::EvaluatorPanel;
use crate::infra::config::{Config, ModelsConfig};
use crate::infra::errors::{Capability, ProposerError, Result};
use crate::provider::roles::ModelRoles;

/// Everything that shapes one run, parsed and checked before any call.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub models: ModelsConfig,
    pub max_iterations: u32,
    pub excellent_score: f64,
    pub dimensions: Vec<Dimension>,
    pub dimension_weights: Option<BTreeMap<Dimension, f64>>,
    pub tolerate_failures: bool,
    pub call_timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        let workflow = crate::infra::config::WorkflowConfig::default();
        Self {
            models: ModelsConfig::default(),
            max_iterations: workflow.max_iterations,
            excellent_score: workflow.excellent_score,
            dimensions: Dimension::ALL.to_vec(),
            dimension_weights: None,
            tolerate_failures: false,
            call_timeout: Duration::from_secs(workflow.call_timeout_secs),
        }
    }
}

impl RunConfig {
    /// Convert the file configuration, rejecting unknown dimension tags.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut dimensions = Vec::with_capacity(config.evaluation.dimensions.len());
        for tag in &config.evaluation.dimensions {
            let dim: Dimension = tag.parse()?;
            if dimensions.contains(&dim) {
                return Err(ProposerError::Configuration(format!(
                    "dimension '{}' listed twice",
                    dim
                )));
            }
            dimensions.push(dim);
        }
        dimensions.sort();

        let dimension_weights = match &config.evaluation.dimension_weights {
            Some(raw) => {
                let mut weights = BTreeMap::new();
                for (tag, weight) in raw {
                    weights.insert(tag.parse::<Dimension>()?, *weight);
                }
                Some(weights)
            }
            None => None,
        };

        Ok(Self {
            models: config.models.clone(),
            max_iterations: config.workflow.max_iterations,
            excellent_score: config.workflow.excellent_score,
            dimensions,
            dimension_weights,
            tolerate_failures: config.evaluation.tolerate_failures,
            call_timeout: Duration::from_secs(config.workflow.call_timeout_secs),
        })
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(ProposerError::Configuration(msg));

        if self.dimensions.is_empty() {
            return bad("no evaluation dimensions enabled".into());
        }
        if !self.excellent_score.is_finite() || !(0.0..=MAX_SCORE).contains(&self.excellent_score)
        {
            return bad(format!(
                "excellent_score {} must be within [0, {}]",
                self.excellent_score, MAX_SCORE
            ));
        }
        if self.call_timeout.is_zero() {
            return bad("call timeout must be greater than zero".into());
        }
        if let Some(weights) = &self.dimension_weights {
            for (dim, w) in weights {
                if !w.is_finite() || *w < 0.0 {
                    return bad(format!("weight {} for '{}' must be a non-negative number", w, dim));
                }
                if !self.dimensions.contains(dim) {
                    return bad(format!("weight given for inactive dimension '{}'", dim));
                }
            }
            let total = self.aggregation_policy().active_weight(&self.dimensions);
            if total <= 0.0 {
                return bad("weights of the active dimensions sum to zero".into());
            }
        }
        Ok(())
    }

    fn aggregation_policy(&self) -> AggregationPolicy {
        AggregationPolicy {
            weights: self.dimension_weights.clone(),
            tolerate_failures: self.tolerate_failures,
        }
    }

    fn arbitration_policy(&self) -> ArbitrationPolicy {
        ArbitrationPolicy {
            max_iterations: self.max_iterations,
            excellent_score: self.excellent_score,
        }
    }
}

/// Answer from a human (or any other) reviewer after a CONTINUE verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Proceed,
    Stop,
    /// The reviewer could not answer; the run ends cancelled.
    Cancel,
}

/// Consulted before each optimization round. Can only end a run early.
#[async_trait]
pub trait ReviewGate: Send + Sync {
    async fn review(&self, proposal: &Proposal, evaluation: &Evaluation) -> ReviewDecision;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Generate,
    Evaluate,
    Arbitrate,
    Optimize,
    Done,
}

impl Phase {
    /// Where a run picks up, judged from its histories.
    fn resume_point(state: &WorkflowState) -> Self {
        if state.is_done() {
            Phase::Done
        } else if state.proposals.is_empty() {
            Phase::Generate
        } else if state.evaluations.len() < state.proposals.len() {
            Phase::Evaluate
        } else {
            Phase::Arbitrate
        }
    }
}

/// Drives generate → evaluate → arbitrate → optimize until arbitration,
/// review, cancellation or a fatal error ends the run.
pub struct Orchestrator {
    proposer: Arc<dyn Proposer>,
    optimizer: Arc<dyn Optimizer>,
    panel: EvaluatorPanel,
    arbitration: ArbitrationPolicy,
    roles: ModelRoles,
    call_timeout: Duration,
    cancel: CancellationToken,
    snapshot_path: Option<PathBuf>,
    review_gate: Option<Arc<dyn ReviewGate>>,
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

impl Orchestrator {
    /// INIT: validate configuration, resolve models once and build the agents.
    ///
    /// Fails with `Configuration` before any capability is called.
    pub fn new(config: RunConfig, factory: &dyn AgentFactory) -> Result<Self> {
        config.validate()?;

        let roles = ModelRoles::from_config(&config.models);
        roles.validate(&factory.supported_models())?;

        let agents = AgentSet::build(factory, &roles, &config.dimensions)?;
        tracing::info!(
            proposer = %roles.proposer,
            critic = %roles.critic,
            optimizer = %roles.optimizer,
            dimensions = agents.critics.len(),
            max_iterations = config.max_iterations,
            excellent_score = config.excellent_score,
            "Workflow initialized"
        );

        Ok(Self {
            proposer: agents.proposer,
            optimizer: agents.optimizer,
            panel: EvaluatorPanel::new(
                agents.critics,
                config.aggregation_policy(),
                config.call_timeout,
            ),
            arbitration: config.arbitration_policy(),
            roles,
            call_timeout: config.call_timeout,
            cancel: CancellationToken::new(),
            snapshot_path: None,
            review_gate: None,
            on_progress: None,
        })
    }

    /// Set a callback for real-time progress events.
    pub fn with_progress(mut self, cb: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    /// Write the run state to `path` after every phase.
    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn with_review_gate(mut self, gate: Arc<dyn ReviewGate>) -> Self {
        self.review_gate = Some(gate);
        self
    }

    /// Share a cancellation token with the caller (e.g. a Ctrl-C handler).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn roles(&self) -> &ModelRoles {
        &self.roles
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Non-fatal: a failed write is logged and the run carries on.
    fn persist(&self, state: &WorkflowState) {
        let Some(ref path) = self.snapshot_path else {
            return;
        };
        if let Err(e) = save_snapshot(state, path) {
            tracing::warn!("Failed to write snapshot {}: {}", path.display(), e);
        }
    }

    /// Run a fresh workflow for `input`.
    ///
    /// Only invalid input is returned as `Err`. Every runtime outcome,
    /// failures included, comes back as a DONE state whose `termination`
    /// says why.
    pub async fn run(&self, input: ProposalInput) -> Result<WorkflowState> {
        self.start(WorkflowState::new(input)).await
    }

    /// Like `run`, for callers that need the run id (e.g. to name the
    /// snapshot) before the first call.
    pub async fn start(&self, state: WorkflowState) -> Result<WorkflowState> {
        state.input.validate()?;
        tracing::info!(run_id = %state.id, "Starting workflow: {}", state.input.text);
        Ok(self.drive(state).await)
    }

    /// Continue a snapshot from the phase its histories imply. A finished
    /// state comes back untouched; histories that do not line up are
    /// rejected as `InvalidInput`.
    pub async fn resume(&self, state: WorkflowState) -> Result<WorkflowState> {
        check_histories(&state)?;
        if state.is_done() {
            return Ok(state);
        }
        state.input.validate()?;
        tracing::info!(
            run_id = %state.id,
            proposals = state.proposals.len(),
            evaluations = state.evaluations.len(),
            "Resuming workflow"
        );
        Ok(self.drive(state).await)
    }

    async fn drive(&self, mut state: WorkflowState) -> WorkflowState {
        let mut phase = Phase::resume_point(&state);

        while phase != Phase::Done {
            phase = if self.cancel.is_cancelled() {
                self.cancelled(&mut state);
                Phase::Done
            } else {
                match phase {
                    Phase::Generate => self.generate(&mut state).await,
                    Phase::Evaluate => self.evaluate(&mut state).await,
                    Phase::Arbitrate => self.arbitrate(&mut state).await,
                    Phase::Optimize => self.optimize(&mut state).await,
                    Phase::Done => Phase::Done,
                }
            };
            self.persist(&state);
        }

        if let Some(termination) = state.termination.clone() {
            tracing::info!(
                run_id = %state.id,
                iterations = state.iteration,
                "Workflow finished: {}",
                termination
            );
            self.emit(ProgressEvent::Complete {
                iterations: state.iteration,
                final_score: state.latest_evaluation().map(|e| e.overall_score),
                termination,
            });
        }
        state
    }

    /// Race one capability call against the timeout and the cancel token.
    async fn call<T>(
        &self,
        capability: Capability,
        fut: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ProposerError::Cancelled),
            r = tokio::time::timeout(self.call_timeout, fut) => match r {
                Ok(Ok(v)) => Ok(v),
                Ok(Err(e)) => Err(e.into_adapter(capability)),
                Err(_) => Err(ProposerError::Timeout {
                    capability,
                    after_ms: self.call_timeout.as_millis() as u64,
                }),
            },
        }
    }

    async fn generate(&self, state: &mut WorkflowState) -> Phase {
        let result = self
            .call(Capability::Proposer, self.proposer.generate(&state.input))
            .await;
        match result {
            Ok(content) => {
                tracing::info!("Initial proposal generated ({} chars)", content.len());
                self.emit(ProgressEvent::Generated {
                    chars: content.len(),
                });
                state.proposals.push(Proposal::new(content, 0));
                state.iteration = 0;
                Phase::Evaluate
            }
            Err(e) => self.fail(state, FailureKind::Proposer, e),
        }
    }

    async fn evaluate(&self, state: &mut WorkflowState) -> Phase {
        let Some(proposal) = state.current_proposal() else {
            return Phase::Generate;
        };
        match self.panel.evaluate(proposal, &state.input, &self.cancel).await {
            Ok(evaluation) => {
                if evaluation.is_degraded() {
                    tracing::warn!(
                        iteration = state.iteration,
                        failed = evaluation.failures.len(),
                        "Evaluation degraded, scored {:.1} on the remaining dimensions",
                        evaluation.overall_score
                    );
                } else {
                    tracing::info!(
                        iteration = state.iteration,
                        "Evaluation score {:.1}",
                        evaluation.overall_score
                    );
                }
                self.emit(ProgressEvent::EvaluationReady {
                    iteration: state.iteration,
                    score: evaluation.overall_score,
                    degraded: evaluation.is_degraded(),
                });
                state.evaluations.push(evaluation);
                Phase::Arbitrate
            }
            Err(e) => {
                let kind = if e.is_adapter_failure() {
                    FailureKind::Evaluation
                } else {
                    FailureKind::Aggregation
                };
                self.fail(state, kind, e)
            }
        }
    }

    async fn arbitrate(&self, state: &mut WorkflowState) -> Phase {
        let Some(evaluation) = state.latest_evaluation() else {
            return Phase::Evaluate;
        };
        let score = evaluation.overall_score;
        let verdict = self.arbitration.decide(evaluation, state.iteration);
        tracing::info!(iteration = state.iteration, score, "Arbitration: {}", verdict);
        self.emit(ProgressEvent::Arbitrated {
            iteration: state.iteration,
            verdict,
        });

        match verdict {
            Verdict::Stop(StopReason::ExcellentScore) => {
                state.finish(Termination::Accepted { score });
                Phase::Done
            }
            Verdict::Stop(StopReason::IterationLimit) => {
                state.finish(Termination::IterationLimit { score });
                Phase::Done
            }
            Verdict::Continue => self.review(state).await,
        }
    }

    async fn review(&self, state: &mut WorkflowState) -> Phase {
        let Some(ref gate) = self.review_gate else {
            return Phase::Optimize;
        };
        let (Some(proposal), Some(evaluation)) =
            (state.current_proposal(), state.latest_evaluation())
        else {
            return Phase::Optimize;
        };

        let decision = tokio::select! {
            _ = self.cancel.cancelled() => None,
            d = gate.review(proposal, evaluation) => Some(d),
        };
        match decision {
            Some(ReviewDecision::Proceed) => Phase::Optimize,
            Some(ReviewDecision::Stop) => {
                tracing::info!(iteration = state.iteration, "Reviewer stopped the run");
                state.finish(Termination::ReviewerStopped);
                Phase::Done
            }
            Some(ReviewDecision::Cancel) | None => {
                self.cancelled(state);
                Phase::Done
            }
        }
    }

    async fn optimize(&self, state: &mut WorkflowState) -> Phase {
        let (Some(proposal), Some(evaluation)) =
            (state.current_proposal(), state.latest_evaluation())
        else {
            return Phase::Arbitrate;
        };
        let next = proposal.iteration + 1;
        let result = self
            .call(
                Capability::Optimizer,
                self.optimizer.optimize(proposal, evaluation, &state.input),
            )
            .await;

        match result {
            Ok(content) => {
                tracing::info!(iteration = next, "Proposal revised ({} chars)", content.len());
                self.emit(ProgressEvent::Optimized {
                    iteration: next,
                    chars: content.len(),
                });
                state.proposals.push(Proposal::new(content, next));
                state.iteration = next;
                Phase::Evaluate
            }
            Err(e) => self.fail(state, FailureKind::Optimizer, e),
        }
    }

    fn cancelled(&self, state: &mut WorkflowState) {
        tracing::warn!(run_id = %state.id, "Workflow cancelled");
        state.finish(Termination::Cancelled);
    }

    fn fail(&self, state: &mut WorkflowState, kind: FailureKind, error: ProposerError) -> Phase {
        if matches!(error, ProposerError::Cancelled) {
            self.cancelled(state);
        } else {
            tracing::error!(run_id = %state.id, "{} failed: {}", kind, error);
            state.finish(Termination::Failed {
                kind,
                message: error.to_string(),
            });
        }
        Phase::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(f: impl FnOnce(&mut Config)) -> Config {
        let mut c = Config::default();
        f(&mut c);
        c
    }

    #[test]
    fn test_default_run_config_is_valid() {
        let rc = RunConfig::default();
        assert!(rc.validate().is_ok());
        assert_eq!(rc.dimensions, Dimension::ALL.to_vec());
        assert_eq!(rc.max_iterations, 3);
        assert_eq!(rc.excellent_score, 8.5);
    }

    #[test]
    fn test_from_config_parses_and_orders_dimensions() {
        let cfg = config_with(|c| {
            c.evaluation.dimensions = vec!["feasibility".into(), "Logic".into()];
        });
        let rc = RunConfig::from_config(&cfg).unwrap();
        assert_eq!(rc.dimensions, vec![Dimension::Logic, Dimension::Feasibility]);
    }

    #[test]
    fn test_unknown_dimension_tag_rejected() {
        let cfg = config_with(|c| c.evaluation.dimensions = vec!["clarity".into()]);
        assert!(matches!(
            RunConfig::from_config(&cfg).unwrap_err(),
            ProposerError::Configuration(_)
        ));
    }

    #[test]
    fn test_duplicate_dimension_rejected() {
        let cfg = config_with(|c| {
            c.evaluation.dimensions = vec!["logic".into(), "logic".into()];
        });
        assert!(RunConfig::from_config(&cfg).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases: Vec<Box<dyn Fn(&mut RunConfig)>> = vec![
            Box::new(|rc| rc.dimensions.clear()),
            Box::new(|rc| rc.excellent_score = 11.0),
            Box::new(|rc| rc.excellent_score = f64::NAN),
            Box::new(|rc| rc.call_timeout = Duration::ZERO),
            Box::new(|rc| {
                rc.dimension_weights = Some(BTreeMap::from([(Dimension::Logic, -1.0)]))
            }),
            Box::new(|rc| {
                rc.dimension_weights = Some(
                    Dimension::ALL.iter().map(|d| (*d, 0.0)).collect(),
                )
            }),
            Box::new(|rc| {
                rc.dimensions = vec![Dimension::Logic];
                rc.dimension_weights = Some(BTreeMap::from([(Dimension::Innovation, 2.0)]));
            }),
        ];
        for (i, mutate) in cases.iter().enumerate() {
            let mut rc = RunConfig::default();
            mutate(&mut rc);
            assert!(
                matches!(rc.validate(), Err(ProposerError::Configuration(_))),
                "case {} should be rejected",
                i
            );
        }
    }

    #[test]
    fn test_partial_weights_are_valid() {
        let mut rc = RunConfig::default();
        rc.dimension_weights = Some(BTreeMap::from([(Dimension::Logic, 0.0)]));
        assert!(rc.validate().is_ok());
    }

    #[test]
    fn test_resume_point() {
        let mut state = WorkflowState::new(ProposalInput::new("x"));
        assert_eq!(Phase::resume_point(&state), Phase::Generate);

        state.proposals.push(Proposal::new("v0", 0));
        assert_eq!(Phase::resume_point(&state), Phase::Evaluate);

        state.evaluations.push(Evaluation {
            overall_score: 5.0,
            dimensions: BTreeMap::new(),
            suggestions: vec![],
            failures: vec![],
        });
        assert_eq!(Phase::resume_point(&state), Phase::Arbitrate);

        state.finish(Termination::Cancelled);
        assert_eq!(Phase::resume_point(&state), Phase::Done);
    }
}
