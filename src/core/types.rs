// src/core/types.rs — Core domain types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A restriction supplied by the caller, e.g. `budget: <=5000`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(alias = "type")]
    pub kind: String,
    pub value: String,
}

impl Constraint {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.value)
    }
}

/// The problem statement. Created once by the caller and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalInput {
    #[serde(alias = "input")]
    pub text: String,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub goals: Vec<String>,
}

impl ProposalInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            constraints: Vec::new(),
            goals: Vec::new(),
        }
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goals.push(goal.into());
        self
    }

    pub fn with_constraint(mut self, kind: impl Into<String>, value: impl Into<String>) -> Self {
        self.constraints.push(Constraint::new(kind, value));
        self
    }

    /// Reject inputs no capability can work with.
    pub fn validate(&self) -> crate::infra::errors::Result<()> {
        use crate::infra::errors::ProposerError;

        if self.text.trim().is_empty() {
            return Err(ProposerError::InvalidInput(
                "problem statement is empty".into(),
            ));
        }
        if let Some(idx) = self.constraints.iter().position(|c| c.kind.trim().is_empty()) {
            return Err(ProposerError::InvalidInput(format!(
                "constraint #{} has no kind",
                idx + 1
            )));
        }
        Ok(())
    }
}

/// One candidate artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub content: String,
    pub iteration: u32,
}

impl Proposal {
    pub fn new(content: impl Into<String>, iteration: u32) -> Self {
        Self {
            content: content.into(),
            iteration,
        }
    }
}

/// Evaluation axes. Declaration order is the canonical aggregation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Logic,
    Completeness,
    Innovation,
    Feasibility,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Logic,
        Dimension::Completeness,
        Dimension::Innovation,
        Dimension::Feasibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Logic => "logic",
            Dimension::Completeness => "completeness",
            Dimension::Innovation => "innovation",
            Dimension::Feasibility => "feasibility",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dimension {
    type Err = crate::infra::errors::ProposerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logic" => Ok(Dimension::Logic),
            "completeness" => Ok(Dimension::Completeness),
            "innovation" => Ok(Dimension::Innovation),
            "feasibility" => Ok(Dimension::Feasibility),
            other => Err(crate::infra::errors::ProposerError::Configuration(format!(
                "unsupported dimension '{}'",
                other
            ))),
        }
    }
}

/// Score and feedback for one dimension of one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionResult {
    pub dimension: Dimension,
    /// 0.0–10.0
    pub score: f64,
    /// The critic's written rationale, if it gave one.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub feedback: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl DimensionResult {
    pub fn new(dimension: Dimension, score: f64) -> Self {
        Self {
            dimension,
            score,
            feedback: String::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }
}

/// A dimension whose evaluator failed or never reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionFailure {
    pub dimension: Dimension,
    pub reason: String,
}

/// What one evaluator produced during a fan-out.
pub type DimensionOutcome = Result<DimensionResult, DimensionFailure>;

/// Aggregated scoring record for one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub overall_score: f64,
    pub dimensions: BTreeMap<Dimension, DimensionResult>,
    pub suggestions: Vec<String>,
    /// Non-empty only when aggregation tolerated failed dimensions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DimensionFailure>,
}

impl Evaluation {
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Arbitration outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Continue,
    Stop(StopReason),
}

impl Verdict {
    pub fn is_stop(&self) -> bool {
        matches!(self, Verdict::Stop(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    ExcellentScore,
    IterationLimit,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Continue => write!(f, "continue"),
            Verdict::Stop(StopReason::ExcellentScore) => write!(f, "stop (excellent)"),
            Verdict::Stop(StopReason::IterationLimit) => write!(f, "stop (limit)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Running,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Proposer,
    Evaluation,
    Aggregation,
    Optimizer,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Proposer => write!(f, "proposer"),
            FailureKind::Evaluation => write!(f, "evaluation"),
            FailureKind::Aggregation => write!(f, "aggregation"),
            FailureKind::Optimizer => write!(f, "optimizer"),
        }
    }
}

/// Why a run reached DONE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    Accepted { score: f64 },
    IterationLimit { score: f64 },
    ReviewerStopped,
    Cancelled,
    Failed { kind: FailureKind, message: String },
}

impl Termination {
    /// True when the run ended through arbitration or review, not an error.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Termination::Accepted { .. }
                | Termination::IterationLimit { .. }
                | Termination::ReviewerStopped
        )
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Accepted { score } => write!(f, "accepted (score {:.1})", score),
            Termination::IterationLimit { score } => {
                write!(f, "iteration limit reached (score {:.1})", score)
            }
            Termination::ReviewerStopped => write!(f, "stopped by reviewer"),
            Termination::Cancelled => write!(f, "cancelled"),
            Termination::Failed { kind, message } => write!(f, "{} failed: {}", kind, message),
        }
    }
}

/// The mutable run record. Holds no capability instances, so it always
/// serializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub input: ProposalInput,
    pub proposals: Vec<Proposal>,
    pub evaluations: Vec<Evaluation>,
    pub iteration: u32,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub termination: Option<Termination>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new(input: ProposalInput) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            input,
            proposals: Vec::new(),
            evaluations: Vec::new(),
            iteration: 0,
            status: WorkflowStatus::Running,
            termination: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn current_proposal(&self) -> Option<&Proposal> {
        self.proposals.last()
    }

    pub fn latest_evaluation(&self) -> Option<&Evaluation> {
        self.evaluations.last()
    }

    pub fn is_done(&self) -> bool {
        self.status == WorkflowStatus::Done
    }

    /// Number of optimization rounds actually executed.
    pub fn optimization_rounds(&self) -> u32 {
        self.proposals.len().saturating_sub(1) as u32
    }

    /// RUNNING → DONE. Later calls are ignored so the first reason sticks.
    pub(crate) fn finish(&mut self, termination: Termination) {
        if self.is_done() {
            return;
        }
        self.status = WorkflowStatus::Done;
        self.termination = Some(termination);
        self.finished_at = Some(Utc::now());
    }
}

/// Progress events emitted by the orchestrator at phase transitions.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Generated {
        chars: usize,
    },
    EvaluationReady {
        iteration: u32,
        score: f64,
        degraded: bool,
    },
    Arbitrated {
        iteration: u32,
        verdict: Verdict,
    },
    Optimized {
        iteration: u32,
        chars: usize,
    },
    Complete {
        iterations: u32,
        final_score: Option<f64>,
        termination: Termination,
    },
}
