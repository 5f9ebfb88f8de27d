// src/core/arbitrator.rs — Stop/continue decision

use super::types::{Evaluation, StopReason, Verdict};

/// Decide whether to stop refining.
///
/// `iteration` is the number of optimization rounds already completed. The
/// score check runs first; the iteration cap is a hard ceiling regardless of
/// score trend. Same arguments always give the same verdict.
pub fn arbitrate(
    overall_score: f64,
    iteration: u32,
    max_iterations: u32,
    excellent_score: f64,
) -> Verdict {
    if overall_score >= excellent_score {
        Verdict::Stop(StopReason::ExcellentScore)
    } else if iteration >= max_iterations {
        Verdict::Stop(StopReason::IterationLimit)
    } else {
        Verdict::Continue
    }
}

/// The configured thresholds, bound once at INIT.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArbitrationPolicy {
    pub max_iterations: u32,
    pub excellent_score: f64,
}

impl ArbitrationPolicy {
    pub fn decide(&self, evaluation: &Evaluation, iteration: u32) -> Verdict {
        arbitrate(
            evaluation.overall_score,
            iteration,
            self.max_iterations,
            self.excellent_score,
        )
    }
}
