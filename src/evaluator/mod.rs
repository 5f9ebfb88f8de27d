// src/evaluator/mod.rs — Parallel multi-dimension evaluation

pub mod aggregator;
pub mod parser;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::agents::DimensionEvaluator;
use crate::core::types::{
    Dimension, DimensionFailure, DimensionOutcome, DimensionResult, Evaluation, Proposal,
    ProposalInput,
};
use crate::infra::errors::{Capability, ProposerError, Result};
use aggregator::{aggregate, AggregationPolicy};

/// The set of active critics plus the policy that combines them.
pub struct EvaluatorPanel {
    critics: Vec<(Dimension, Arc<dyn DimensionEvaluator>)>,
    policy: AggregationPolicy,
    call_timeout: Duration,
}

impl EvaluatorPanel {
    pub fn new(
        critics: Vec<(Dimension, Arc<dyn DimensionEvaluator>)>,
        policy: AggregationPolicy,
        call_timeout: Duration,
    ) -> Self {
        Self {
            critics,
            policy,
            call_timeout,
        }
    }

    pub fn dimensions(&self) -> Vec<Dimension> {
        self.critics.iter().map(|(d, _)| *d).collect()
    }

    /// Score `proposal` on every active dimension concurrently, then aggregate.
    ///
    /// Without failure tolerance the first failed critic (in canonical order)
    /// is returned as-is. Returns `Cancelled` if `cancel` fires before every
    /// critic has answered; outstanding calls are dropped.
    pub async fn evaluate(
        &self,
        proposal: &Proposal,
        input: &ProposalInput,
        cancel: &CancellationToken,
    ) -> Result<Evaluation> {
        let calls = self
            .critics
            .iter()
            .map(|(dimension, critic)| self.score_one(*dimension, critic.as_ref(), proposal, input));

        let results = tokio::select! {
            _ = cancel.cancelled() => return Err(ProposerError::Cancelled),
            results = join_all(calls) => results,
        };

        let mut outcomes: Vec<DimensionOutcome> = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(r) => outcomes.push(Ok(r)),
                Err((dimension, error)) => {
                    if !self.policy.tolerate_failures {
                        return Err(error);
                    }
                    tracing::warn!("{} (continuing without it)", error);
                    outcomes.push(Err(DimensionFailure {
                        dimension,
                        reason: error.to_string(),
                    }));
                }
            }
        }

        aggregate(&self.dimensions(), outcomes, &self.policy)
    }

    async fn score_one(
        &self,
        dimension: Dimension,
        critic: &dyn DimensionEvaluator,
        proposal: &Proposal,
        input: &ProposalInput,
    ) -> std::result::Result<DimensionResult, (Dimension, ProposerError)> {
        let capability = Capability::Critic(dimension);
        match tokio::time::timeout(self.call_timeout, critic.evaluate(proposal, dimension, input))
            .await
        {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(e)) => Err((dimension, e.into_adapter(capability))),
            Err(_) => Err((
                dimension,
                ProposerError::Timeout {
                    capability,
                    after_ms: self.call_timeout.as_millis() as u64,
                },
            )),
        }
    }
}
