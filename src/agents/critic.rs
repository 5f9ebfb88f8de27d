// src/agents/critic.rs — Single-dimension LLM critic

use std::sync::Arc;

use async_trait::async_trait;

use super::{prompts, DimensionEvaluator};
use crate::core::types::{Dimension, DimensionResult, Proposal, ProposalInput};
use crate::evaluator::parser::parse_critic_response;
use crate::infra::errors::Result;
use crate::provider::{ChatRequest, Message, ModelProvider};

pub struct LlmCritic {
    provider: Arc<dyn ModelProvider>,
    model: String,
}

impl LlmCritic {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl DimensionEvaluator for LlmCritic {
    async fn evaluate(
        &self,
        proposal: &Proposal,
        dimension: Dimension,
        input: &ProposalInput,
    ) -> Result<DimensionResult> {
        let prompt = prompts::render_critic(proposal, dimension, input)?;

        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::user(prompt)],
                system: Some(prompts::critic_system(dimension).into()),
                // Low temperature keeps scores stable across runs
                temperature: Some(0.2),
                ..Default::default()
            })
            .await?;

        let result = parse_critic_response(&response.content, dimension)?;
        tracing::debug!(
            "{} critic scored iteration {}: {:.1} ({} suggestion(s))",
            dimension,
            proposal.iteration,
            result.score,
            result.suggestions.len()
        );
        Ok(result)
    }
}
