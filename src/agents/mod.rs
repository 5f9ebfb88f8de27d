// src/agents/mod.rs — Capability interfaces and their LLM-backed implementations
//
// The workflow only sees the three traits below. Anything that can turn a
// problem statement into text, score text along one dimension, or rewrite
// text from feedback can be plugged in through an `AgentFactory`.

pub mod critic;
pub mod optimizer;
pub mod prompts;
pub mod proposer;

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::types::{Dimension, DimensionResult, Evaluation, Proposal, ProposalInput};
use crate::infra::errors::Result;
use crate::provider::roles::{AgentRole, ModelRoles};
use crate::provider::ModelProvider;
use crate::retrieval::Retriever;

/// Produces the first draft.
#[async_trait]
pub trait Proposer: Send + Sync {
    async fn generate(&self, input: &ProposalInput) -> Result<String>;
}

/// Scores a proposal along one dimension. Stateless between calls.
#[async_trait]
pub trait DimensionEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        proposal: &Proposal,
        dimension: Dimension,
        input: &ProposalInput,
    ) -> Result<DimensionResult>;
}

/// Rewrites a proposal from its latest evaluation.
#[async_trait]
pub trait Optimizer: Send + Sync {
    async fn optimize(
        &self,
        proposal: &Proposal,
        evaluation: &Evaluation,
        input: &ProposalInput,
    ) -> Result<String>;
}

/// Builds capability instances for resolved model identifiers.
pub trait AgentFactory: Send + Sync {
    /// Known model identifiers. Empty means "accept any non-empty id".
    fn supported_models(&self) -> Vec<String>;

    fn proposer(&self, model: &str) -> Result<Arc<dyn Proposer>>;
    fn critic(&self, dimension: Dimension, model: &str) -> Result<Arc<dyn DimensionEvaluator>>;
    fn optimizer(&self, model: &str) -> Result<Arc<dyn Optimizer>>;
}

/// Capabilities for one workflow, built once at construction.
#[derive(Clone)]
pub struct AgentSet {
    pub proposer: Arc<dyn Proposer>,
    /// One evaluator per active dimension, in canonical order.
    pub critics: Vec<(Dimension, Arc<dyn DimensionEvaluator>)>,
    pub optimizer: Arc<dyn Optimizer>,
}

impl AgentSet {
    /// Build one proposer, one critic per dimension and one optimizer.
    pub fn build(
        factory: &dyn AgentFactory,
        roles: &ModelRoles,
        dimensions: &[Dimension],
    ) -> Result<Self> {
        let critic_model = roles.get(AgentRole::Critic);
        let critics = dimensions
            .iter()
            .map(|d| Ok((*d, factory.critic(*d, critic_model)?)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            proposer: factory.proposer(roles.get(AgentRole::Proposer))?,
            critics,
            optimizer: factory.optimizer(roles.get(AgentRole::Optimizer))?,
        })
    }
}

/// Factory for the chat-model agents in this module.
pub struct LlmAgentFactory {
    provider: Arc<dyn ModelProvider>,
    retriever: Option<Arc<dyn Retriever>>,
}

impl LlmAgentFactory {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            retriever: None,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }
}

impl AgentFactory for LlmAgentFactory {
    fn supported_models(&self) -> Vec<String> {
        self.provider.models().into_iter().map(|m| m.id).collect()
    }

    fn proposer(&self, model: &str) -> Result<Arc<dyn Proposer>> {
        let mut agent = proposer::LlmProposer::new(self.provider.clone(), model);
        if let Some(r) = &self.retriever {
            agent = agent.with_retriever(r.clone());
        }
        Ok(Arc::new(agent))
    }

    fn critic(&self, dimension: Dimension, model: &str) -> Result<Arc<dyn DimensionEvaluator>> {
        tracing::debug!("Building {} critic on {}", dimension, model);
        Ok(Arc::new(critic::LlmCritic::new(self.provider.clone(), model)))
    }

    fn optimizer(&self, model: &str) -> Result<Arc<dyn Optimizer>> {
        let mut agent = optimizer::LlmOptimizer::new(self.provider.clone(), model);
        if let Some(r) = &self.retriever {
            agent = agent.with_retriever(r.clone());
        }
        Ok(Arc::new(agent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::errors::ProposerError;
    use crate::provider::{ChatRequest, ChatResponse, ModelInfo};

    struct Catalog;

    #[async_trait]
    impl ModelProvider for Catalog {
        fn id(&self) -> &str {
            "catalog"
        }
        fn name(&self) -> &str {
            "Catalog"
        }
        fn models(&self) -> Vec<ModelInfo> {
            vec![ModelInfo::new("qwen-max"), ModelInfo::new("qwen-plus")]
        }
        async fn chat(&self, _req: ChatRequest) -> std::result::Result<ChatResponse, ProposerError> {
            Err(ProposerError::Other(anyhow::anyhow!("not used")))
        }
    }

    #[test]
    fn test_supported_models_follow_provider_catalog() {
        let factory = LlmAgentFactory::new(Arc::new(Catalog));
        assert_eq!(factory.supported_models(), vec!["qwen-max", "qwen-plus"]);
    }

    #[test]
    fn test_factory_builds_every_capability() {
        let factory = LlmAgentFactory::new(Arc::new(Catalog));
        assert!(factory.proposer("qwen-max").is_ok());
        assert!(factory.critic(Dimension::Logic, "qwen-plus").is_ok());
        assert!(factory.optimizer("qwen-max").is_ok());
    }
}
