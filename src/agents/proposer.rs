// src/agents/proposer.rs — First-draft generation

use std::sync::Arc;

use async_trait::async_trait;

use super::{prompts, Proposer};
use crate::core::types::ProposalInput;
use crate::infra::errors::{ProposerError, Result};
use crate::provider::{ChatRequest, Message, ModelProvider};
use crate::retrieval::{Document, Retriever};

pub struct LlmProposer {
    provider: Arc<dyn ModelProvider>,
    model: String,
    retriever: Option<Arc<dyn Retriever>>,
}

impl LlmProposer {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            retriever: None,
        }
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }
}

/// Retrieval is best-effort: a failing knowledge base yields no references.
pub(crate) fn references_for(retriever: Option<&Arc<dyn Retriever>>, query: &str) -> Vec<Document> {
    let Some(retriever) = retriever else {
        return Vec::new();
    };
    match retriever.retrieve(query) {
        Ok(docs) => {
            tracing::debug!("Retrieved {} reference(s)", docs.len());
            docs
        }
        Err(e) => {
            tracing::warn!("Reference retrieval failed: {}", e);
            Vec::new()
        }
    }
}

#[async_trait]
impl Proposer for LlmProposer {
    async fn generate(&self, input: &ProposalInput) -> Result<String> {
        let references = references_for(self.retriever.as_ref(), &input.text);
        let prompt = prompts::render_proposer(input, &references)?;

        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::user(prompt)],
                system: Some(prompts::PROPOSER_SYSTEM.into()),
                temperature: Some(0.7),
                ..Default::default()
            })
            .await?;

        let content = response.content.trim();
        if content.is_empty() {
            return Err(ProposerError::Other(anyhow::anyhow!(
                "model returned an empty proposal"
            )));
        }
        Ok(content.to_string())
    }
}
