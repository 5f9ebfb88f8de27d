// src/agents/optimizer.rs — Feedback-driven proposal rewriting

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;

use super::proposer::references_for;
use super::{prompts, Optimizer};
use crate::core::types::{Dimension, Evaluation, Proposal, ProposalInput};
use crate::infra::errors::{ProposerError, Result};
use crate::provider::{ChatRequest, Message, ModelProvider};
use crate::retrieval::Retriever;

/// Dimensions scoring below this are called out as key issues.
pub const KEY_ISSUE_THRESHOLD: f64 = 7.0;

/// Condensed view of an evaluation handed to the rewriting model.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackDigest {
    pub overall_score: f64,
    pub scores: Vec<(Dimension, f64)>,
    pub key_issues: Vec<(Dimension, f64)>,
    /// Non-empty critic rationales, in canonical order.
    pub feedback: Vec<(Dimension, String)>,
    pub suggestions: Vec<String>,
    pub unscored: Vec<(Dimension, String)>,
}

impl FeedbackDigest {
    pub fn from_evaluation(evaluation: &Evaluation) -> Self {
        let scores: Vec<(Dimension, f64)> = evaluation
            .dimensions
            .values()
            .map(|d| (d.dimension, d.score))
            .collect();
        let key_issues = scores
            .iter()
            .copied()
            .filter(|(_, score)| *score < KEY_ISSUE_THRESHOLD)
            .collect();
        Self {
            overall_score: evaluation.overall_score,
            scores,
            key_issues,
            feedback: evaluation
                .dimensions
                .values()
                .filter(|d| !d.feedback.is_empty())
                .map(|d| (d.dimension, d.feedback.clone()))
                .collect(),
            suggestions: evaluation.suggestions.clone(),
            unscored: evaluation
                .failures
                .iter()
                .map(|f| (f.dimension, f.reason.clone()))
                .collect(),
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Overall score: {:.1}/10", self.overall_score);

        out.push_str("Scores:\n");
        for (dim, score) in &self.scores {
            let _ = writeln!(out, "- {}: {:.1}", dim, score);
        }

        if !self.key_issues.is_empty() {
            out.push_str("Key issues:\n");
            for (dim, score) in &self.key_issues {
                let _ = writeln!(out, "- {} is weak ({:.1})", dim, score);
            }
        }

        if !self.feedback.is_empty() {
            out.push_str("Reviewer comments:\n");
            for (dim, text) in &self.feedback {
                let _ = writeln!(out, "- {}: {}", dim, text);
            }
        }

        if !self.suggestions.is_empty() {
            out.push_str("Suggestions:\n");
            for (i, s) in self.suggestions.iter().enumerate() {
                let _ = writeln!(out, "{}. {}", i + 1, s);
            }
        }

        if !self.unscored.is_empty() {
            out.push_str("Not reviewed this round:\n");
            for (dim, reason) in &self.unscored {
                let _ = writeln!(out, "- {}: {}", dim, reason);
            }
        }
        out
    }
}

pub struct LlmOptimizer {
    provider: Arc<dyn ModelProvider>,
    model: String,
    retriever: Option<Arc<dyn Retriever>>,
}

impl LlmOptimizer {
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

#[async_trait]
impl Optimizer for LlmOptimizer {
    async fn optimize(
        &self,
        proposal: &Proposal,
        evaluation: &Evaluation,
        input: &ProposalInput,
    ) -> Result<String> {
        let digest = FeedbackDigest::from_evaluation(evaluation);
        tracing::debug!(
            "Optimizing iteration {}: {} key issue(s), {} suggestion(s)",
            proposal.iteration,
            digest.key_issues.len(),
            digest.suggestions.len()
        );

        let references = references_for(self.retriever.as_ref(), &input.text);
        let prompt = prompts::render_optimizer(proposal, &digest.render(), input, &references)?;

        let response = self
            .provider
            .chat(ChatRequest {
                model: self.model.clone(),
                messages: vec![Message::user(prompt)],
                system: Some(prompts::OPTIMIZER_SYSTEM.into()),
                temperature: Some(0.5),
                ..Default::default()
            })
            .await?;

        let content = response.content.trim();
        if content.is_empty() {
            return Err(ProposerError::Other(anyhow::anyhow!(
                "model returned an empty revision"
            )));
        }
        Ok(content.to_string())
    }
}
