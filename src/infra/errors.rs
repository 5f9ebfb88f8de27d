// src/infra/errors.rs — Error types for the proposal workflow

use thiserror::Error;

use crate::core::types::Dimension;

/// Which external capability a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Proposer,
    Critic(Dimension),
    Optimizer,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Proposer => write!(f, "proposer"),
            Capability::Critic(dim) => write!(f, "critic[{}]", dim),
            Capability::Optimizer => write!(f, "optimizer"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProposerError {
    // Detected at INIT, before any external call
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Capability failures
    #[error("{capability} failed: {message}")]
    Adapter {
        capability: Capability,
        message: String,
    },

    #[error("{capability} timed out after {after_ms}ms")]
    Timeout { capability: Capability, after_ms: u64 },

    #[error("Aggregation error: {0}")]
    Aggregation(String),

    // Provider errors (retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    #[error("Workflow cancelled")]
    Cancelled,

    // Infra
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProposerError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ProposerError::Provider {
                retriable: true,
                ..
            } | ProposerError::RateLimited { .. }
        )
    }

    /// True for failures that belong to a capability call (including timeouts).
    pub fn is_adapter_failure(&self) -> bool {
        matches!(
            self,
            ProposerError::Adapter { .. } | ProposerError::Timeout { .. }
        )
    }

    /// Attribute an error raised inside a capability to that capability.
    ///
    /// Errors that already name a capability, and cancellation, pass through
    /// unchanged; everything else becomes an `Adapter` failure.
    pub fn into_adapter(self, capability: Capability) -> Self {
        match self {
            e @ (ProposerError::Adapter { .. }
            | ProposerError::Timeout { .. }
            | ProposerError::Cancelled) => e,
            other => ProposerError::Adapter {
                capability,
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ProposerError>;
