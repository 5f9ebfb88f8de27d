// src/provider/roles.rs — Role-based model assignment

use crate::infra::config::ModelsConfig;
use crate::infra::errors::{ProposerError, Result};

/// The roles that call a model during a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    Proposer,
    Critic,
    Optimizer,
}

impl std::fmt::Display for AgentRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentRole::Proposer => write!(f, "proposer"),
            AgentRole::Critic => write!(f, "critic"),
            AgentRole::Optimizer => write!(f, "optimizer"),
        }
    }
}

/// Model identifier for `role`: its explicit override, else the shared default.
pub fn resolve(role: AgentRole, models: &ModelsConfig) -> String {
    let explicit = match role {
        AgentRole::Proposer => models.proposer_model.as_deref(),
        AgentRole::Critic => models.critic_model.as_deref(),
        AgentRole::Optimizer => models.optimizer_model.as_deref(),
    };
    explicit
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| models.model.trim())
        .to_string()
}

/// Models assigned to each role, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoles {
    pub proposer: String,
    pub critic: String,
    pub optimizer: String,
}

impl ModelRoles {
    pub fn from_config(models: &ModelsConfig) -> Self {
        Self {
            proposer: resolve(AgentRole::Proposer, models),
            critic: resolve(AgentRole::Critic, models),
            optimizer: resolve(AgentRole::Optimizer, models),
        }
    }

    pub fn get(&self, role: AgentRole) -> &str {
        match role {
            AgentRole::Proposer => &self.proposer,
            AgentRole::Critic => &self.critic,
            AgentRole::Optimizer => &self.optimizer,
        }
    }

    /// Every role needs a model, and it must be in `catalog` when the catalog
    /// is known (non-empty).
    pub fn validate(&self, catalog: &[String]) -> Result<()> {
        for role in [AgentRole::Proposer, AgentRole::Critic, AgentRole::Optimizer] {
            let model = self.get(role);
            if model.is_empty() {
                return Err(ProposerError::Configuration(format!(
                    "no model configured for the {} role",
                    role
                )));
            }
            if !catalog.is_empty() && !catalog.iter().any(|m| m == model) {
                return Err(ProposerError::Configuration(format!(
                    "unknown model '{}' for the {} role (supported: {})",
                    model,
                    role,
                    catalog.join(", ")
                )));
            }
        }
        Ok(())
    }
}
