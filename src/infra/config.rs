// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::types::Dimension;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub workflow: WorkflowConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub provider: ProviderConfig,
}

/// Model per role. Unset roles fall back to `model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub model: String,
    pub proposer_model: Option<String>,
    pub critic_model: Option<String>,
    pub optimizer_model: Option<String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            proposer_model: None,
            critic_model: None,
            optimizer_model: None,
        }
    }
}

fn default_model() -> String {
    "qwen-max".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub max_iterations: u32,
    pub excellent_score: f64,
    pub call_timeout_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            excellent_score: 8.5,
            call_timeout_secs: 120,
        }
    }
}

/// Dimension tags stay strings here so an unknown tag is reported as a
/// configuration error at INIT rather than a TOML parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub dimensions: Vec<String>,
    pub dimension_weights: Option<BTreeMap<String, f64>>,
    pub tolerate_failures: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            dimension_weights: None,
            tolerate_failures: false,
        }
    }
}

fn default_dimensions() -> Vec<String> {
    Dimension::ALL.iter().map(|d| d.to_string()).collect()
}

/// OpenAI-compatible chat endpoint used by the LLM-backed agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key_env: String,
    /// Models the endpoint serves. Empty means "don't check".
    pub models: Vec<String>,
    pub max_retries: u32,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".into(),
            api_key_env: "DASHSCOPE_API_KEY".into(),
            models: vec![
                "qwen-max".into(),
                "qwen-plus".into(),
                "qwen-turbo".into(),
            ],
            max_retries: default_max_retries(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.models.model, "qwen-max");
        assert!(c.models.critic_model.is_none());
        assert_eq!(c.workflow.max_iterations, 3);
        assert!((c.workflow.excellent_score - 8.5).abs() < 0.001);
        assert_eq!(c.workflow.call_timeout_secs, 120);
        assert_eq!(c.evaluation.dimensions.len(), 4);
        assert!(c.evaluation.dimension_weights.is_none());
        assert!(!c.evaluation.tolerate_failures);
        assert_eq!(c.provider.api_key_env, "DASHSCOPE_API_KEY");
    }

    #[test]
    fn test_default_dimensions_in_canonical_order() {
        assert_eq!(
            default_dimensions(),
            vec!["logic", "completeness", "innovation", "feasibility"]
        );
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.workflow.max_iterations, 3);
        assert_eq!(config.models.model, "qwen-max");
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config: Config = toml::from_str(
            r#"
[workflow]
max_iterations = 2

[provider]
models = ["local-model"]

[models]
critic_model = "qwen-plus"
"#,
        )
        .unwrap();
        assert_eq!(config.workflow.max_iterations, 2);
        assert!((config.workflow.excellent_score - 8.5).abs() < 0.001);
        assert_eq!(config.workflow.call_timeout_secs, 120);
        assert_eq!(config.provider.api_key_env, "DASHSCOPE_API_KEY");
        assert_eq!(config.provider.max_retries, 3);
        assert_eq!(config.provider.models, vec!["local-model"]);
        assert_eq!(config.models.model, "qwen-max");
        assert_eq!(config.models.critic_model.as_deref(), Some("qwen-plus"));
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[models]
model = "qwen-max"
critic_model = "qwen-plus"

[workflow]
max_iterations = 2
excellent_score = 8.0
call_timeout_secs = 30

[evaluation]
dimensions = ["logic", "feasibility"]
tolerate_failures = true

[evaluation.dimension_weights]
logic = 2.0
feasibility = 1.0

[provider]
base_url = "http://localhost:8000/v1"
api_key_env = "LOCAL_KEY"
models = ["local-model"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.models.critic_model.as_deref(), Some("qwen-plus"));
        assert!(config.models.optimizer_model.is_none());
        assert_eq!(config.workflow.max_iterations, 2);
        assert_eq!(config.workflow.call_timeout_secs, 30);
        assert_eq!(config.evaluation.dimensions, vec!["logic", "feasibility"]);
        assert!(config.evaluation.tolerate_failures);
        let weights = config.evaluation.dimension_weights.unwrap();
        assert_eq!(weights.get("logic"), Some(&2.0));
        assert_eq!(config.provider.models, vec!["local-model"]);
        assert_eq!(config.provider.max_retries, 3);
    }

    #[test]
    fn test_parse_models_only() {
        let toml_str = r#"
[models]
proposer_model = "qwen-turbo"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.models.model, "qwen-max");
        assert_eq!(config.models.proposer_model.as_deref(), Some("qwen-turbo"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            deserialized.workflow.max_iterations,
            config.workflow.max_iterations
        );
        assert_eq!(deserialized.evaluation.dimensions, config.evaluation.dimensions);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[workflow]\nmax_iterations = 7\nexcellent_score = 9.0\ncall_timeout_secs = 10\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.workflow.max_iterations, 7);
    }
}
