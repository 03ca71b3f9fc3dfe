//! Configuration system for Deepscribe.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/deepscribe/config.toml` and/or
//! `.deepscribe/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Top-level configuration for the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier on the OpenRouter-compatible endpoint.
    pub model: String,
    /// Base URL of the chat-completions API.
    pub base_url: String,
    /// Environment variable holding the primary API key.
    pub api_key_env: String,
    /// Environment variable consulted when the primary variable is unset.
    pub alt_api_key_env: Option<String>,
    /// Environment variable holding the alternate billing credential used by
    /// the gateway's final cascade step. `None` disables that step.
    pub fallback_api_key_env: Option<String>,
    /// Default output token budget per call.
    pub max_tokens: usize,
    /// Default temperature for generation. Stages override this per call.
    pub temperature: f32,
    /// HTTP timeout for a single model call, in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "google/gemini-2.0-flash-001".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            alt_api_key_env: Some("OPENAI_API_KEY".to_string()),
            fallback_api_key_env: Some("SCALEDOWN_API_KEY".to_string()),
            max_tokens: 16_384,
            temperature: 0.7,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    /// Validate the configuration, returning warnings for suspicious values.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.max_tokens == 0 {
            warnings.push("max_tokens is 0, every model call will return nothing".to_string());
        }

        if self.temperature < 0.0 || self.temperature > 2.0 {
            warnings.push(format!(
                "temperature ({}) is outside the typical range 0.0-2.0",
                self.temperature
            ));
        }

        if self.base_url.is_empty() {
            warnings.push("base_url is empty, model calls cannot be routed".to_string());
        }

        warnings
    }
}

/// Web search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum related-topic snippets to keep per query.
    pub max_results: usize,
    /// HTTP timeout for a search request, in seconds.
    pub timeout_secs: u64,
    /// User agent sent with search requests.
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 5,
            timeout_secs: 10,
            user_agent: "Deepscribe/0.1".to_string(),
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `DEEPSCRIBE_`)
/// 3. Workspace-local config (`.deepscribe/config.toml`)
/// 4. User config (`~/.config/deepscribe/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&PipelineConfig>,
) -> Result<PipelineConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(PipelineConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "deepscribe", "deepscribe") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".deepscribe").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (DEEPSCRIBE_LLM__MODEL, DEEPSCRIBE_SEARCH__MAX_RESULTS, etc.)
    figment = figment.merge(Env::prefixed("DEEPSCRIBE_").split("__"));

    // Explicit overrides
    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment
        .extract()
        .map_err(|e| ConfigError::Load(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.llm.model, "google/gemini-2.0-flash-001");
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.llm.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(config.llm.max_tokens, 16_384);
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.search.timeout_secs, 10);
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(LlmConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_suspicious_values() {
        let config = LlmConfig {
            max_tokens: 0,
            temperature: 3.5,
            ..LlmConfig::default()
        };
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("max_tokens"));
        assert!(warnings[1].contains("temperature"));
    }

    #[test]
    fn test_load_config_with_overrides() {
        let mut overrides = PipelineConfig::default();
        overrides.llm.model = "anthropic/claude-sonnet-4".to_string();
        overrides.search.max_results = 9;

        let config = load_config(None, Some(&overrides)).unwrap();
        assert_eq!(config.llm.model, "anthropic/claude-sonnet-4");
        assert_eq!(config.search.max_results, 9);
    }

    #[test]
    fn test_load_config_from_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let deepscribe_dir = dir.path().join(".deepscribe");
        std::fs::create_dir_all(&deepscribe_dir).unwrap();
        std::fs::write(
            deepscribe_dir.join("config.toml"),
            r#"
[llm]
model = "meta-llama/llama-3.3-70b-instruct"
max_tokens = 4096

[search]
max_results = 3
"#,
        )
        .unwrap();

        let config = load_config(Some(dir.path()), None).unwrap();
        assert_eq!(config.llm.model, "meta-llama/llama-3.3-70b-instruct");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.search.max_results, 3);
        // Fields absent from the file keep their defaults.
        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
    }
}
