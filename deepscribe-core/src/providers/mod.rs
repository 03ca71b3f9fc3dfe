//! Text-generation providers.
//!
//! The gateway talks to providers through the [`TextGenerator`] trait. The
//! concrete implementation targets OpenRouter-compatible chat-completions
//! endpoints; [`MockGenerator`] scripts replies for tests.

pub mod mock;
pub mod openrouter;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::error::GatewayError;
use crate::types::GenerationRequest;

pub use mock::MockGenerator;
pub use openrouter::OpenRouterGenerator;

/// A text-generation backend.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Perform one model invocation, returning the raw response text.
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GatewayError>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str {
        "unknown"
    }
}

/// Resolve the primary API key from the configured environment variables.
///
/// Checks `api_key_env` first, then `alt_api_key_env`. Returns `None` when
/// neither is set; the provider reports the missing key at call time so a
/// credential-less run still flows through the gateway's failure handling.
pub fn resolve_primary_key(config: &LlmConfig) -> Option<String> {
    read_env(&config.api_key_env)
        .or_else(|| config.alt_api_key_env.as_deref().and_then(read_env))
}

/// Resolve the alternate billing credential for the gateway's final cascade
/// step, if one is configured and set.
pub fn resolve_fallback_key(config: &LlmConfig) -> Option<String> {
    config.fallback_api_key_env.as_deref().and_then(read_env)
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
