//! Resilient call gateway: the single choke point for model invocations.
//!
//! Every stage call goes through [`CallGateway`], which owns the degradation
//! cascade and the decode step. The gateway never panics and never returns a
//! bare error to a stage: structured calls yield a [`StructuredReply`] and
//! free-text calls a [`TextReply`], both of which carry failure as ordinary
//! variants the stage validators turn into substitute content.
//!
//! The cascade runs up to three attempts per call:
//! 1. primary credential at the requested token budget
//! 2. primary credential at [`REDUCED_BUDGET_TOKENS`] (quota failures only)
//! 3. alternate billing credential at [`FALLBACK_BUDGET_TOKENS`], when
//!    configured
//!
//! The quota classification gates only the first step. Once the cascade has
//! started degrading, any failure moves to the next planned attempt.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::error::GatewayError;
use crate::providers::{self, OpenRouterGenerator, TextGenerator};
use crate::types::{ChatMessage, GenerationRequest};

/// Output budget for the reduced-budget retry after quota exhaustion.
pub const REDUCED_BUDGET_TOKENS: usize = 2048;
/// Output budget for the alternate-credential attempt.
pub const FALLBACK_BUDGET_TOKENS: usize = 4000;

/// Reply from a structured-output invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredReply {
    /// The response text parsed as JSON. Object-ness and field shapes are
    /// checked downstream by the stage validators.
    Valid(Value),
    /// The response text was not valid JSON. The raw text is preserved for
    /// substitute records built from it.
    Undecodable { raw_output: String },
    /// Every cascade attempt failed.
    Failed { error: String },
}

/// Reply from a free-text invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TextReply {
    Content(String),
    /// Every cascade attempt failed.
    Failed { error: String },
}

impl TextReply {
    /// The reply as downstream text: content verbatim, failure as its
    /// rendered error string.
    pub fn into_text(self) -> String {
        match self {
            TextReply::Content(text) => text,
            TextReply::Failed { error } => error,
        }
    }
}

/// One step of the degradation plan.
struct PlannedAttempt {
    label: &'static str,
    generator: Arc<dyn TextGenerator>,
    max_tokens: usize,
}

/// Single choke point for every model invocation.
pub struct CallGateway {
    primary: Arc<dyn TextGenerator>,
    fallback: Option<Arc<dyn TextGenerator>>,
    default_max_tokens: usize,
}

impl CallGateway {
    pub fn new(
        primary: Arc<dyn TextGenerator>,
        fallback: Option<Arc<dyn TextGenerator>>,
        default_max_tokens: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            default_max_tokens,
        }
    }

    /// Build a gateway over OpenRouter-compatible providers, resolving
    /// credentials from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self, GatewayError> {
        let primary_key = providers::resolve_primary_key(config);
        let primary: Arc<dyn TextGenerator> =
            Arc::new(OpenRouterGenerator::new(config, primary_key)?);

        let fallback = match providers::resolve_fallback_key(config) {
            Some(key) => {
                let generator = OpenRouterGenerator::new(config, Some(key))?;
                Some(Arc::new(generator) as Arc<dyn TextGenerator>)
            }
            None => None,
        };

        Ok(Self::new(primary, fallback, config.max_tokens))
    }

    /// The configured per-call output budget. Stages pass this back in
    /// unless they force their own budget.
    pub fn default_max_tokens(&self) -> usize {
        self.default_max_tokens
    }

    /// Invoke the model requesting a JSON-object response.
    pub async fn call_structured(
        &self,
        messages: Vec<ChatMessage>,
        system_prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> StructuredReply {
        let request = GenerationRequest {
            messages,
            system_prompt: system_prompt.to_string(),
            structured: true,
            temperature,
            max_tokens,
        };
        match self.run_cascade(request).await {
            Ok(text) => decode_structured(text),
            Err(e) => StructuredReply::Failed {
                error: format!("LLM Call Failed: {}", e),
            },
        }
    }

    /// Invoke the model for free text.
    pub async fn call_text(
        &self,
        messages: Vec<ChatMessage>,
        system_prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> TextReply {
        let request = GenerationRequest {
            messages,
            system_prompt: system_prompt.to_string(),
            structured: false,
            temperature,
            max_tokens,
        };
        match self.run_cascade(request).await {
            Ok(text) => TextReply::Content(text),
            Err(e) => TextReply::Failed {
                error: format!("LLM Error: {}", e),
            },
        }
    }

    /// Try each attempt in the degradation plan until one succeeds.
    async fn run_cascade(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let plan = self.degradation_plan(request.max_tokens);
        let mut last_err = None;

        for (index, attempt) in plan.into_iter().enumerate() {
            let scoped = request.clone().with_max_tokens(attempt.max_tokens);
            match attempt.generator.generate(&scoped).await {
                Ok(text) => {
                    if index > 0 {
                        debug!(
                            attempt = attempt.label,
                            max_tokens = attempt.max_tokens,
                            "Model call succeeded after degradation"
                        );
                    }
                    return Ok(text);
                }
                Err(e) => {
                    // Only a quota failure opens the cascade. Later attempts
                    // keep degrading on any failure.
                    if index == 0 && !is_quota_error(&e) {
                        return Err(e);
                    }
                    warn!(
                        attempt = attempt.label,
                        error = %e,
                        "Model call failed, degrading"
                    );
                    last_err = Some(e);
                }
            }
        }

        if self.fallback.is_none() {
            warn!("Quota cascade exhausted and no fallback credential is configured");
        }
        Err(last_err.unwrap_or_else(|| GatewayError::Connection {
            message: "All cascade attempts exhausted".to_string(),
        }))
    }

    fn degradation_plan(&self, requested_tokens: usize) -> Vec<PlannedAttempt> {
        let mut plan = vec![
            PlannedAttempt {
                label: "primary",
                generator: Arc::clone(&self.primary),
                max_tokens: requested_tokens,
            },
            PlannedAttempt {
                label: "reduced-budget",
                generator: Arc::clone(&self.primary),
                max_tokens: REDUCED_BUDGET_TOKENS,
            },
        ];
        if let Some(fallback) = &self.fallback {
            plan.push(PlannedAttempt {
                label: "fallback-credential",
                generator: Arc::clone(fallback),
                max_tokens: FALLBACK_BUDGET_TOKENS,
            });
        }
        plan
    }
}

/// Classify an error as quota or credit exhaustion.
///
/// Matches the rendered error against the vendor's wording: "402" anywhere,
/// or "insufficient_quota" / "credits" case-insensitively.
pub fn is_quota_error(error: &GatewayError) -> bool {
    let rendered = error.to_string();
    if rendered.contains("402") {
        return true;
    }
    let lower = rendered.to_lowercase();
    lower.contains("insufficient_quota") || lower.contains("credits")
}

/// Parse structured-call response text as JSON.
fn decode_structured(text: String) -> StructuredReply {
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => StructuredReply::Valid(value),
        Err(_) => StructuredReply::Undecodable { raw_output: text },
    }
}
