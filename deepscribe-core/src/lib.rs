//! # Deepscribe Core
//!
//! Core library for the Deepscribe deep-research pipeline.
//! A researcher gathers claims from a web lookup and a model call, a critic
//! verifies or rejects them, a synthesizer consolidates the verified
//! material, and a writer drafts the final markdown report. The orchestrator
//! routes between stages on a derived confidence score with a bounded
//! research loop, and every model call flows through a resilient gateway
//! that degrades instead of failing.

pub mod config;
pub mod error;
pub mod gateway;
pub mod lookup;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod stages;
pub mod state;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{LlmConfig, PipelineConfig, SearchConfig, load_config};
pub use error::{ConfigError, DeepscribeError, GatewayError, LookupError, Result};
pub use gateway::{CallGateway, StructuredReply, TextReply};
pub use lookup::{DuckDuckGoLookup, MockLookup, WebLookup};
pub use orchestrator::{
    CONFIDENCE_ADVANCE_THRESHOLD, NoOpObserver, Orchestrator, PipelineObserver, PipelineRun,
    RESEARCH_LOOP_LIMIT, route_after_critique,
};
pub use providers::{MockGenerator, OpenRouterGenerator, TextGenerator};
pub use state::{
    Claim, Critique, DatasetRef, EpistemicStatus, PaperOutline, PipelineStage, PipelineState,
    RejectedClaim, ResearchFindings, StagePatch, Synthesis,
};
pub use types::{ChatMessage, GenerationRequest, Role};
