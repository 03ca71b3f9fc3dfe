//! Synthesizer stage: consolidates verified material into a paper framework.
//!
//! Recovery here is two-layered. A failed cascade degrades to a record built
//! from the locally available research data; a reply that arrived but did
//! not match the schema degrades to a theoretical-synthesis placeholder
//! built from the raw reply text. The two substitutes carry different
//! confidence scores so the final report reflects how much was lost.

use tracing::{info, warn};

use super::{Shaped, check_shape, json_text, truncate_chars};
use crate::gateway::{CallGateway, StructuredReply};
use crate::prompts::SYNTHESIZER_PROMPT;
use crate::state::{PaperOutline, PipelineState, StagePatch, Synthesis};
use crate::types::ChatMessage;

/// Sampling temperature for the synthesizer call.
pub const SYNTHESIZER_TEMPERATURE: f32 = 0.2;

/// Confidence of the substitute built from raw research data after a failed
/// cascade.
pub const HARD_FAILURE_CONFIDENCE: f64 = 0.3;
/// Confidence of the substitute built from a malformed reply.
pub const MALFORMED_REPLY_CONFIDENCE: f64 = 0.6;

const HARD_SUMMARY_LIMIT_CHARS: usize = 1000;
const HARD_CONTEXT_LIMIT_CHARS: usize = 500;
const MALFORMED_SUMMARY_LIMIT_CHARS: usize = 2000;
const MALFORMED_CONTEXT_LIMIT_CHARS: usize = 1000;

/// Run the synthesizer stage.
pub async fn run(gateway: &CallGateway, state: &PipelineState) -> StagePatch {
    info!("Synthesizer stage");

    // Research data rides into the prompt in full; there is no compression
    // step before synthesis.
    let research_json = json_text(&state.research_data);
    let critique_json = json_text(&state.critique);
    let content = format!(
        "Research Data: {}\nCritique: {}",
        research_json, critique_json
    );

    let reply = gateway
        .call_structured(
            vec![ChatMessage::user(content)],
            SYNTHESIZER_PROMPT,
            SYNTHESIZER_TEMPERATURE,
            gateway.default_max_tokens(),
        )
        .await;

    StagePatch::Synthesis {
        synthesis: validate(reply, &research_json),
    }
}

/// Check the reply against the synthesis schema, degrading per layer.
pub fn validate(reply: StructuredReply, research_json: &str) -> Synthesis {
    match check_shape::<Synthesis>(reply) {
        Shaped::Valid(synthesis) => synthesis,
        Shaped::Invalid { raw } => {
            warn!("Synthesizer reply malformed, substituting theoretical synthesis");
            Synthesis {
                consensus_facts: vec!["Evidence base synthesized from model context.".to_string()],
                conflicts: Vec::new(),
                key_insights: vec!["Proceeding with theoretical synthesis.".to_string()],
                paper_outline: PaperOutline {
                    sections: vec![
                        "Introduction".to_string(),
                        "Theory".to_string(),
                        "Conclusion".to_string(),
                    ],
                },
                summary: truncate_chars(&raw, MALFORMED_SUMMARY_LIMIT_CHARS),
                compressed_context: truncate_chars(&raw, MALFORMED_CONTEXT_LIMIT_CHARS),
                confidence_score: MALFORMED_REPLY_CONFIDENCE,
                error: None,
            }
        }
        Shaped::Failed { error } => {
            warn!(error = %error, "Synthesizer call failed, falling back to raw research data");
            Synthesis {
                consensus_facts: vec!["Synthesis failed - using raw data".to_string()],
                conflicts: Vec::new(),
                key_insights: Vec::new(),
                paper_outline: PaperOutline {
                    sections: vec![
                        "Introduction".to_string(),
                        "Analysis".to_string(),
                        "Conclusion".to_string(),
                    ],
                },
                summary: truncate_chars(research_json, HARD_SUMMARY_LIMIT_CHARS),
                compressed_context: truncate_chars(research_json, HARD_CONTEXT_LIMIT_CHARS),
                confidence_score: HARD_FAILURE_CONFIDENCE,
                error: Some(error),
            }
        }
    }
}
