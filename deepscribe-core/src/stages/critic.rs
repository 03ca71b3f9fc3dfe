//! Critic stage: adversarial review of the researcher's claims.
//!
//! Besides the critique record itself, this stage derives the routing
//! confidence the orchestrator gates on.

use tracing::{info, warn};

use super::{Shaped, check_shape, json_text};
use crate::gateway::{CallGateway, StructuredReply};
use crate::prompts::CRITIC_PROMPT;
use crate::state::{Claim, Critique, PipelineState, RejectedClaim, StagePatch};
use crate::types::ChatMessage;

/// Sampling temperature for the critic call. Low for JSON compliance.
pub const CRITIC_TEMPERATURE: f32 = 0.1;

/// Confidence reported when upstream research data is missing entirely.
pub const MISSING_INPUT_CONFIDENCE: f64 = 0.1;

/// How many claims the substitute critique accepts provisionally.
const FALLBACK_VERIFIED_LIMIT: usize = 2;
const FALLBACK_CONFIDENCE_SCORE: f64 = 0.5;

/// Run the critic stage.
pub async fn run(gateway: &CallGateway, state: &PipelineState) -> StagePatch {
    info!("Critic stage");

    let Some(research) = state.research_data.as_ref() else {
        // Corrupted upstream state. Reject outright without a model call;
        // the low confidence routes the pipeline back to research.
        warn!("No research data present, short-circuiting critique");
        return StagePatch::Critique {
            critique: Critique {
                rejected: vec![RejectedClaim {
                    statement: "Invalid data format".to_string(),
                    reason: "Data was not a dictionary".to_string(),
                    ..RejectedClaim::default()
                }],
                ..Critique::default()
            },
            confidence: MISSING_INPUT_CONFIDENCE,
        };
    };

    let content = format!("Research Data to Review:\n{}", json_text(research));
    let reply = gateway
        .call_structured(
            vec![ChatMessage::user(content)],
            CRITIC_PROMPT,
            CRITIC_TEMPERATURE,
            gateway.default_max_tokens(),
        )
        .await;

    let critique = validate(reply, &research.claims);
    let confidence = derive_confidence(&critique);
    StagePatch::Critique {
        critique,
        confidence,
    }
}

/// Check the reply against the critique schema. On failure the substitute
/// accepts the first two claims provisionally and flags the formatting
/// breakdown, so the loop can still make progress.
pub fn validate(reply: StructuredReply, claims: &[Claim]) -> Critique {
    match check_shape::<Critique>(reply) {
        Shaped::Valid(critique) => critique,
        Shaped::Invalid { .. } | Shaped::Failed { .. } => {
            warn!("Critic reply unusable, substituting provisional acceptance");
            Critique {
                verified: claims.iter().take(FALLBACK_VERIFIED_LIMIT).cloned().collect(),
                rejected: Vec::new(),
                needs_revision: vec!["Format error in review".to_string()],
                methodological_flaws: vec!["Critic formatting failure".to_string()],
                confidence_score: FALLBACK_CONFIDENCE_SCORE,
            }
        }
    }
}

/// Derive the routing confidence from a critique.
///
/// Combines the verified/rejected ratio with the critic's self-reported
/// score via `max`, taking the more optimistic of the two signals. An
/// empty review counts as 0.5, not 0.
pub fn derive_confidence(critique: &Critique) -> f64 {
    let verified = critique.verified.len();
    let rejected = critique.rejected.len();
    let total = verified + rejected;
    let ratio = if total > 0 {
        verified as f64 / total as f64
    } else {
        0.5
    };
    ratio.max(critique.confidence_score).clamp(0.0, 1.0)
}
