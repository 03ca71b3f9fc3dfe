//! Writer stage: drafts the final markdown report.
//!
//! The only stage that calls the model for free text. A draft carrying a
//! refusal or truncation marker gets exactly one corrective retry with a
//! blunter prompt, a higher temperature, and a forced full token budget.
//! Whatever the retry returns is final.

use tracing::{info, warn};

use super::json_text;
use crate::gateway::CallGateway;
use crate::prompts::{WRITER_PROMPT, WRITER_RETRY_PROMPT};
use crate::state::{PipelineState, StagePatch};
use crate::types::ChatMessage;

/// Sampling temperature for the first draft.
pub const WRITER_TEMPERATURE: f32 = 0.4;
/// Sampling temperature for the corrective retry.
pub const WRITER_RETRY_TEMPERATURE: f32 = 0.6;
/// Output budget forced on the corrective retry, regardless of the
/// configured default.
pub const WRITER_RETRY_MAX_TOKENS: usize = 16_384;

/// Case-sensitive markers of a refused or cut-off draft.
const REFUSAL_MARKERS: [&str; 2] = ["cannot complete", "truncated due to length"];

/// Run the writer stage.
pub async fn run(gateway: &CallGateway, state: &PipelineState) -> StagePatch {
    info!("Writer stage");

    let synthesis_json = json_text(&state.synthesis);
    let content = format!(
        "Task: {}\n\nSynthesis Data: {}",
        state.task, synthesis_json
    );

    let draft = gateway
        .call_text(
            vec![ChatMessage::user(content)],
            WRITER_PROMPT,
            WRITER_TEMPERATURE,
            gateway.default_max_tokens(),
        )
        .await
        .into_text();

    let report = if is_refusal(&draft) {
        warn!("Writer refused or truncated, issuing one corrective retry");
        let retry_content = format!(
            "The previous output was cut off. WRITE THE FULL REPORT NOW. TASK: {}\n\nSynthesis: {}",
            state.task, synthesis_json
        );
        gateway
            .call_text(
                vec![ChatMessage::user(retry_content)],
                WRITER_RETRY_PROMPT,
                WRITER_RETRY_TEMPERATURE,
                WRITER_RETRY_MAX_TOKENS,
            )
            .await
            .into_text()
    } else {
        draft
    };

    StagePatch::Report { report }
}

/// Whether a draft carries one of the literal refusal markers.
fn is_refusal(draft: &str) -> bool {
    REFUSAL_MARKERS.iter().any(|marker| draft.contains(marker))
}
