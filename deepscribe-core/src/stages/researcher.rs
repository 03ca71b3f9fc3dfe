//! Researcher stage: web lookup plus one structured model call.
//!
//! On re-entry after a critique, the rejected statements steer both the
//! lookup query and the prompt, so each pass digs where the previous one
//! fell short instead of repeating identical work.

use tracing::{debug, info, warn};

use super::{Shaped, check_shape, json_text, truncate_chars};
use crate::gateway::{CallGateway, StructuredReply};
use crate::lookup::WebLookup;
use crate::prompts::RESEARCHER_PROMPT;
use crate::state::{Claim, EpistemicStatus, PipelineState, RejectedClaim, ResearchFindings, StagePatch};
use crate::types::ChatMessage;

/// Sampling temperature for the researcher call. Low for JSON compliance.
pub const RESEARCHER_TEMPERATURE: f32 = 0.1;

/// Confidence assigned to the substitute claim when the model reply is
/// unusable. A fixed calibration value, not derived from anything.
pub const FALLBACK_CLAIM_CONFIDENCE: f64 = 0.7;

/// Substitute lookup text when the search collaborator fails.
pub const LOOKUP_FAILURE_PLACEHOLDER: &str =
    "No search results available due to technical error.";

const EVIDENCE_LIMIT_CHARS: usize = 1000;
const RAW_RESULTS_LIMIT_CHARS: usize = 500;
/// How many rejected statements enrich the lookup query.
const REJECTED_QUERY_LIMIT: usize = 2;

/// Run the researcher stage.
pub async fn run(
    gateway: &CallGateway,
    lookup: &dyn WebLookup,
    state: &PipelineState,
) -> StagePatch {
    info!(iteration = state.iteration, "Research stage");

    let rejected: &[RejectedClaim] = state
        .critique
        .as_ref()
        .map(|c| c.rejected.as_slice())
        .unwrap_or_default();

    let search_query = build_search_query(&state.task, rejected);
    debug!(query = %search_query, "Executing web lookup");
    let search_results = match lookup.search(&search_query).await {
        Ok(results) => results,
        Err(e) => {
            warn!(error = %e, "Web lookup failed, substituting placeholder");
            LOOKUP_FAILURE_PLACEHOLDER.to_string()
        }
    };

    let mut content = format!(
        "Task: {}\n\nWeb Search Results:\n{}",
        state.task, search_results
    );
    if !rejected.is_empty() {
        content.push_str(&format!(
            "\n\nPrevious feedback/critique: {}",
            json_text(&rejected)
        ));
    }

    let reply = gateway
        .call_structured(
            vec![ChatMessage::user(content)],
            RESEARCHER_PROMPT,
            RESEARCHER_TEMPERATURE,
            gateway.default_max_tokens(),
        )
        .await;

    StagePatch::Research {
        findings: validate(reply, &state.task, &search_results),
        iteration: state.iteration + 1,
    }
}

/// Build the lookup query: the task plus up to the first two rejected
/// statements.
fn build_search_query(task: &str, rejected: &[RejectedClaim]) -> String {
    let mut query = task.to_string();
    if !rejected.is_empty() {
        let statements: Vec<&str> = rejected
            .iter()
            .take(REJECTED_QUERY_LIMIT)
            .map(|r| r.statement.as_str())
            .collect();
        query.push(' ');
        query.push_str(&statements.join(" "));
    }
    query
}

/// Check the reply against the findings schema. Any failure substitutes a
/// record built from the raw lookup text, so downstream stages always see
/// schema-valid claims.
pub fn validate(reply: StructuredReply, task: &str, search_results: &str) -> ResearchFindings {
    match check_shape::<ResearchFindings>(reply) {
        Shaped::Valid(findings) => findings,
        Shaped::Invalid { .. } | Shaped::Failed { .. } => {
            warn!("Researcher reply unusable, substituting lookup-backed record");
            fallback_findings(task, search_results)
        }
    }
}

/// The substitute record. Its single claim quotes the real lookup text as
/// evidence, so even a degraded pass carries observed material forward.
fn fallback_findings(task: &str, search_results: &str) -> ResearchFindings {
    ResearchFindings {
        research_paradigm: "empirical".to_string(),
        real_time_dependency: true,
        claims: vec![Claim {
            statement: format!("Search indicates relevant findings for: {}", task),
            epistemic_status: EpistemicStatus::Observed,
            evidence: truncate_chars(search_results, EVIDENCE_LIMIT_CHARS),
            source: "DuckDuckGo Search Results".to_string(),
            confidence: FALLBACK_CLAIM_CONFIDENCE,
        }],
        datasets_or_materials: Vec::new(),
        methodology_notes: "Gathered via automated web retrieval.".to_string(),
        raw_results: truncate_chars(search_results, RAW_RESULTS_LIMIT_CHARS),
        contradictions: Vec::new(),
        open_questions: vec!["Verification of specific real-time metrics required.".to_string()],
    }
}
