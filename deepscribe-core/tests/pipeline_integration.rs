//! Integration tests for the research pipeline.
//!
//! These tests exercise the full Research -> Critic -> Synthesize -> Write
//! graph end-to-end using MockGenerator and MockLookup, verifying routing,
//! the research loop bound, and the degradation behavior under failures.

use std::sync::{Arc, Mutex};

use deepscribe_core::error::GatewayError;
use deepscribe_core::gateway::CallGateway;
use deepscribe_core::lookup::MockLookup;
use deepscribe_core::orchestrator::{NoOpObserver, Orchestrator, PipelineObserver};
use deepscribe_core::providers::{MockGenerator, TextGenerator};
use deepscribe_core::state::{PipelineStage, PipelineState};

/// Helper to assemble an orchestrator over scripted collaborators.
fn orchestrator(model: Arc<MockGenerator>, lookup: Arc<MockLookup>) -> Orchestrator {
    let gateway = CallGateway::new(model as Arc<dyn TextGenerator>, None, 16_384);
    Orchestrator::new(gateway, lookup)
}

/// Observer that records the completed-stage sequence.
struct RecordingObserver {
    completed: Mutex<Vec<PipelineStage>>,
}

impl RecordingObserver {
    fn new() -> Self {
        Self {
            completed: Mutex::new(Vec::new()),
        }
    }

    fn stages(&self) -> Vec<PipelineStage> {
        self.completed.lock().unwrap().clone()
    }
}

impl PipelineObserver for RecordingObserver {
    fn on_stage_started(&self, _stage: PipelineStage, _state: &PipelineState) {}
    fn on_stage_completed(&self, stage: PipelineStage, _state: &PipelineState) {
        self.completed.lock().unwrap().push(stage);
    }
}

const FINDINGS_JSON: &str = r#"{
    "research_paradigm": "empirical",
    "claims": [{"statement": "observed result", "epistemic_status": "OBSERVED", "confidence": 0.8}]
}"#;

const CONFIDENT_CRITIQUE_JSON: &str =
    r#"{"verified": [{"statement": "observed result"}], "rejected": [], "confidence_score": 0.8}"#;

const LOW_CRITIQUE_JSON: &str = r#"{
    "verified": [],
    "rejected": [{"statement": "needs newer data", "reason": "outdated data"}],
    "confidence_score": 0.0
}"#;

const SYNTHESIS_JSON: &str =
    r#"{"consensus_facts": ["fact"], "summary": "s", "confidence_score": 0.8}"#;

#[tokio::test]
async fn test_confident_first_pass_runs_four_stages() {
    let model = Arc::new(MockGenerator::new());
    model.queue_reply(FINDINGS_JSON);
    model.queue_reply(CONFIDENT_CRITIQUE_JSON);
    model.queue_reply(SYNTHESIS_JSON);
    model.queue_reply("# Final Report\n\nBody.");
    let lookup = Arc::new(MockLookup::returning("lookup blob"));

    let observer = RecordingObserver::new();
    let run = orchestrator(Arc::clone(&model), Arc::clone(&lookup))
        .run("ocean acidification trends", &observer)
        .await;

    assert_eq!(run.state.iteration, 1);
    assert!(run.state.confidence >= 0.5);
    assert_eq!(run.state.report.as_deref(), Some("# Final Report\n\nBody."));
    assert_eq!(model.call_count(), 4);
    assert_eq!(lookup.queries(), vec!["ocean acidification trends"]);
    assert_eq!(
        observer.stages(),
        vec![
            PipelineStage::Research,
            PipelineStage::Critic,
            PipelineStage::Synthesize,
            PipelineStage::Write,
        ]
    );
    assert!(run.finished_at >= run.started_at);
}

#[tokio::test]
async fn test_low_confidence_loops_then_advances() {
    let model = Arc::new(MockGenerator::new());
    // Pass 1: rejected-heavy critique loops back.
    model.queue_reply(FINDINGS_JSON);
    model.queue_reply(LOW_CRITIQUE_JSON);
    // Pass 2: confident critique advances.
    model.queue_reply(FINDINGS_JSON);
    model.queue_reply(CONFIDENT_CRITIQUE_JSON);
    model.queue_reply(SYNTHESIS_JSON);
    model.queue_reply("# Report");
    let lookup = Arc::new(MockLookup::returning("lookup blob"));

    let run = orchestrator(Arc::clone(&model), Arc::clone(&lookup))
        .run("perovskite cell stability", &NoOpObserver)
        .await;

    assert_eq!(run.state.iteration, 2);
    assert_eq!(model.call_count(), 6);

    // The second lookup query carries the rejected statement.
    assert_eq!(
        lookup.queries(),
        vec![
            "perovskite cell stability",
            "perovskite cell stability needs newer data",
        ]
    );

    // The second researcher prompt carries the critique feedback.
    let second_research = &model.calls()[2];
    assert!(second_research.messages[0]
        .content
        .contains("Previous feedback/critique:"));
    assert!(second_research.messages[0]
        .content
        .contains("needs newer data"));
}

#[tokio::test]
async fn test_loop_budget_forces_advancement_after_six_passes() {
    let model = Arc::new(MockGenerator::new());
    for _ in 0..6 {
        model.queue_reply(FINDINGS_JSON);
        model.queue_reply(LOW_CRITIQUE_JSON);
    }
    model.queue_reply(SYNTHESIS_JSON);
    model.queue_reply("# Report despite low confidence");
    let lookup = Arc::new(MockLookup::returning("blob"));

    let observer = RecordingObserver::new();
    let run = orchestrator(Arc::clone(&model), Arc::clone(&lookup))
        .run("cold fusion replication", &observer)
        .await;

    // Confidence never reached the gate; the loop budget advanced anyway.
    assert!(run.state.confidence < 0.5);
    assert_eq!(run.state.iteration, 6);
    assert_eq!(model.call_count(), 14);
    assert_eq!(lookup.queries().len(), 6);
    assert_eq!(
        run.state.report.as_deref(),
        Some("# Report despite low confidence")
    );

    let research_passes = observer
        .stages()
        .iter()
        .filter(|s| **s == PipelineStage::Research)
        .count();
    assert_eq!(research_passes, 6);
}

#[tokio::test]
async fn test_undecodable_replies_still_produce_a_report() {
    let model = Arc::new(MockGenerator::new());
    // Every structured stage returns prose instead of JSON.
    model.queue_reply("I think the research shows...");
    model.queue_reply("As a critic, I believe...");
    model.queue_reply("In synthesis, broadly speaking...");
    model.queue_reply("# Report from substitutes");
    let lookup = Arc::new(MockLookup::returning("real lookup content"));

    let run = orchestrator(Arc::clone(&model), Arc::clone(&lookup))
        .run("superconductor claims", &NoOpObserver)
        .await;

    // Substitute chain: fallback findings carry one lookup-backed claim,
    // the substitute critique verifies it, confidence hits 1.0, one pass.
    assert_eq!(run.state.iteration, 1);
    assert!(run.state.confidence >= 0.0 && run.state.confidence <= 1.0);
    assert!(run.state.iteration >= 1 && run.state.iteration <= 6);

    let findings = run.state.research_data.as_ref().unwrap();
    assert_eq!(findings.claims.len(), 1);
    assert!(findings.claims[0].evidence.contains("real lookup content"));

    let synthesis = run.state.synthesis.as_ref().unwrap();
    assert_eq!(
        synthesis.consensus_facts,
        vec!["Evidence base synthesized from model context."]
    );
    assert_eq!(synthesis.confidence_score, 0.6);

    assert_eq!(run.state.report.as_deref(), Some("# Report from substitutes"));
}

#[tokio::test]
async fn test_total_model_failure_still_terminates_with_report() {
    let model = Arc::new(MockGenerator::new());
    for _ in 0..4 {
        model.queue_error(GatewayError::Connection {
            message: "network unreachable".to_string(),
        });
    }
    let lookup = Arc::new(MockLookup::returning("lookup survives"));

    let run = orchestrator(Arc::clone(&model), Arc::clone(&lookup))
        .run("anything at all", &NoOpObserver)
        .await;

    // Non-quota failures are final per call, so each stage failed once and
    // degraded. The run still reached Done with a non-empty report.
    assert_eq!(model.call_count(), 4);
    assert_eq!(run.state.iteration, 1);

    let synthesis = run.state.synthesis.as_ref().unwrap();
    assert_eq!(synthesis.confidence_score, 0.3);
    assert!(synthesis.error.is_some());

    let report = run.state.report.as_deref().unwrap();
    assert!(report.starts_with("LLM Error: "));
    assert!(report.contains("network unreachable"));
}

#[tokio::test]
async fn test_quota_cascade_recovers_inside_pipeline() {
    let model = Arc::new(MockGenerator::new());
    // Researcher: quota failure then success at the reduced budget.
    model.queue_error(GatewayError::ApiRequest {
        message: "HTTP 402: insufficient credits".to_string(),
    });
    model.queue_reply(FINDINGS_JSON);
    model.queue_reply(CONFIDENT_CRITIQUE_JSON);
    model.queue_reply(SYNTHESIS_JSON);
    model.queue_reply("# Report");
    let lookup = Arc::new(MockLookup::returning("blob"));

    let run = orchestrator(Arc::clone(&model), Arc::clone(&lookup))
        .run("graphene production costs", &NoOpObserver)
        .await;

    assert_eq!(model.call_count(), 5);
    assert_eq!(model.calls()[1].max_tokens, 2048);
    // The recovered reply was real model output, not a substitute.
    let findings = run.state.research_data.as_ref().unwrap();
    assert_eq!(findings.claims[0].statement, "observed result");
    assert_eq!(run.state.report.as_deref(), Some("# Report"));
}
