//! The pipeline state machine.
//!
//! Drives Research -> Critic -> (loop | Synthesize) -> Write -> Done,
//! folding each stage's patch into the single owned [`PipelineState`].
//! There is no failure state: stages absorb their own failures into
//! substitute content, so every run terminates with a report. Termination
//! is structural, too: the only cycle in the graph passes through the
//! critic, whose routing forces advancement once the research loop budget
//! is spent.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::gateway::CallGateway;
use crate::lookup::{DuckDuckGoLookup, WebLookup};
use crate::stages::{critic, researcher, synthesizer, writer};
use crate::state::{PipelineStage, PipelineState};

/// Critic confidence at or above this advances the pipeline to synthesis.
pub const CONFIDENCE_ADVANCE_THRESHOLD: f64 = 0.5;
/// Research passes beyond this count force advancement. The check runs
/// after the researcher has incremented `iteration`, so at most six passes
/// complete.
pub const RESEARCH_LOOP_LIMIT: u32 = 5;

/// Observer of run progress, called around each stage.
pub trait PipelineObserver: Send + Sync {
    /// Called before a stage executes.
    fn on_stage_started(&self, stage: PipelineStage, state: &PipelineState);
    /// Called after a stage's patch has been folded into the state.
    fn on_stage_completed(&self, stage: PipelineStage, state: &PipelineState);
}

/// No-op observer for library use and testing.
pub struct NoOpObserver;

impl PipelineObserver for NoOpObserver {
    fn on_stage_started(&self, _stage: PipelineStage, _state: &PipelineState) {}
    fn on_stage_completed(&self, _stage: PipelineStage, _state: &PipelineState) {}
}

/// Summary of one completed run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub state: PipelineState,
}

impl PipelineRun {
    /// The final report text, or a placeholder if the writer never ran.
    pub fn report(&self) -> &str {
        self.state
            .report
            .as_deref()
            .unwrap_or("No report generated.")
    }
}

/// Drives a research task through the stage graph to completion.
pub struct Orchestrator {
    gateway: CallGateway,
    lookup: Arc<dyn WebLookup>,
}

impl Orchestrator {
    pub fn new(gateway: CallGateway, lookup: Arc<dyn WebLookup>) -> Self {
        Self { gateway, lookup }
    }

    /// Build an orchestrator over the real collaborators: an
    /// OpenRouter-backed gateway and DuckDuckGo lookup.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let gateway = CallGateway::from_config(&config.llm)?;
        let lookup = Arc::new(DuckDuckGoLookup::new(&config.search)?);
        Ok(Self::new(gateway, lookup))
    }

    /// Run the pipeline to completion. Infallible by design: stage-level
    /// failures degrade the content, never the control flow.
    pub async fn run(&self, task: impl Into<String>, observer: &dyn PipelineObserver) -> PipelineRun {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut state = PipelineState::new(task);
        info!(run_id = %id, task = %state.task, "Pipeline run started");

        let mut stage = PipelineStage::Research;
        while stage != PipelineStage::Done {
            observer.on_stage_started(stage, &state);

            let patch = match stage {
                PipelineStage::Research => {
                    researcher::run(&self.gateway, self.lookup.as_ref(), &state).await
                }
                PipelineStage::Critic => critic::run(&self.gateway, &state).await,
                PipelineStage::Synthesize => synthesizer::run(&self.gateway, &state).await,
                PipelineStage::Write => writer::run(&self.gateway, &state).await,
                PipelineStage::Done => break,
            };
            state.apply(patch);

            observer.on_stage_completed(stage, &state);
            stage = next_stage(stage, &state);
        }

        let finished_at = Utc::now();
        info!(
            run_id = %id,
            iterations = state.iteration,
            confidence = state.confidence,
            "Pipeline run finished"
        );
        PipelineRun {
            id,
            started_at,
            finished_at,
            state,
        }
    }
}

/// The transition table of the stage graph.
fn next_stage(current: PipelineStage, state: &PipelineState) -> PipelineStage {
    match current {
        PipelineStage::Research => PipelineStage::Critic,
        PipelineStage::Critic => route_after_critique(state),
        PipelineStage::Synthesize => PipelineStage::Write,
        PipelineStage::Write => PipelineStage::Done,
        PipelineStage::Done => PipelineStage::Done,
    }
}

/// Routing decision after a critic pass: advance once the confidence gate
/// opens or the research loop budget is spent, otherwise loop back for
/// another research pass.
pub fn route_after_critique(state: &PipelineState) -> PipelineStage {
    if state.confidence >= CONFIDENCE_ADVANCE_THRESHOLD || state.iteration > RESEARCH_LOOP_LIMIT {
        PipelineStage::Synthesize
    } else {
        PipelineStage::Research
    }
}
