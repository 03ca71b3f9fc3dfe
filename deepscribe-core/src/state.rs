//! Pipeline state and the typed records each stage produces.
//!
//! The orchestrator owns a single [`PipelineState`] per run. Stages read it
//! by reference and return a [`StagePatch`]; [`PipelineState::apply`] folds
//! the patch back in. Nothing else mutates the state, which keeps the loop
//! free of locks and makes every stage a pure function of its inputs.
//!
//! All model-produced record types default every field, so a structurally
//! valid JSON object decodes even when the model omits sections. Wrong field
//! types and non-object payloads are schema violations the stage validators
//! convert into substitute records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Stage graph
// ---------------------------------------------------------------------------

/// One node of the orchestration graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Web lookup plus one structured model call producing claims.
    Research,
    /// Adversarial review of the researcher's claims.
    Critic,
    /// Consolidation of verified material into a paper framework.
    Synthesize,
    /// Drafting the final markdown report.
    Write,
    /// Terminal. Every run reaches it.
    Done,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Research => write!(f, "research"),
            PipelineStage::Critic => write!(f, "critic"),
            PipelineStage::Synthesize => write!(f, "synthesize"),
            PipelineStage::Write => write!(f, "write"),
            PipelineStage::Done => write!(f, "done"),
        }
    }
}

// ---------------------------------------------------------------------------
// Researcher records
// ---------------------------------------------------------------------------

/// Evidentiary strength of a claim.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EpistemicStatus {
    /// Directly measured or reported in a primary source.
    Observed,
    /// Mathematically or logically derived from observed facts.
    Derived,
    /// Independently confirmed by multiple sources.
    Replicated,
    /// Plausible but unverified. Claims arriving without a label land here.
    #[default]
    Hypothesis,
    /// Explicitly unresolved.
    OpenQuestion,
}

/// A single research claim with its evidentiary label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Claim {
    pub statement: String,
    pub epistemic_status: EpistemicStatus,
    pub evidence: String,
    pub source: String,
    pub confidence: f64,
}

/// A dataset or material referenced by the researcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetRef {
    pub name: String,
    pub source: String,
    pub size_or_scope: String,
    pub temporal_coverage: String,
    pub access: String,
}

/// Validated researcher output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchFindings {
    pub research_paradigm: String,
    pub real_time_dependency: bool,
    pub claims: Vec<Claim>,
    pub datasets_or_materials: Vec<DatasetRef>,
    pub methodology_notes: String,
    pub raw_results: String,
    pub contradictions: Vec<String>,
    pub open_questions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Critic records
// ---------------------------------------------------------------------------

/// A claim the critic rejected, with its reason and the fix it requires.
///
/// Rejections feed the next research pass: their statements are appended to
/// the lookup query so the loop does not repeat identical work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RejectedClaim {
    pub statement: String,
    pub reason: String,
    pub required_fix: String,
    pub confidence: f64,
}

/// Validated critic output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Critique {
    pub verified: Vec<Claim>,
    pub rejected: Vec<RejectedClaim>,
    pub needs_revision: Vec<String>,
    pub methodological_flaws: Vec<String>,
    /// The critic's self-reported confidence. 0.0 when absent.
    pub confidence_score: f64,
}

// ---------------------------------------------------------------------------
// Synthesizer records
// ---------------------------------------------------------------------------

/// Section plan for the final paper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperOutline {
    pub sections: Vec<String>,
}

/// Validated synthesizer output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Synthesis {
    pub consensus_facts: Vec<String>,
    /// Element shape is model-determined; passed through opaquely.
    pub conflicts: Vec<Value>,
    pub key_insights: Vec<String>,
    pub paper_outline: PaperOutline,
    pub summary: String,
    pub compressed_context: String,
    pub confidence_score: f64,
    /// Set only by the hard-failure substitute record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Shared run state
// ---------------------------------------------------------------------------

/// Shared state threaded through one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// The research task, immutable for the lifetime of the run.
    pub task: String,
    pub research_data: Option<ResearchFindings>,
    pub critique: Option<Critique>,
    pub synthesis: Option<Synthesis>,
    pub report: Option<String>,
    /// Routing confidence derived from the latest critique, in [0, 1].
    pub confidence: f64,
    /// Completed research passes. Only grows, and only the researcher
    /// patch grows it.
    pub iteration: u32,
}

impl PipelineState {
    /// Create the initial state for a task.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            research_data: None,
            critique: None,
            synthesis: None,
            report: None,
            confidence: 0.0,
            iteration: 0,
        }
    }

    /// Fold a stage's partial update into the state.
    pub fn apply(&mut self, patch: StagePatch) {
        match patch {
            StagePatch::Research {
                findings,
                iteration,
            } => {
                self.research_data = Some(findings);
                self.iteration = iteration;
            }
            StagePatch::Critique {
                critique,
                confidence,
            } => {
                self.critique = Some(critique);
                self.confidence = confidence;
            }
            StagePatch::Synthesis { synthesis } => {
                self.synthesis = Some(synthesis);
            }
            StagePatch::Report { report } => {
                self.report = Some(report);
            }
        }
    }
}

/// Partial state update returned by one stage.
///
/// Each variant writes exactly the fields its stage owns; a stage cannot
/// touch another stage's output.
#[derive(Debug, Clone)]
pub enum StagePatch {
    Research {
        findings: ResearchFindings,
        iteration: u32,
    },
    Critique {
        critique: Critique,
        confidence: f64,
    },
    Synthesis {
        synthesis: Synthesis,
    },
    Report {
        report: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::Research.to_string(), "research");
        assert_eq!(PipelineStage::Synthesize.to_string(), "synthesize");
        assert_eq!(PipelineStage::Done.to_string(), "done");
    }

    #[test]
    fn test_epistemic_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&EpistemicStatus::Observed).unwrap(),
            "\"OBSERVED\""
        );
        assert_eq!(
            serde_json::to_string(&EpistemicStatus::OpenQuestion).unwrap(),
            "\"OPEN_QUESTION\""
        );
        let status: EpistemicStatus = serde_json::from_str("\"REPLICATED\"").unwrap();
        assert_eq!(status, EpistemicStatus::Replicated);
    }

    #[test]
    fn test_claim_missing_label_defaults_to_hypothesis() {
        let claim: Claim =
            serde_json::from_str(r#"{"statement": "the sky is green"}"#).unwrap();
        assert_eq!(claim.statement, "the sky is green");
        assert_eq!(claim.epistemic_status, EpistemicStatus::Hypothesis);
        assert_eq!(claim.confidence, 0.0);
        assert!(claim.evidence.is_empty());
    }

    #[test]
    fn test_findings_decode_from_empty_object() {
        // Any JSON object is a structurally valid findings record.
        let findings: ResearchFindings = serde_json::from_str("{}").unwrap();
        assert_eq!(findings, ResearchFindings::default());
        assert!(findings.claims.is_empty());
        assert!(!findings.real_time_dependency);
    }

    #[test]
    fn test_findings_reject_non_object() {
        assert!(serde_json::from_str::<ResearchFindings>("[1, 2, 3]").is_err());
        assert!(serde_json::from_str::<ResearchFindings>("\"just text\"").is_err());
    }

    #[test]
    fn test_critique_decodes_partial_payload() {
        let critique: Critique = serde_json::from_str(
            r#"{
                "verified": [{"statement": "a", "epistemic_status": "OBSERVED"}],
                "rejected": [{"statement": "b", "reason": "weak evidence"}]
            }"#,
        )
        .unwrap();
        assert_eq!(critique.verified.len(), 1);
        assert_eq!(critique.rejected[0].reason, "weak evidence");
        assert!(critique.rejected[0].required_fix.is_empty());
        assert_eq!(critique.confidence_score, 0.0);
    }

    #[test]
    fn test_synthesis_error_field_omitted_when_none() {
        let synthesis = Synthesis::default();
        let json = serde_json::to_value(&synthesis).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("paper_outline").is_some());
    }

    #[test]
    fn test_initial_state() {
        let state = PipelineState::new("quantum error correction progress");
        assert_eq!(state.task, "quantum error correction progress");
        assert_eq!(state.iteration, 0);
        assert_eq!(state.confidence, 0.0);
        assert!(state.research_data.is_none());
        assert!(state.report.is_none());
    }

    #[test]
    fn test_apply_research_patch() {
        let mut state = PipelineState::new("t");
        state.apply(StagePatch::Research {
            findings: ResearchFindings::default(),
            iteration: 1,
        });
        assert_eq!(state.iteration, 1);
        assert!(state.research_data.is_some());
        // Other stage outputs are untouched.
        assert!(state.critique.is_none());
        assert_eq!(state.confidence, 0.0);
    }

    #[test]
    fn test_apply_critique_patch_overwrites_previous() {
        let mut state = PipelineState::new("t");
        state.apply(StagePatch::Critique {
            critique: Critique::default(),
            confidence: 0.2,
        });
        state.apply(StagePatch::Critique {
            critique: Critique {
                confidence_score: 0.9,
                ..Critique::default()
            },
            confidence: 0.9,
        });
        assert_eq!(state.confidence, 0.9);
        assert_eq!(
            state.critique.as_ref().map(|c| c.confidence_score),
            Some(0.9)
        );
    }

    #[test]
    fn test_apply_report_patch() {
        let mut state = PipelineState::new("t");
        state.apply(StagePatch::Report {
            report: "# Title".to_string(),
        });
        assert_eq!(state.report.as_deref(), Some("# Title"));
    }
}
