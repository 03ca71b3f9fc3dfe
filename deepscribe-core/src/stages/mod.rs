//! Pipeline stages: researcher, critic, synthesizer, writer.
//!
//! Each stage is an async function of the shared state plus its
//! collaborators, returning a [`crate::state::StagePatch`]. Stages never
//! fail: every one converts an unusable model reply into a schema-valid
//! substitute record, so the orchestrator's loop has no error path.
//!
//! The schema-validation step is shared. [`check_shape`] decodes a
//! [`StructuredReply`] into the stage's record type and collapses the
//! outcome to three cases the validators branch on: the typed record, an
//! invalid payload with its raw text, or a failed cascade with its error.

pub mod critic;
pub mod researcher;
pub mod synthesizer;
pub mod writer;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::gateway::StructuredReply;

/// Outcome of checking a structured reply against a stage's required shape.
pub(crate) enum Shaped<T> {
    /// The reply decoded into the stage's record type.
    Valid(T),
    /// The reply arrived but was not the required shape. `raw` holds the
    /// reply text for substitute records built from it.
    Invalid { raw: String },
    /// The cascade failed outright.
    Failed { error: String },
}

/// Decode a structured reply into the stage's record type.
pub(crate) fn check_shape<T: DeserializeOwned>(reply: StructuredReply) -> Shaped<T> {
    match reply {
        StructuredReply::Valid(value) => match serde_json::from_value::<T>(value.clone()) {
            Ok(record) => Shaped::Valid(record),
            Err(_) => Shaped::Invalid {
                raw: value.to_string(),
            },
        },
        StructuredReply::Undecodable { raw_output } => Shaped::Invalid { raw: raw_output },
        StructuredReply::Failed { error } => Shaped::Failed { error },
    }
}

/// Truncate to at most `max` characters, never splitting a code point.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Serialize a record for embedding in a prompt. These records cannot fail
/// to serialize; an empty string stands in if one somehow does.
pub(crate) fn json_text<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResearchFindings;

    #[test]
    fn test_check_shape_valid_object() {
        let reply = StructuredReply::Valid(serde_json::json!({
            "research_paradigm": "empirical",
            "claims": []
        }));
        match check_shape::<ResearchFindings>(reply) {
            Shaped::Valid(findings) => assert_eq!(findings.research_paradigm, "empirical"),
            _ => panic!("expected valid shape"),
        }
    }

    #[test]
    fn test_check_shape_wrong_shape_keeps_raw() {
        // Valid JSON, but an array is not a findings record.
        let reply = StructuredReply::Valid(serde_json::json!([1, 2, 3]));
        match check_shape::<ResearchFindings>(reply) {
            Shaped::Invalid { raw } => assert_eq!(raw, "[1,2,3]"),
            _ => panic!("expected invalid shape"),
        }
    }

    #[test]
    fn test_check_shape_undecodable_keeps_raw() {
        let reply = StructuredReply::Undecodable {
            raw_output: "sorry, no JSON today".to_string(),
        };
        match check_shape::<ResearchFindings>(reply) {
            Shaped::Invalid { raw } => assert_eq!(raw, "sorry, no JSON today"),
            _ => panic!("expected invalid shape"),
        }
    }

    #[test]
    fn test_check_shape_failed_carries_error() {
        let reply = StructuredReply::Failed {
            error: "LLM Call Failed: timeout".to_string(),
        };
        match check_shape::<ResearchFindings>(reply) {
            Shaped::Failed { error } => assert!(error.contains("timeout")),
            _ => panic!("expected failed shape"),
        }
    }

    #[test]
    fn test_truncate_chars_is_char_safe() {
        // Multi-byte code points must not be split.
        let text = "héllo wörld ünïcode";
        let cut = truncate_chars(text, 7);
        assert_eq!(cut, "héllo w");

        let emoji = "🔬🔬🔬🔬";
        assert_eq!(truncate_chars(emoji, 2), "🔬🔬");
    }

    #[test]
    fn test_truncate_chars_short_input_unchanged() {
        assert_eq!(truncate_chars("abc", 1000), "abc");
        assert_eq!(truncate_chars("", 10), "");
    }
}
