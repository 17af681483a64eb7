//! Caller-facing query outcomes.
//!
//! Every exit path of the pipeline is one of these variants; nothing
//! escapes as an unstructured failure. Only `SynthesisFailed` is a genuine
//! error the caller should report as such — the rest are normal results
//! rendered as guidance ("did you mean…", "no reviews for that aspect").

use crate::synthesize::Answer;
use ratewise_catalog::{Aspect, Candidate};
use serde::{Deserialize, Serialize};

/// Outcome of a full query-resolution pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryOutcome {
    /// The question was answered from retrieved fragments
    Answered { answer: Answer },

    /// The name reference matched several instructors too closely to pick
    Ambiguous { candidates: Vec<Candidate> },

    /// No instructor scored above the match threshold
    NotFound,

    /// The resolved instructor has no eligible fragments for the request
    /// (or none that fit the token budget)
    NoData { aspects: Vec<Aspect> },

    /// The model call failed (timeout, transport, or provider rejection)
    SynthesisFailed { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization_tags() {
        let json = serde_json::to_string(&QueryOutcome::NotFound).unwrap();
        assert!(json.contains("\"outcome\":\"not_found\""));

        let json = serde_json::to_string(&QueryOutcome::NoData {
            aspects: vec![Aspect::Workload],
        })
        .unwrap();
        assert!(json.contains("\"outcome\":\"no_data\""));
        assert!(json.contains("workload"));

        let json = serde_json::to_string(&QueryOutcome::SynthesisFailed {
            reason: "timed out".to_string(),
        })
        .unwrap();
        assert!(json.contains("\"outcome\":\"synthesis_failed\""));
    }
}
