//! Change notifications emitted by the session controller.
//!
//! The core holds no rendering logic; every state mutation emits one of
//! these so the presentation layer can re-render whatever it wants.

use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One notification per completed state mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A file passed the acceptance gate and is held as the candidate.
    CandidateSelected { name: String },
    /// The candidate was discarded without running an analysis.
    CandidateRemoved,
    /// A file was rejected before entering the workflow.
    CandidateRejected { reason: String },
    /// An analysis request went out; the session is now busy.
    AnalysisStarted { file_name: String },
    /// The analysis came back and the transcript was seeded.
    AnalysisCompleted { anomaly_count: u64 },
    /// The analysis failed; the candidate is retained for retry.
    AnalysisFailed { message: String },
    /// A transcript entry was appended (user question, assistant
    /// answer, or the seed message).
    MessageAppended { role: Role },
    /// A previously persisted analysis was restored at startup.
    Restored { file_name: String },
    /// The session was wiped back to idle and storage cleared.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_serialize() {
        let event = SessionEvent::AnalysisCompleted { anomaly_count: 7 };
        let json = serde_json::to_string(&event).unwrap();
        let back: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
