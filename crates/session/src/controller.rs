//! The analysis session state machine.
//!
//! Owns the candidate file, the in-flight/completed analysis, the chat
//! transcript, and the error state, and is the only place any of them
//! change. The two suspending operations (analysis, chat) are split
//! into a synchronous guard step and a completion step; the async
//! `run_analysis`/`ask` wrappers drive the remote services between the
//! two. A second attempt while one is outstanding is rejected
//! synchronously, never queued.

use std::sync::Arc;

use services::{AnalysisService, ChatService, ServiceError};
use shared::events::SessionEvent;
use shared::types::{
    AnalysisResult, ChatMessage, Role, SessionPhase, SessionSnapshot, UploadCandidate,
};
use tracing::{debug, info, warn};

use crate::gate;
use crate::persist::SnapshotStore;
use crate::transcript::Transcript;

/// Narratives shorter than this are assumed not to be a real analysis
/// and fall back to the synthesized summary.
const MIN_NARRATIVE_LEN: usize = 40;

type Listener = Box<dyn Fn(&SessionEvent) + Send>;

/// Payload handed out by [`SessionController::start_analysis`]; resolve
/// it by calling the analysis service and passing the outcome to
/// [`SessionController::complete_analysis`].
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub candidate: UploadCandidate,
    pub area: Option<String>,
}

/// Aggregate read model handed to the presentation layer. Presentation
/// never mutates session state directly; everything goes through the
/// controller entry points.
#[derive(Debug)]
pub struct SessionState<'a> {
    pub candidate: Option<&'a UploadCandidate>,
    pub result: Option<&'a AnalysisResult>,
    pub transcript: &'a [ChatMessage],
    pub phase: SessionPhase,
    pub pending_question: bool,
    pub last_error: Option<&'a str>,
}

pub struct SessionController {
    candidate: Option<UploadCandidate>,
    result: Option<AnalysisResult>,
    transcript: Transcript,
    phase: SessionPhase,
    last_error: Option<String>,
    area: Option<String>,
    analysis: Arc<dyn AnalysisService>,
    chat: Arc<dyn ChatService>,
    store: Box<dyn SnapshotStore>,
    listeners: Vec<Listener>,
}

impl SessionController {
    /// Build a controller and attempt restoration from the store. A
    /// well-formed persisted snapshot puts the session straight into
    /// `Ready`; anything else starts `Idle`.
    pub fn new(
        analysis: Arc<dyn AnalysisService>,
        chat: Arc<dyn ChatService>,
        store: Box<dyn SnapshotStore>,
    ) -> Self {
        let mut controller = Self {
            candidate: None,
            result: None,
            transcript: Transcript::new(),
            phase: SessionPhase::Idle,
            last_error: None,
            area: None,
            analysis,
            chat,
            store,
            listeners: Vec::new(),
        };
        controller.restore();
        controller
    }

    fn restore(&mut self) {
        let Some(snapshot) = self.store.load() else {
            debug!("no persisted analysis to restore");
            return;
        };
        let file_name = snapshot.file_name;
        info!(file = %file_name, "restored previous analysis");
        self.transcript.restore(snapshot.transcript);
        self.result = Some(snapshot.result);
        self.area = snapshot.area_name;
        self.phase = SessionPhase::Ready;
        self.notify(&SessionEvent::Restored { file_name });
    }

    /// Register a change listener. Every state mutation fires exactly
    /// one event; listeners pull fresh state via [`Self::state`].
    pub fn subscribe(&mut self, listener: impl Fn(&SessionEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self, event: &SessionEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn state(&self) -> SessionState<'_> {
        SessionState {
            candidate: self.candidate.as_ref(),
            result: self.result.as_ref(),
            transcript: self.transcript.messages(),
            phase: self.phase,
            pending_question: self.transcript.question_pending(),
            last_error: self.last_error.as_deref(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn candidate(&self) -> Option<&UploadCandidate> {
        self.candidate.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        self.transcript.messages()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn question_pending(&self) -> bool {
        self.transcript.question_pending()
    }

    /// Optional free-text label sent with the upload and persisted
    /// alongside the result.
    pub fn set_area(&mut self, area: Option<String>) {
        self.area = area.filter(|a| !a.trim().is_empty());
    }

    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    /// Run a selected/dropped file through the acceptance gate.
    /// Replacing a candidate discards the previous candidate, not a
    /// previously completed result. Returns whether the file was
    /// accepted.
    pub fn select_file(&mut self, name: &str, data: Vec<u8>) -> bool {
        if self.phase == SessionPhase::Analyzing {
            debug!("analysis in flight; file selection ignored");
            return false;
        }
        self.phase = SessionPhase::Validating;
        match gate::accept(name, data) {
            Ok(candidate) => {
                self.phase = if self.result.is_some() {
                    SessionPhase::Ready
                } else {
                    SessionPhase::Idle
                };
                self.last_error = None;
                let event = SessionEvent::CandidateSelected {
                    name: candidate.name.clone(),
                };
                self.candidate = Some(candidate);
                self.notify(&event);
                true
            }
            Err(err) => {
                let reason = err.to_string();
                debug!(file = name, %reason, "file rejected");
                self.phase = SessionPhase::Errored;
                self.last_error = Some(reason.clone());
                self.notify(&SessionEvent::CandidateRejected { reason });
                false
            }
        }
    }

    /// Drop the candidate. A completed result is untouched.
    pub fn remove_file(&mut self) {
        if self.candidate.take().is_some() {
            self.notify(&SessionEvent::CandidateRemoved);
        }
    }

    /// Guard step of the analysis operation. A no-op (`None`) when no
    /// candidate is held or an analysis is already in flight. On
    /// acceptance the session enters `Analyzing` and the prior
    /// result/transcript/error are cleared.
    pub fn start_analysis(&mut self) -> Option<AnalysisRequest> {
        if self.phase == SessionPhase::Analyzing {
            debug!("analysis already in flight; request rejected");
            return None;
        }
        let Some(candidate) = self.candidate.clone() else {
            debug!("no candidate held; nothing to analyze");
            return None;
        };

        self.phase = SessionPhase::Analyzing;
        self.result = None;
        self.transcript.clear();
        self.last_error = None;
        info!(file = %candidate.name, "analysis started");
        self.notify(&SessionEvent::AnalysisStarted {
            file_name: candidate.name.clone(),
        });
        Some(AnalysisRequest {
            candidate,
            area: self.area.clone(),
        })
    }

    /// Completion step of the analysis operation. On success the
    /// result is stored, the transcript seeded, and the snapshot
    /// persisted; on failure the candidate is kept so the user can
    /// retry without re-selecting the file.
    pub fn complete_analysis(&mut self, outcome: Result<AnalysisResult, ServiceError>) {
        if self.phase != SessionPhase::Analyzing {
            warn!("analysis completion with none in flight; ignored");
            return;
        }
        match outcome {
            Ok(result) => {
                let seed = seed_message(&result);
                let anomaly_count = result.summary.anomaly_count();
                info!(file = %result.filename, anomalies = anomaly_count, "analysis ready");
                self.result = Some(result);
                self.candidate = None;
                self.phase = SessionPhase::Ready;
                self.transcript.seed(seed);
                self.persist();
                self.notify(&SessionEvent::AnalysisCompleted { anomaly_count });
            }
            Err(err) => {
                let message = err.to_string();
                warn!(%message, "analysis failed");
                self.phase = SessionPhase::Errored;
                self.last_error = Some(message.clone());
                self.notify(&SessionEvent::AnalysisFailed { message });
            }
        }
    }

    /// Full analysis round trip against the configured service.
    /// Returns whether the session ended up `Ready`.
    pub async fn run_analysis(&mut self) -> bool {
        let Some(request) = self.start_analysis() else {
            return false;
        };
        let outcome = self
            .analysis
            .analyze(&request.candidate, request.area.as_deref())
            .await;
        self.complete_analysis(outcome);
        self.phase == SessionPhase::Ready
    }

    /// Guard step of the chat operation. A no-op when no analysis is
    /// loaded, the text trims to empty, or a question is pending.
    pub fn begin_question(&mut self, text: &str) -> Option<String> {
        if self.result.is_none() {
            debug!("no analysis loaded; question ignored");
            return None;
        }
        let accepted = self.transcript.begin_question(text)?;
        self.notify(&SessionEvent::MessageAppended { role: Role::User });
        Some(accepted)
    }

    /// Completion step of the chat operation. A failed call appends
    /// the fixed fallback text instead of surfacing an error; either
    /// way the updated transcript is persisted.
    pub fn complete_question(&mut self, outcome: Result<String, ServiceError>) {
        if !self.transcript.question_pending() {
            warn!("chat completion with no question pending; ignored");
            return;
        }
        let answer = match outcome {
            Ok(answer) => Some(answer),
            Err(err) => {
                warn!(error = %err, "chat request failed; substituting fallback");
                None
            }
        };
        self.transcript.complete_question(answer);
        self.persist();
        self.notify(&SessionEvent::MessageAppended {
            role: Role::Assistant,
        });
    }

    /// Full question round trip against the configured service.
    /// Returns whether the question was accepted.
    pub async fn ask(&mut self, text: &str) -> bool {
        let context = match &self.result {
            Some(result) => result.context_view(),
            None => {
                debug!("no analysis loaded; question ignored");
                return false;
            }
        };
        let Some(question) = self.begin_question(text) else {
            return false;
        };
        let outcome = self.chat.chat(&question, &context).await;
        self.complete_question(outcome);
        true
    }

    /// Wipe everything back to idle. The only operation that purges
    /// persisted storage.
    pub fn reset(&mut self) {
        self.candidate = None;
        self.result = None;
        self.transcript.clear();
        self.last_error = None;
        self.area = None;
        self.phase = SessionPhase::Idle;
        self.store.clear();
        info!("session reset");
        self.notify(&SessionEvent::Reset);
    }

    fn persist(&self) {
        // Never persist while an analysis is in flight.
        if self.phase == SessionPhase::Analyzing {
            return;
        }
        let Some(result) = &self.result else {
            return;
        };
        let snapshot = SessionSnapshot {
            file_name: result.filename.clone(),
            result: result.clone(),
            transcript: self.transcript.messages().to_vec(),
            area_name: self.area.clone(),
        };
        self.store.save(&snapshot);
    }
}

/// First assistant message after a successful analysis. The backend
/// narrative is used verbatim when it plausibly is a real analysis;
/// otherwise a summary is synthesized from the structured fields so
/// the chat is never seeded empty. The heuristic cannot tell a long
/// error message that doesn't start with "error" from a real
/// narrative.
fn seed_message(result: &AnalysisResult) -> String {
    if let Some(narrative) = &result.narrative {
        let trimmed = narrative.trim();
        if trimmed.len() >= MIN_NARRATIVE_LEN
            && !trimmed.to_lowercase().starts_with("error")
        {
            return trimmed.to_string();
        }
    }
    result.summary.describe()
}
