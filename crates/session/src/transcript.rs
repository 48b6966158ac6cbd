//! Append-only chat transcript with the single-question guard.
//!
//! Insertion order is conversational order is display order. Entries
//! are never reordered or removed individually; the whole transcript
//! is cleared when a new analysis starts or the session resets.

use shared::types::{ChatMessage, Role};
use tracing::debug;

/// Substituted for the assistant reply when the chat call fails, so
/// the transcript stays consistent instead of surfacing a structural
/// error.
pub const FALLBACK_ANSWER: &str = "Failed to get a response. Please try again.";

#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    pending: bool,
    next_sequence: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a question is currently awaiting its answer.
    pub fn question_pending(&self) -> bool {
        self.pending
    }

    fn append(&mut self, role: Role, text: String) {
        self.messages.push(ChatMessage {
            role,
            text,
            sequence: self.next_sequence,
        });
        self.next_sequence += 1;
    }

    /// First assistant message after an analysis completes.
    pub fn seed(&mut self, text: impl Into<String>) {
        self.append(Role::Assistant, text.into());
    }

    /// Try to open an exchange. Returns the trimmed question when
    /// accepted, `None` (a no-op) when the text trims to empty or a
    /// question is already pending. A rejected question is never
    /// queued.
    pub fn begin_question(&mut self, text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        if self.pending {
            debug!("question already pending; new question rejected");
            return None;
        }
        // Optimistic append: the user message lands before the remote
        // call is made.
        self.append(Role::User, trimmed.to_string());
        self.pending = true;
        Some(trimmed.to_string())
    }

    /// Close the open exchange with the assistant's answer, or the
    /// fixed fallback text when the call failed.
    pub fn complete_question(&mut self, answer: Option<String>) {
        if !self.pending {
            debug!("completion with no question pending; ignored");
            return;
        }
        self.append(
            Role::Assistant,
            answer.unwrap_or_else(|| FALLBACK_ANSWER.to_string()),
        );
        self.pending = false;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = false;
        self.next_sequence = 0;
    }

    /// Adopt a persisted transcript; sequence numbering continues
    /// after the restored maximum.
    pub fn restore(&mut self, messages: Vec<ChatMessage>) {
        self.next_sequence = messages
            .iter()
            .map(|m| m.sequence + 1)
            .max()
            .unwrap_or(0);
        self.messages = messages;
        self.pending = false;
    }
}
