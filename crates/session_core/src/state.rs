//! Pure session transitions.
//!
//! `submit` takes the current state and the user's text and yields the next
//! state plus, when accepted, the request to hand to the responder. `settle`
//! folds the responder's outcome back in. Neither performs I/O.

use shared::domain::{Entry, EntryId, FALLBACK_REPLY, GREETING};

use crate::{
    responder::{Reply, ResponderError},
    transcript::Transcript,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    AwaitingResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    RequestInFlight,
}

/// What the responder must be asked after an accepted submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// Id of the user entry this request answers.
    pub entry_id: EntryId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    transcript: Transcript,
    status: SessionStatus,
    draft: String,
    next_id: EntryId,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            transcript: Transcript::seeded(Entry::bot(EntryId::SEED, GREETING)),
            status: SessionStatus::Idle,
            draft: String::new(),
            next_id: EntryId::SEED.next(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    #[must_use]
    pub fn with_draft(self, draft: impl Into<String>) -> Self {
        Self {
            draft: draft.into(),
            ..self
        }
    }

    /// Accepts `text` only when it is not blank and nothing is in flight.
    /// A rejected submit returns the state unchanged.
    pub fn submit(self, text: &str) -> (Self, Result<OutboundRequest, RejectReason>) {
        if text.trim().is_empty() {
            return (self, Err(RejectReason::EmptyInput));
        }
        if self.status == SessionStatus::AwaitingResponse {
            return (self, Err(RejectReason::RequestInFlight));
        }

        let entry_id = self.next_id;
        let next = Self {
            transcript: self.transcript.appended(Entry::user(entry_id, text)),
            status: SessionStatus::AwaitingResponse,
            draft: String::new(),
            next_id: entry_id.next(),
        };
        let request = OutboundRequest {
            entry_id,
            text: text.to_string(),
        };
        (next, Ok(request))
    }

    /// Appends the bot entry for a settled exchange and returns to idle.
    /// No-op when nothing is in flight.
    #[must_use]
    pub fn settle(self, outcome: Result<Reply, ResponderError>) -> Self {
        if self.status == SessionStatus::Idle {
            return self;
        }

        let content = match outcome {
            Ok(reply) => reply.text,
            Err(_) => FALLBACK_REPLY.to_string(),
        };
        let entry_id = self.next_id;
        Self {
            transcript: self.transcript.appended(Entry::bot(entry_id, content)),
            status: SessionStatus::Idle,
            draft: self.draft,
            next_id: entry_id.next(),
        }
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
