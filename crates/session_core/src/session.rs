use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    responder::{Reply, Responder, ResponderError},
    state::{RejectReason, SessionState, SessionStatus},
    transcript::Transcript,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(RejectReason),
    /// The responder answered and its reply was appended.
    Replied,
    /// The exchange failed and the fallback reply was appended.
    FellBack,
}

/// One conversation: the transcript, the single-flight status and the draft.
///
/// State lives in a `watch` channel. Each transition replaces the whole
/// value in one `send_modify`, so readers only ever see settled states.
/// There is no controller timeout: a responder that never settles leaves
/// the session awaiting indefinitely.
pub struct ChatSession<R> {
    responder: R,
    state: watch::Sender<SessionState>,
}

impl<R: Responder> ChatSession<R> {
    pub fn new(responder: R) -> Self {
        let (state, _) = watch::channel(SessionState::new());
        Self { responder, state }
    }

    pub fn transcript(&self) -> Transcript {
        self.state.borrow().transcript().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.borrow().status()
    }

    pub fn draft(&self) -> String {
        self.state.borrow().draft().to_string()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every accepted transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn responder(&self) -> &R {
        &self.responder
    }

    pub fn set_draft(&self, draft: impl Into<String>) {
        let draft = draft.into();
        self.state.send_modify(|state| {
            *state = state.clone().with_draft(draft);
        });
    }

    pub async fn submit_draft(&self) -> SubmitOutcome {
        let draft = self.draft();
        self.submit(&draft).await
    }

    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        let mut issued = Err(RejectReason::EmptyInput);
        self.state.send_if_modified(|state| {
            let (next, request) = state.clone().submit(text);
            let accepted = request.is_ok();
            *state = next;
            issued = request;
            accepted
        });

        let request = match issued {
            Ok(request) => request,
            Err(reason) => {
                debug!(?reason, "submit ignored");
                return SubmitOutcome::Rejected(reason);
            }
        };

        let guard = SettleGuard::arm(&self.state);
        let entry_id = request.entry_id.0;
        info!(entry_id, "exchange issued");

        let outcome = self.responder.exchange(&request.text).await;
        let result = match &outcome {
            Ok(_) => SubmitOutcome::Replied,
            Err(error) => {
                warn!(entry_id, %error, "responder exchange failed; appending fallback reply");
                SubmitOutcome::FellBack
            }
        };
        guard.settle(outcome);
        result
    }
}

/// Settles the in-flight exchange when dropped unsettled, so the session
/// cannot stay awaiting after its `submit` future is dropped or unwinds.
struct SettleGuard<'a> {
    state: &'a watch::Sender<SessionState>,
    armed: bool,
}

impl<'a> SettleGuard<'a> {
    fn arm(state: &'a watch::Sender<SessionState>) -> Self {
        Self { state, armed: true }
    }

    fn settle(mut self, outcome: Result<Reply, ResponderError>) {
        self.armed = false;
        apply_settle(self.state, outcome);
    }
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("exchange abandoned before settling; appending fallback reply");
            apply_settle(self.state, Err(ResponderError::Cancelled));
        }
    }
}

fn apply_settle(state: &watch::Sender<SessionState>, outcome: Result<Reply, ResponderError>) {
    state.send_modify(|state| {
        *state = state.clone().settle(outcome);
    });
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
