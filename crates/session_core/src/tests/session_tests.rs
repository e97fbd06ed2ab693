use super::*;
use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use shared::domain::{Role, FALLBACK_REPLY, GREETING};
use tokio::sync::{oneshot, Mutex};

/// Answers from a fixed script, recording every text it was asked.
struct ScriptedResponder {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedResponder {
    fn new(script: impl IntoIterator<Item = Result<&'static str, &'static str>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|step| step.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        }
    }

    async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Responder for ScriptedResponder {
    async fn exchange(&self, text: &str) -> Result<Reply, ResponderError> {
        self.calls.lock().await.push(text.to_string());
        match self.script.lock().await.pop_front() {
            Some(Ok(reply)) => Ok(Reply::new(reply)),
            Some(Err(_)) | None => Err(ResponderError::Cancelled),
        }
    }
}

/// Holds each exchange open until the test releases its gate.
struct GatedResponder {
    gates: Mutex<VecDeque<oneshot::Receiver<Result<String, String>>>>,
    calls: Mutex<Vec<String>>,
}

impl GatedResponder {
    fn new(count: usize) -> (Self, Vec<oneshot::Sender<Result<String, String>>>) {
        let (senders, receivers): (Vec<_>, VecDeque<_>) =
            (0..count).map(|_| oneshot::channel()).unzip();
        (
            Self {
                gates: Mutex::new(receivers),
                calls: Mutex::new(Vec::new()),
            },
            senders,
        )
    }
}

#[async_trait]
impl Responder for GatedResponder {
    async fn exchange(&self, text: &str) -> Result<Reply, ResponderError> {
        self.calls.lock().await.push(text.to_string());
        let gate = self.gates.lock().await.pop_front();
        let Some(gate) = gate else {
            return Err(ResponderError::Cancelled);
        };
        match gate.await {
            Ok(Ok(reply)) => Ok(Reply::new(reply)),
            Ok(Err(_)) | Err(_) => Err(ResponderError::Cancelled),
        }
    }
}

fn contents(transcript: &Transcript) -> Vec<(Role, String)> {
    transcript
        .iter()
        .map(|entry| (entry.role, entry.content.clone()))
        .collect()
}

async fn wait_until_awaiting(session: &ChatSession<GatedResponder>) {
    let mut rx = session.subscribe();
    rx.wait_for(|state| state.status() == SessionStatus::AwaitingResponse)
        .await
        .expect("session alive");
}

#[tokio::test]
async fn fresh_session_shows_greeting_and_is_idle() {
    let session = ChatSession::new(ScriptedResponder::new([]));

    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(
        contents(&session.transcript()),
        vec![(Role::Bot, GREETING.to_string())]
    );
}

#[tokio::test]
async fn successful_exchange_appends_user_and_bot_entries() {
    let session = ChatSession::new(ScriptedResponder::new([Ok("Hello back!")]));

    let outcome = session.submit("Hi").await;

    assert_eq!(outcome, SubmitOutcome::Replied);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(
        contents(&session.transcript())[1..],
        [
            (Role::User, "Hi".to_string()),
            (Role::Bot, "Hello back!".to_string()),
        ]
    );
}

#[tokio::test]
async fn failed_exchange_appends_fallback_and_session_stays_usable() {
    let session = ChatSession::new(ScriptedResponder::new([Err("refused"), Ok("recovered")]));

    assert_eq!(session.submit("ping").await, SubmitOutcome::FellBack);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(
        contents(&session.transcript())[1..],
        [
            (Role::User, "ping".to_string()),
            (Role::Bot, FALLBACK_REPLY.to_string()),
        ]
    );

    assert_eq!(session.submit("again").await, SubmitOutcome::Replied);
    assert_eq!(
        session.transcript().last().map(|entry| entry.content.clone()),
        Some("recovered".to_string())
    );
}

#[tokio::test]
async fn blank_submit_is_a_no_op_and_never_calls_responder() {
    let session = ChatSession::new(ScriptedResponder::new([Ok("unused")]));
    let before = session.snapshot();

    for text in ["", "  ", "\t\n"] {
        assert_eq!(
            session.submit(text).await,
            SubmitOutcome::Rejected(RejectReason::EmptyInput)
        );
    }

    assert_eq!(session.snapshot(), before);
    assert!(session.responder().calls().await.is_empty());
}

#[tokio::test]
async fn text_is_forwarded_verbatim() {
    let session = ChatSession::new(ScriptedResponder::new([Ok("ok")]));

    session.submit("  spaced <b>out</b>  ").await;

    assert_eq!(
        session.responder().calls().await,
        vec!["  spaced <b>out</b>  ".to_string()]
    );
    assert_eq!(session.transcript().entries()[1].content, "  spaced <b>out</b>  ");
}

#[tokio::test]
async fn second_submit_while_in_flight_is_dropped() {
    let (responder, mut gates) = GatedResponder::new(2);
    let session = Arc::new(ChatSession::new(responder));

    let first = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.submit("first").await })
    };
    wait_until_awaiting(&session).await;

    assert_eq!(
        session.submit("second").await,
        SubmitOutcome::Rejected(RejectReason::RequestInFlight)
    );
    assert_eq!(session.status(), SessionStatus::AwaitingResponse);
    assert_eq!(session.transcript().len(), 2);

    let gate = gates.remove(0);
    gate.send(Ok("first reply".to_string())).expect("gate open");
    assert_eq!(first.await.expect("join"), SubmitOutcome::Replied);
    assert_eq!(session.status(), SessionStatus::Idle);

    let gate = gates.remove(0);
    gate.send(Ok("second reply".to_string())).expect("gate open");
    assert_eq!(session.submit("second").await, SubmitOutcome::Replied);

    assert_eq!(
        contents(&session.transcript())[1..],
        [
            (Role::User, "first".to_string()),
            (Role::Bot, "first reply".to_string()),
            (Role::User, "second".to_string()),
            (Role::Bot, "second reply".to_string()),
        ]
    );
    assert_eq!(
        *session.responder().calls.lock().await,
        vec!["first".to_string(), "second".to_string()]
    );
}

#[tokio::test]
async fn reads_mid_request_see_the_user_entry_and_awaiting_status() {
    let (responder, mut gates) = GatedResponder::new(1);
    let session = Arc::new(ChatSession::new(responder));

    let pending = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.submit("hold on").await })
    };
    wait_until_awaiting(&session).await;

    let transcript = session.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.last().map(|entry| entry.role), Some(Role::User));

    gates
        .remove(0)
        .send(Err("upstream 502".to_string()))
        .expect("gate open");
    assert_eq!(pending.await.expect("join"), SubmitOutcome::FellBack);

    // The earlier snapshot is unaffected by the settlement.
    assert_eq!(transcript.len(), 2);
    assert_eq!(session.transcript().len(), 3);
}

#[tokio::test]
async fn abandoned_submit_still_returns_session_to_idle() {
    let (responder, _gates) = GatedResponder::new(1);
    let session = Arc::new(ChatSession::new(responder));

    let pending = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.submit("never answered").await })
    };
    wait_until_awaiting(&session).await;

    pending.abort();
    assert!(pending.await.expect_err("aborted").is_cancelled());

    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(session.transcript().len(), 3);
    assert_eq!(
        session.transcript().last().map(|entry| entry.content.clone()),
        Some(FALLBACK_REPLY.to_string())
    );
}

#[tokio::test]
async fn submit_draft_clears_the_staging_buffer() {
    let session = ChatSession::new(ScriptedResponder::new([Ok("noted")]));

    session.set_draft("remember this");
    assert_eq!(session.draft(), "remember this");

    assert_eq!(session.submit_draft().await, SubmitOutcome::Replied);
    assert!(session.draft().is_empty());
    assert_eq!(session.transcript().entries()[1].content, "remember this");
}

#[tokio::test]
async fn blank_draft_is_kept_when_submit_is_rejected() {
    let session = ChatSession::new(ScriptedResponder::new([]));

    session.set_draft("   ");
    assert_eq!(
        session.submit_draft().await,
        SubmitOutcome::Rejected(RejectReason::EmptyInput)
    );
    assert_eq!(session.draft(), "   ");
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn shared_responder_serves_independent_sessions() {
    let responder = Arc::new(ScriptedResponder::new([Ok("one"), Ok("two")]));
    let alpha = ChatSession::new(Arc::clone(&responder));
    let beta = ChatSession::new(Arc::clone(&responder));

    alpha.submit("a").await;
    beta.submit("b").await;

    assert_eq!(alpha.transcript().len(), 3);
    assert_eq!(beta.transcript().len(), 3);
    assert_eq!(responder.calls().await, vec!["a".to_string(), "b".to_string()]);
}
