//! Chat session controller and the responder client it talks to.
//!
//! [`SessionState`] holds the pure transitions (`submit`, `settle`) and
//! [`ChatSession`] drives them against a [`Responder`].

pub mod responder;
pub mod session;
pub mod state;
pub mod transcript;

pub use responder::{HttpResponder, Reply, Responder, ResponderError};
pub use session::{ChatSession, SubmitOutcome};
pub use state::{OutboundRequest, RejectReason, SessionState, SessionStatus};
pub use transcript::Transcript;
