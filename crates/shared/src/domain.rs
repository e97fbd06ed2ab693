use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);
    };
}

id_newtype!(EntryId);

impl EntryId {
    /// Id of the seed greeting every session starts with.
    pub const SEED: EntryId = EntryId(1);

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

pub const GREETING: &str = "Hello! I am your AI assistant. How can I help you today?";

pub const FALLBACK_REPLY: &str =
    "Sorry, I encountered an error simulating the response. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

/// One transcript item.
///
/// `created_at` is for display only; transcript order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn user(id: EntryId, content: impl Into<String>) -> Self {
        Self::new(id, Role::User, content)
    }

    pub fn bot(id: EntryId, content: impl Into<String>) -> Self {
        Self::new(id, Role::Bot, content)
    }

    fn new(id: EntryId, role: Role, content: impl Into<String>) -> Self {
        Self {
            id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
