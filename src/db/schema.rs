//! Database schema and types

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Bumped whenever `SCHEMA` changes shape. A database carrying any other
/// version is dropped and recreated on open.
pub const SCHEMA_VERSION: i64 = 2;

/// SQL schema for initialization
pub const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    is_user BOOLEAN NOT NULL,
    conversation_id INTEGER NOT NULL,
    pending BOOLEAN NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, id);
";

/// Destructive migration: wipes the message log.
pub const DROP_SCHEMA: &str = r"
DROP INDEX IF EXISTS idx_messages_conversation;
DROP TABLE IF EXISTS messages;
";

/// Store-assigned message identifier, strictly increasing in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Groups messages into one chat thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationId(pub i64);

impl ConversationId {
    /// A fresh conversation keyed by the current time in milliseconds
    pub fn fresh() -> Self {
        Self(Utc::now().timestamp_millis())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored message record
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub is_user: bool,
    pub conversation_id: ConversationId,
    /// Set only on an assistant placeholder awaiting its reply
    pub pending: bool,
    pub created_at: DateTime<Utc>,
}

/// Message about to be appended; the store assigns the id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub text: String,
    pub is_user: bool,
    pub conversation_id: ConversationId,
    pub pending: bool,
}

impl NewMessage {
    pub fn user(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            conversation_id,
            pending: false,
        }
    }

    pub fn assistant(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            conversation_id,
            pending: false,
        }
    }

    /// Provisional assistant record shown while a reply is outstanding
    pub fn placeholder(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self {
            pending: true,
            ..Self::assistant(conversation_id, text)
        }
    }
}

/// Full ordered record set published after every write
pub type Snapshot = Arc<[Message]>;
