//! Async storage boundary for the conversation service
//!
//! The service only needs four operations; [`DatabaseStorage`] provides them
//! by running each [`Database`] call on tokio's blocking pool.

use crate::db::{ConversationId, Database, DbError, DbResult, Message, MessageId, NewMessage};
use async_trait::async_trait;
use thiserror::Error;

/// Storage fault. Unexpected, so the service never handles it.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Storage for conversation messages
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message and return its assigned id
    async fn append(&self, message: NewMessage) -> Result<MessageId, StoreError>;

    /// Rewrite text and pending flag; `Ok(false)` when the id does not exist
    async fn update(&self, id: MessageId, text: String, pending: bool) -> Result<bool, StoreError>;

    /// Delete a message; `Ok(false)` when the id does not exist
    async fn delete_by_id(&self, id: MessageId) -> Result<bool, StoreError>;

    /// All messages of a conversation, ordered by id
    async fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError>;
}

// ============================================================================
// Production Adapter
// ============================================================================

/// Adapter to use Database as `MessageStore`
#[derive(Clone)]
pub struct DatabaseStorage {
    db: Database,
}

impl DatabaseStorage {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[allow(dead_code)] // Useful for tests
    pub fn inner(&self) -> &Database {
        &self.db
    }

    async fn run<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> DbResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || op(&db)).await?;
        Ok(result?)
    }
}

#[async_trait]
impl MessageStore for DatabaseStorage {
    async fn append(&self, message: NewMessage) -> Result<MessageId, StoreError> {
        self.run(move |db| db.append(&message)).await
    }

    async fn update(&self, id: MessageId, text: String, pending: bool) -> Result<bool, StoreError> {
        self.run(move |db| db.update(id, &text, pending)).await
    }

    async fn delete_by_id(&self, id: MessageId) -> Result<bool, StoreError> {
        self.run(move |db| db.delete_by_id(id)).await
    }

    async fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        self.run(move |db| db.list_by_conversation(conversation_id))
            .await
    }
}
