//! Mock implementations for testing
//!
//! These mocks enable service tests without network I/O.

use super::traits::{DatabaseStorage, MessageStore, StoreError};
use crate::db::{ConversationId, Database, DbError, Message, MessageId, NewMessage};
use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

// ============================================================================
// Mock LLM Client
// ============================================================================

/// Mock LLM client that returns queued responses
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<LlmRequest>>,
    /// Store to snapshot at the moment each request arrives
    probe: Option<Database>,
    observed: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
            probe: None,
            observed: Mutex::new(Vec::new()),
        }
    }

    /// Record the store contents whenever a request arrives
    pub fn observing(mut self, db: Database) -> Self {
        self.probe = Some(db);
        self
    }

    /// Queue a successful response
    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    /// Queue an error response
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Store contents seen at each request
    pub fn observed_stores(&self) -> Vec<Vec<Message>> {
        self.observed.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlmClient {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(db) = &self.probe {
            self.observed.lock().unwrap().push(db.list_all().unwrap());
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

// ============================================================================
// Faulty Store (for storage fault propagation)
// ============================================================================

/// Which operation the faulty store breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// The n-th append (1-based) fails
    Append(usize),
    Update,
    Delete,
}

/// Store that delegates to a real database but fails one kind of operation
pub struct FaultyStore {
    inner: DatabaseStorage,
    fault: Fault,
    appends: AtomicUsize,
}

impl FaultyStore {
    pub fn new(db: Database, fault: Fault) -> Self {
        Self {
            inner: DatabaseStorage::new(db),
            fault,
            appends: AtomicUsize::new(0),
        }
    }

    fn fail() -> StoreError {
        StoreError::Db(DbError::Poisoned)
    }
}

#[async_trait]
impl MessageStore for FaultyStore {
    async fn append(&self, message: NewMessage) -> Result<MessageId, StoreError> {
        let nth = self.appends.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fault == Fault::Append(nth) {
            return Err(Self::fail());
        }
        self.inner.append(message).await
    }

    async fn update(&self, id: MessageId, text: String, pending: bool) -> Result<bool, StoreError> {
        if self.fault == Fault::Update {
            return Err(Self::fail());
        }
        self.inner.update(id, text, pending).await
    }

    async fn delete_by_id(&self, id: MessageId) -> Result<bool, StoreError> {
        if self.fault == Fault::Delete {
            return Err(Self::fail());
        }
        self.inner.delete_by_id(id).await
    }

    async fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<Message>, StoreError> {
        self.inner.list_by_conversation(conversation_id).await
    }
}
