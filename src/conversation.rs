//! Turn orchestration
//!
//! One turn is: store the user's message, insert a pending placeholder for the
//! reply, ask the model, then either resolve the placeholder into the reply or
//! delete it. Model failures end the turn with a [`Notice`]; storage failures
//! are returned as errors.

pub mod traits;

#[cfg(test)]
pub mod testing;

pub use traits::*;

use crate::db::{ConversationId, Message, MessageId, NewMessage};
use crate::llm::{LlmError, LlmMessage, LlmRequest, LlmService, MessageRole};
use crate::prompt::compose_prompt;
use std::fmt;
use std::sync::Arc;

/// Text of the placeholder shown while a reply is outstanding
pub const PLACEHOLDER_TEXT: &str = "Typing...";

/// Stored reply when the model answers without any text
pub const EMPTY_REPLY_TEXT: &str = "No response";

/// User-facing classification of a failed turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    NoConnection,
    UnknownError,
}

impl Notice {
    pub fn classify(error: &LlmError) -> Self {
        if error.kind.is_connectivity() {
            Self::NoConnection
        } else {
            Self::UnknownError
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::NoConnection => "No internet connection. Please check your network.",
            Self::UnknownError => "Unknown error occurred. Please try again.",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Input was empty; nothing was stored or sent
    Skipped,
    /// The placeholder now holds the reply
    Replied { message_id: MessageId, text: String },
    /// The model call failed and the placeholder was removed
    Failed { notice: Notice },
}

/// Orchestrates turns against a message store and a model
pub struct ConversationService<S, L>
where
    S: MessageStore,
    L: LlmService + ?Sized,
{
    store: S,
    llm: Arc<L>,
    max_tokens: Option<u32>,
}

impl<S, L> ConversationService<S, L>
where
    S: MessageStore,
    L: LlmService + ?Sized,
{
    pub fn new(store: S, llm: Arc<L>) -> Self {
        Self {
            store,
            llm,
            max_tokens: None,
        }
    }

    /// Cap the length of generated replies
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Run one turn.
    ///
    /// `directive` is free-form instruction text placed ahead of the question
    /// in the prompt; the stored user message holds only the question.
    pub async fn send_user_message(
        &self,
        text: &str,
        conversation_id: ConversationId,
        directive: &str,
    ) -> Result<TurnOutcome, StoreError> {
        let question = text.trim();
        if question.is_empty() {
            return Ok(TurnOutcome::Skipped);
        }

        let user_id = self
            .store
            .append(NewMessage::user(conversation_id, question))
            .await?;
        tracing::info!(conv_id = %conversation_id, message_id = %user_id, "User message stored");

        let history = self.store.list_by_conversation(conversation_id).await?;
        let request = LlmRequest {
            messages: build_messages(&history, user_id, &compose_prompt(directive, question)),
            max_tokens: self.max_tokens,
        };

        // Visible to observers before the model is asked
        let placeholder_id = self
            .store
            .append(NewMessage::placeholder(conversation_id, PLACEHOLDER_TEXT))
            .await?;

        match self.llm.complete(&request).await {
            Ok(response) => {
                let reply = response
                    .text
                    .unwrap_or_else(|| EMPTY_REPLY_TEXT.to_string());

                if !self
                    .store
                    .update(placeholder_id, reply.clone(), false)
                    .await?
                {
                    tracing::warn!(
                        conv_id = %conversation_id,
                        message_id = %placeholder_id,
                        "Reply placeholder disappeared before it could be resolved"
                    );
                }

                tracing::info!(
                    conv_id = %conversation_id,
                    message_id = %placeholder_id,
                    reply_len = reply.len(),
                    "Turn completed"
                );
                Ok(TurnOutcome::Replied {
                    message_id: placeholder_id,
                    text: reply,
                })
            }
            Err(error) => {
                self.store.delete_by_id(placeholder_id).await?;

                let notice = Notice::classify(&error);
                tracing::warn!(
                    conv_id = %conversation_id,
                    kind = ?error.kind,
                    error = %error,
                    ?notice,
                    "Turn failed, placeholder removed"
                );
                Ok(TurnOutcome::Failed { notice })
            }
        }
    }
}

/// Role-tagged history of everything stored before `current`, followed by the
/// new prompt.
///
/// Unresolved placeholders are skipped. Consecutive messages from the same
/// author (left behind by failed turns) are merged so the roles alternate.
fn build_messages(history: &[Message], current: MessageId, prompt: &str) -> Vec<LlmMessage> {
    let mut messages: Vec<LlmMessage> = Vec::new();

    let prior = history
        .iter()
        .filter(|m| m.id < current && !m.pending)
        .map(|m| {
            if m.is_user {
                LlmMessage::user(&m.text)
            } else {
                LlmMessage::assistant(&m.text)
            }
        })
        .chain(std::iter::once(LlmMessage::user(prompt)));

    for message in prior {
        match messages.last_mut() {
            Some(last) if last.role == message.role => {
                last.text.push_str("\n\n");
                last.text.push_str(&message.text);
            }
            _ => messages.push(message),
        }
    }

    // Gemini expects the history to open with a user turn
    while messages.first().is_some_and(|m| m.role == MessageRole::Assistant) {
        messages.remove(0);
    }

    messages
}
