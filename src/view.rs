//! Conversation view
//!
//! Follows the store's live snapshots, keeps only the active conversation and
//! hands the ordered list to a [`Renderer`]. Never writes to the store.

use crate::db::{ConversationId, Message, Subscription};
use std::io;
use tokio::sync::oneshot;

/// Draws the message list of one conversation
pub trait Renderer {
    /// Draw the full ordered list; an empty list means a fresh conversation
    fn render(&mut self, messages: &[Message]) -> io::Result<()>;

    /// Bring the entry at `index` into view
    fn scroll_to(&mut self, index: usize) -> io::Result<()>;
}

pub struct ConversationView<R: Renderer> {
    conversation_id: ConversationId,
    subscription: Subscription,
    renderer: R,
}

impl<R: Renderer> ConversationView<R> {
    pub fn new(subscription: Subscription, conversation_id: ConversationId, renderer: R) -> Self {
        Self {
            conversation_id,
            subscription,
            renderer,
        }
    }

    /// Re-render from one store snapshot
    pub fn apply(&mut self, snapshot: &[Message]) {
        let messages: Vec<Message> = snapshot
            .iter()
            .filter(|m| m.conversation_id == self.conversation_id)
            .cloned()
            .collect();

        tracing::trace!(
            conv_id = %self.conversation_id,
            visible = messages.len(),
            total = snapshot.len(),
            "Rendering conversation"
        );

        if let Err(e) = self.renderer.render(&messages) {
            tracing::warn!(error = %e, "Failed to render conversation");
            return;
        }
        if let Some(last) = messages.len().checked_sub(1) {
            if let Err(e) = self.renderer.scroll_to(last) {
                tracing::warn!(error = %e, "Failed to scroll conversation");
            }
        }
    }

    /// Render every snapshot until the store goes away or `shutdown` fires,
    /// then unsubscribe and hand the renderer back.
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) -> R {
        loop {
            tokio::select! {
                snapshot = self.subscription.next() => match snapshot {
                    Some(snapshot) => self.apply(&snapshot),
                    None => break,
                },
                _ = &mut shutdown => break,
            }
        }
        self.teardown()
    }

    /// Detach from the store and hand the renderer back
    pub fn teardown(mut self) -> R {
        self.subscription.unsubscribe();
        tracing::debug!(conv_id = %self.conversation_id, "Conversation view detached");
        self.renderer
    }
}
