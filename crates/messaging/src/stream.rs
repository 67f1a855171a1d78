//! Message stream for the active conversation
//!
//! One conversation's messages, in `created_at` order, loaded on
//! selection and appended to as push events arrive. Selections can race
//! slow history fetches; a generation counter makes sure a stale fetch
//! never overwrites the stream of a newer selection.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use roamly_shared::{ConversationId, Message, MessageId, Result};

use crate::rest::RestClient;

#[derive(Default)]
struct StreamInner {
    conversation: Option<ConversationId>,
    messages: Vec<Message>,
    generation: u64,
}

/// The active conversation's ordered message history
#[derive(Clone)]
pub struct MessageStream {
    rest: Arc<RestClient>,
    inner: Arc<RwLock<StreamInner>>,
}

impl MessageStream {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self {
            rest,
            inner: Arc::new(RwLock::new(StreamInner::default())),
        }
    }

    /// Load history for a newly selected conversation
    ///
    /// Clears the stream immediately so the UI never shows the previous
    /// conversation's messages, then fetches. Returns `true` when the
    /// fetched history was applied, `false` when a newer selection made
    /// this one stale.
    pub async fn load_for(&self, id: ConversationId) -> Result<bool> {
        let generation = {
            let mut inner = self.inner.write().await;
            inner.generation += 1;
            inner.conversation = Some(id);
            inner.messages.clear();
            inner.generation
        };

        let mut messages = self.rest.conversation_messages(id).await?;
        messages.sort_by_key(|m| m.created_at);

        let mut inner = self.inner.write().await;
        if inner.generation != generation || inner.conversation != Some(id) {
            debug!(conversation_id = %id, "Discarding stale history fetch");
            return Ok(false);
        }
        info!(conversation_id = %id, count = messages.len(), "Message history loaded");
        inner.messages = messages;
        Ok(true)
    }

    /// Drop the stream (no conversation selected)
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.generation += 1;
        inner.conversation = None;
        inner.messages.clear();
    }

    /// Append a push message if it belongs to the active conversation
    ///
    /// Returns whether the message was appended. Messages arriving out
    /// of `created_at` order trigger a re-sort, so the invariant holds
    /// regardless of delivery order.
    pub async fn append(&self, message: &Message) -> bool {
        let mut inner = self.inner.write().await;
        if inner.conversation != Some(message.conversation_id) {
            return false;
        }
        if inner.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        let out_of_order = inner
            .messages
            .last()
            .is_some_and(|last| last.created_at > message.created_at);
        inner.messages.push(message.clone());
        if out_of_order {
            inner.messages.sort_by_key(|m| m.created_at);
        }
        true
    }

    /// Flag a message as soft-deleted in place
    pub async fn mark_deleted(&self, id: MessageId) {
        let mut inner = self.inner.write().await;
        if let Some(message) = inner.messages.iter_mut().find(|m| m.id == id) {
            message.deleted = true;
        }
    }

    pub async fn conversation_id(&self) -> Option<ConversationId> {
        self.inner.read().await.conversation
    }

    /// Snapshot of the stream in `created_at` order
    pub async fn messages(&self) -> Vec<Message> {
        self.inner.read().await.messages.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roamly_shared::{MessageType, UserId};
    use std::time::Duration;
    use time::macros::datetime;
    use time::OffsetDateTime;

    fn stream() -> MessageStream {
        let rest = Arc::new(
            RestClient::with_base_url("http://localhost:9", "token", Duration::from_secs(1))
                .unwrap(),
        );
        MessageStream::new(rest)
    }

    fn message(conversation_id: ConversationId, created_at: OffsetDateTime) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id,
            sender_id: UserId::new(),
            receiver_id: UserId::new(),
            content: "See you at noon".to_string(),
            message_type: MessageType::Text,
            attachments: vec![],
            reply_to: None,
            read: false,
            read_at: None,
            delivered: true,
            delivered_at: None,
            deleted: false,
            created_at,
            updated_at: created_at,
        }
    }

    async fn active_stream(id: ConversationId) -> MessageStream {
        let stream = stream();
        {
            let mut inner = stream.inner.write().await;
            inner.conversation = Some(id);
        }
        stream
    }

    #[tokio::test]
    async fn test_append_keeps_created_at_order() {
        let id = ConversationId::new();
        let stream = active_stream(id).await;

        assert!(stream.append(&message(id, datetime!(2026-02-01 10:00 UTC))).await);
        assert!(stream.append(&message(id, datetime!(2026-02-01 12:00 UTC))).await);
        // Late delivery of an older message
        assert!(stream.append(&message(id, datetime!(2026-02-01 11:00 UTC))).await);

        let timestamps: Vec<_> = stream
            .messages()
            .await
            .iter()
            .map(|m| m.created_at)
            .collect();
        assert_eq!(
            timestamps,
            vec![
                datetime!(2026-02-01 10:00 UTC),
                datetime!(2026-02-01 11:00 UTC),
                datetime!(2026-02-01 12:00 UTC),
            ]
        );
    }

    #[tokio::test]
    async fn test_append_ignores_other_conversations() {
        let id = ConversationId::new();
        let stream = active_stream(id).await;

        let other = message(ConversationId::new(), datetime!(2026-02-01 10:00 UTC));
        assert!(!stream.append(&other).await);
        assert!(stream.messages().await.is_empty());
    }

    #[tokio::test]
    async fn test_append_deduplicates_by_id() {
        let id = ConversationId::new();
        let stream = active_stream(id).await;

        let msg = message(id, datetime!(2026-02-01 10:00 UTC));
        assert!(stream.append(&msg).await);
        assert!(!stream.append(&msg).await);
        assert_eq!(stream.messages().await.len(), 1);
    }

    #[tokio::test]
    async fn test_mark_deleted_flags_in_place() {
        let id = ConversationId::new();
        let stream = active_stream(id).await;
        let msg = message(id, datetime!(2026-02-01 10:00 UTC));
        stream.append(&msg).await;

        stream.mark_deleted(msg.id).await;

        let messages = stream.messages().await;
        assert_eq!(messages.len(), 1);
        assert!(messages[0].deleted);
    }

    #[tokio::test]
    async fn test_clear_resets_stream() {
        let id = ConversationId::new();
        let stream = active_stream(id).await;
        stream.append(&message(id, datetime!(2026-02-01 10:00 UTC))).await;

        stream.clear().await;

        assert_eq!(stream.conversation_id().await, None);
        assert!(stream.messages().await.is_empty());
    }
}
