//! Conversation list state
//!
//! Holds the user's conversations ordered by recent activity, plus the
//! current selection. The backend remains the source of truth; this is
//! the client-side projection that keeps the inbox render-ready between
//! refreshes.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use roamly_shared::{Conversation, ConversationId, Message, Result};

use crate::rest::RestClient;

/// Outcome of folding an incoming push message into the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The message's conversation was known and has been updated
    Merged,
    /// The message references a conversation not in the list; the
    /// caller should refresh from the backend
    UnknownConversation,
}

#[derive(Default)]
struct StoreInner {
    conversations: Vec<Conversation>,
    selected: Option<ConversationId>,
}

/// Client-side conversation list with a single active selection
#[derive(Clone)]
pub struct ConversationStore {
    rest: Arc<RestClient>,
    inner: Arc<RwLock<StoreInner>>,
}

impl ConversationStore {
    pub fn new(rest: Arc<RestClient>) -> Self {
        Self {
            rest,
            inner: Arc::new(RwLock::new(StoreInner::default())),
        }
    }

    /// Refresh the list from the backend
    ///
    /// Keeps the current selection when it still exists; otherwise the
    /// most recently active conversation becomes selected.
    pub async fn load(&self) -> Result<()> {
        let mut conversations = self.rest.list_conversations().await?;
        sort_by_activity(&mut conversations);

        let mut inner = self.inner.write().await;
        let selection_alive = inner
            .selected
            .is_some_and(|id| conversations.iter().any(|c| c.id == id));
        if !selection_alive {
            inner.selected = conversations.first().map(|c| c.id);
        }
        info!(count = conversations.len(), "Conversation list loaded");
        inner.conversations = conversations;
        Ok(())
    }

    /// Select a conversation by id
    ///
    /// Returns the selected conversation, or None when the id is not in
    /// the list.
    pub async fn select(&self, id: ConversationId) -> Option<Conversation> {
        let mut inner = self.inner.write().await;
        let found = inner.conversations.iter().find(|c| c.id == id).cloned()?;
        inner.selected = Some(id);
        debug!(conversation_id = %id, "Conversation selected");
        Some(found)
    }

    pub async fn selected_id(&self) -> Option<ConversationId> {
        self.inner.read().await.selected
    }

    pub async fn selected(&self) -> Option<Conversation> {
        let inner = self.inner.read().await;
        let id = inner.selected?;
        inner.conversations.iter().find(|c| c.id == id).cloned()
    }

    /// Snapshot of the list, most recent activity first
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.inner.read().await.conversations.clone()
    }

    /// Sum of unread counts across all conversations (badge count)
    pub async fn total_unread(&self) -> u32 {
        self.inner
            .read()
            .await
            .conversations
            .iter()
            .map(|c| c.unread_count)
            .sum()
    }

    /// Fold an incoming push message into the list
    ///
    /// Updates the conversation's last message and activity timestamp
    /// and re-sorts. The unread count is bumped unless the message
    /// belongs to the active conversation (`active` = the message hit
    /// the conversation currently on screen).
    pub async fn apply_incoming(&self, message: &Message, active: bool) -> PushOutcome {
        let mut inner = self.inner.write().await;
        let Some(conversation) = inner
            .conversations
            .iter_mut()
            .find(|c| c.id == message.conversation_id)
        else {
            debug!(
                conversation_id = %message.conversation_id,
                "Push message for unknown conversation"
            );
            return PushOutcome::UnknownConversation;
        };

        conversation.last_message_at = Some(message.created_at);
        conversation.last_message = Some(message.clone());
        if !active {
            conversation.unread_count += 1;
        }
        sort_by_activity(&mut inner.conversations);
        PushOutcome::Merged
    }

    /// Zero the unread count locally after the backend confirmed the
    /// mark-read
    pub async fn mark_read_local(&self, id: ConversationId) {
        let mut inner = self.inner.write().await;
        if let Some(conversation) = inner.conversations.iter_mut().find(|c| c.id == id) {
            conversation.unread_count = 0;
        }
    }

    /// Insert or replace a conversation (create-or-get result)
    pub async fn upsert(&self, conversation: Conversation) {
        let mut inner = self.inner.write().await;
        match inner
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation.id)
        {
            Some(existing) => *existing = conversation,
            None => inner.conversations.push(conversation),
        }
        sort_by_activity(&mut inner.conversations);
    }
}

fn sort_by_activity(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use roamly_shared::{MessageId, MessageType, UserId};
    use std::time::Duration;
    use time::macros::datetime;
    use time::OffsetDateTime;

    fn rest_client() -> Arc<RestClient> {
        Arc::new(
            RestClient::with_base_url("http://localhost:9", "token", Duration::from_secs(1))
                .unwrap(),
        )
    }

    fn conversation(created_at: OffsetDateTime) -> Conversation {
        Conversation {
            id: ConversationId::new(),
            participants: vec![UserId::new(), UserId::new()],
            last_message: None,
            unread_count: 0,
            created_at,
            last_message_at: None,
        }
    }

    fn message_for(conversation: &Conversation, created_at: OffsetDateTime) -> Message {
        Message {
            id: MessageId::new(),
            conversation_id: conversation.id,
            sender_id: conversation.participants[1],
            receiver_id: conversation.participants[0],
            content: "Is the listing still available?".to_string(),
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

    async fn seeded_store(conversations: Vec<Conversation>) -> ConversationStore {
        let store = ConversationStore::new(rest_client());
        for conversation in conversations {
            store.upsert(conversation).await;
        }
        store
    }

    #[tokio::test]
    async fn test_incoming_message_bumps_unread_when_not_active() {
        let older = conversation(datetime!(2026-02-01 08:00 UTC));
        let newer = conversation(datetime!(2026-02-01 09:00 UTC));
        let store = seeded_store(vec![older.clone(), newer]).await;

        let message = message_for(&older, datetime!(2026-02-01 10:00 UTC));
        let outcome = store.apply_incoming(&message, false).await;

        assert_eq!(outcome, PushOutcome::Merged);
        let list = store.conversations().await;
        // The touched conversation moved to the front
        assert_eq!(list[0].id, older.id);
        assert_eq!(list[0].unread_count, 1);
        assert_eq!(list[0].last_message.as_ref().unwrap().id, message.id);
        assert_eq!(store.total_unread().await, 1);
    }

    #[tokio::test]
    async fn test_incoming_message_for_active_conversation_keeps_unread() {
        let conv = conversation(datetime!(2026-02-01 08:00 UTC));
        let store = seeded_store(vec![conv.clone()]).await;
        store.select(conv.id).await.unwrap();

        let message = message_for(&conv, datetime!(2026-02-01 10:00 UTC));
        store.apply_incoming(&message, true).await;

        assert_eq!(store.conversations().await[0].unread_count, 0);
    }

    #[tokio::test]
    async fn test_incoming_message_for_unknown_conversation() {
        let known = conversation(datetime!(2026-02-01 08:00 UTC));
        let store = seeded_store(vec![known]).await;

        let orphan = conversation(datetime!(2026-02-01 09:00 UTC));
        let message = message_for(&orphan, datetime!(2026-02-01 10:00 UTC));

        assert_eq!(
            store.apply_incoming(&message, false).await,
            PushOutcome::UnknownConversation
        );
        assert_eq!(store.conversations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_select_unknown_id_returns_none() {
        let store = seeded_store(vec![conversation(datetime!(2026-02-01 08:00 UTC))]).await;
        assert!(store.select(ConversationId::new()).await.is_none());
    }

    #[tokio::test]
    async fn test_mark_read_local_zeroes_unread() {
        let mut conv = conversation(datetime!(2026-02-01 08:00 UTC));
        conv.unread_count = 4;
        let store = seeded_store(vec![conv.clone()]).await;

        store.mark_read_local(conv.id).await;
        assert_eq!(store.total_unread().await, 0);
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing() {
        let mut conv = conversation(datetime!(2026-02-01 08:00 UTC));
        let store = seeded_store(vec![conv.clone()]).await;

        conv.unread_count = 2;
        store.upsert(conv.clone()).await;

        let list = store.conversations().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].unread_count, 2);
    }

    #[tokio::test]
    async fn test_load_orders_and_autoselects_most_recent() {
        let mut server = mockito::Server::new_async().await;
        let old_id = ConversationId::new();
        let new_id = ConversationId::new();
        let participants = format!(r#"["{}", "{}"]"#, UserId::new(), UserId::new());
        server
            .mock("GET", "/messages/conversations")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(format!(
                r#"{{"conversations": [
                    {{"id": "{old_id}", "participants": {participants},
                      "unreadCount": 0, "createdAt": "2026-02-01T08:00:00Z"}},
                    {{"id": "{new_id}", "participants": {participants},
                      "unreadCount": 2, "createdAt": "2026-02-02T08:00:00Z"}}
                ]}}"#
            ))
            .create_async()
            .await;

        let rest = Arc::new(
            RestClient::with_base_url(server.url(), "token", Duration::from_secs(2)).unwrap(),
        );
        let store = ConversationStore::new(rest);
        store.load().await.unwrap();

        let ids: Vec<_> = store.conversations().await.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![new_id, old_id]);
        // Nothing was selected, so the most recent becomes selected
        assert_eq!(store.selected_id().await, Some(new_id));
        assert_eq!(store.total_unread().await, 2);
    }

    #[tokio::test]
    async fn test_ordering_most_recent_first() {
        let a = conversation(datetime!(2026-02-01 08:00 UTC));
        let b = conversation(datetime!(2026-02-03 08:00 UTC));
        let c = conversation(datetime!(2026-02-02 08:00 UTC));
        let store = seeded_store(vec![a.clone(), b.clone(), c.clone()]).await;

        let ids: Vec<_> = store.conversations().await.iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![b.id, c.id, a.id]);
    }
}
