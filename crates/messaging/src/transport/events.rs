//! Push channel event types and serialization
//!
//! Wire format: one JSON object per text frame, `{"event": "...", "data": {...}}`,
//! with the backend's camelCase payload keys.

use serde::{Deserialize, Serialize};

use roamly_shared::{Attachment, ConversationId, Message, MessageId, MessageType, UserId};

// =============================================================================
// Client-to-Server Commands
// =============================================================================

/// Commands sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientCommand {
    /// Send a message into a conversation
    #[serde(rename = "message:send", rename_all = "camelCase")]
    MessageSend {
        conversation_id: ConversationId,
        receiver_id: UserId,
        content: String,
        message_type: MessageType,
        #[serde(skip_serializing_if = "Vec::is_empty", default)]
        attachments: Vec<Attachment>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        reply_to: Option<MessageId>,
    },

    /// Join a conversation's push-event room
    #[serde(rename = "conversation:join", rename_all = "camelCase")]
    ConversationJoin { conversation_id: ConversationId },

    /// Start typing in a conversation
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { conversation_id: ConversationId },

    /// Stop typing in a conversation
    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { conversation_id: ConversationId },
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Push events delivered by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// A message materialized in one of the user's conversations
    /// (including the echo of the user's own sends)
    #[serde(rename = "message:new")]
    MessageNew { message: Message },

    /// A remote participant started typing in the joined conversation
    #[serde(rename = "typing:start", rename_all = "camelCase")]
    TypingStart { user_id: UserId },

    /// A remote participant stopped typing
    #[serde(rename = "typing:stop", rename_all = "camelCase")]
    TypingStop { user_id: UserId },
}
