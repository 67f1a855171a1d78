//! Common types used across the Roamly messaging core

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Conversation ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConversationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Message ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for MessageId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// User ID wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Kind of message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    File,
    System,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Text
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::File => write!(f, "file"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "file" => Ok(Self::File),
            "system" => Ok(Self::System),
            _ => Err(format!("Invalid message type: {}", s)),
        }
    }
}

/// Role of a user on the marketplace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Renter,
    Owner,
    Admin,
}

impl Default for UserRole {
    fn default() -> Self {
        Self::Renter
    }
}

impl UserRole {
    /// Parse a role from string (case insensitive, unknown falls back to renter)
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            _ => Self::Renter,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Renter => write!(f, "renter"),
            Self::Owner => write!(f, "owner"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

// =============================================================================
// Models
// =============================================================================

/// Attachment metadata carried by image/file messages
///
/// Wire format is camelCase throughout: the REST collaborator and the push
/// channel speak the backend's JSON dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_name: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reply_to: Option<MessageId>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub read_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub delivered_at: Option<OffsetDateTime>,
    /// Soft-delete flag; deleted messages stay in the stream and are
    /// filtered by the UI
    #[serde(default)]
    pub deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// A persistent thread between a fixed set of participants
///
/// Two participants in practice (renter and owner, or either and an admin),
/// but nothing here assumes exactly two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<UserId>,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
}

impl Conversation {
    /// The participant that is not `me`
    ///
    /// Returns None when `me` is the only participant (should not happen
    /// for well-formed conversations).
    pub fn other_participant(&self, me: UserId) -> Option<UserId> {
        self.participants.iter().copied().find(|p| *p != me)
    }

    pub fn has_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }

    /// Activity timestamp used for recency ordering
    pub fn activity_at(&self) -> OffsetDateTime {
        self.last_message_at.unwrap_or(self.created_at)
    }
}

/// The authenticated identity of the local client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Create-or-get conversation request
///
/// Creating a conversation with an existing participant pair returns the
/// existing conversation rather than duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    pub participant_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_message: Option<String>,
}

/// Conversation list response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
}

/// Message history response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageHistoryResponse {
    pub messages: Vec<Message>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn conversation(participants: Vec<UserId>) -> Conversation {
        Conversation {
            id: ConversationId::new(),
            participants,
            last_message: None,
            unread_count: 0,
            created_at: datetime!(2026-01-10 12:00 UTC),
            last_message_at: None,
        }
    }

    #[test]
    fn test_id_wrappers_unique() {
        assert_ne!(ConversationId::new(), ConversationId::new());
        assert_ne!(MessageId::new(), MessageId::new());
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    fn test_user_id_from_uuid() {
        let uuid = Uuid::new_v4();
        let user_id: UserId = uuid.into();
        assert_eq!(user_id.0, uuid);
    }

    #[test]
    fn test_message_type_display_and_parse() {
        assert_eq!(format!("{}", MessageType::Text), "text");
        assert_eq!(format!("{}", MessageType::System), "system");
        assert_eq!("image".parse::<MessageType>().unwrap(), MessageType::Image);
        assert_eq!("FILE".parse::<MessageType>().unwrap(), MessageType::File);
        assert!("voice".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_user_role_from_str_lossy() {
        assert_eq!(UserRole::from_str_lossy("owner"), UserRole::Owner);
        assert_eq!(UserRole::from_str_lossy("ADMIN"), UserRole::Admin);
        assert_eq!(UserRole::from_str_lossy("unknown"), UserRole::Renter);
    }

    #[test]
    fn test_other_participant() {
        let me = UserId::new();
        let them = UserId::new();
        let conv = conversation(vec![me, them]);

        assert_eq!(conv.other_participant(me), Some(them));
        assert_eq!(conv.other_participant(them), Some(me));
        assert!(conv.has_participant(me));
        assert!(!conv.has_participant(UserId::new()));
    }

    #[test]
    fn test_other_participant_alone() {
        let me = UserId::new();
        let conv = conversation(vec![me]);
        assert_eq!(conv.other_participant(me), None);
    }

    #[test]
    fn test_activity_at_prefers_last_message() {
        let mut conv = conversation(vec![UserId::new(), UserId::new()]);
        assert_eq!(conv.activity_at(), conv.created_at);

        let later = datetime!(2026-01-11 09:30 UTC);
        conv.last_message_at = Some(later);
        assert_eq!(conv.activity_at(), later);
    }

    #[test]
    fn test_message_deserialization_defaults() {
        let id = MessageId::new();
        let conv_id = ConversationId::new();
        let sender = UserId::new();
        let receiver = UserId::new();
        let json = format!(
            r#"{{
                "id": "{id}",
                "conversationId": "{conv_id}",
                "senderId": "{sender}",
                "receiverId": "{receiver}",
                "content": "Is the apartment still available?",
                "createdAt": "2026-01-10T12:00:00Z",
                "updatedAt": "2026-01-10T12:00:00Z"
            }}"#
        );

        let message: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message.message_type, MessageType::Text);
        assert!(message.attachments.is_empty());
        assert!(!message.read);
        assert!(!message.deleted);
        assert_eq!(message.reply_to, None);
    }

    #[test]
    fn test_create_conversation_request_omits_empty_message() {
        let request = CreateConversationRequest {
            participant_id: UserId::new(),
            initial_message: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("initialMessage"));
    }
}
