//! REST collaborator client
//!
//! The backend owns conversation/message persistence; this client covers
//! the handful of endpoints the messaging core consumes. Everything else
//! (listings, bookings, uploads) lives in other clients.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use roamly_shared::{
    Conversation, ConversationId, ConversationListResponse, CreateConversationRequest, Message,
    MessageHistoryResponse, MessageId, MessagingError, Result, UserProfile,
};

use crate::config::Config;

/// Client for the messaging REST endpoints
///
/// Holds one shared `reqwest::Client` with a request timeout; the bearer
/// token is attached to every request.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl RestClient {
    /// Create a new REST client from config
    pub fn new(config: &Config, auth_token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(
            config.api_base_url.clone(),
            auth_token,
            config.request_timeout(),
        )
    }

    /// Create a client against an explicit base URL
    pub fn with_base_url(
        base_url: impl Into<String>,
        auth_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MessagingError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            base_url,
            auth_token: auth_token.into(),
        })
    }

    /// Conversations for the current user, most recent activity first
    /// (server-determined order)
    pub async fn list_conversations(&self) -> Result<Vec<Conversation>> {
        let url = format!("{}/messages/conversations", self.base_url);
        let response = self.get(&url).await?;
        let body: ConversationListResponse = Self::json(response).await?;
        debug!(count = body.conversations.len(), "Fetched conversation list");
        Ok(body.conversations)
    }

    /// Ordered message history for one conversation
    pub async fn conversation_messages(&self, id: ConversationId) -> Result<Vec<Message>> {
        let url = format!("{}/messages/conversations/{}/messages", self.base_url, id);
        let response = self.get(&url).await?;
        let body: MessageHistoryResponse = Self::json(response).await?;
        debug!(
            conversation_id = %id,
            count = body.messages.len(),
            "Fetched message history"
        );
        Ok(body.messages)
    }

    /// Create-or-get a conversation with another participant
    ///
    /// The backend returns the existing conversation when one already
    /// exists for this participant pair.
    pub async fn create_conversation(
        &self,
        request: &CreateConversationRequest,
    ) -> Result<Conversation> {
        let url = format!("{}/messages/conversations", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.auth_token)
            .json(request)
            .send()
            .await
            .map_err(Self::request_error)?;
        let conversation: Conversation = Self::json(response).await?;
        debug!(conversation_id = %conversation.id, "Create-or-get conversation");
        Ok(conversation)
    }

    /// Mark every message in a conversation as read
    pub async fn mark_read(&self, id: ConversationId) -> Result<()> {
        let url = format!("{}/messages/conversations/{}/read", self.base_url, id);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(Self::request_error)?;
        Self::check_status(response).await?;
        debug!(conversation_id = %id, "Marked conversation read");
        Ok(())
    }

    /// Soft-delete a message
    pub async fn delete_message(&self, id: MessageId) -> Result<()> {
        let url = format!("{}/messages/messages/{}", self.base_url, id);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(Self::request_error)?;
        Self::check_status(response).await?;
        debug!(message_id = %id, "Soft-deleted message");
        Ok(())
    }

    /// Identity of the authenticated user
    pub async fn profile(&self) -> Result<UserProfile> {
        let url = format!("{}/server-auth/profile", self.base_url);
        let response = self.get(&url).await?;
        Self::json(response).await
    }

    async fn get(&self, url: &str) -> Result<Response> {
        self.client
            .get(url)
            .bearer_auth(&self.auth_token)
            .send()
            .await
            .map_err(Self::request_error)
    }

    fn request_error(e: reqwest::Error) -> MessagingError {
        MessagingError::Http(e.to_string())
    }

    /// Map the response status into the error taxonomy; 401/403 are
    /// terminal for the session.
    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(MessagingError::Auth(format!("{}: {}", status, body)))
            }
            StatusCode::NOT_FOUND => Err(MessagingError::NotFound(body)),
            _ => Err(MessagingError::Http(format!("{}: {}", status, body))),
        }
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| MessagingError::Http(format!("Invalid response body: {}", e)))
    }
}
