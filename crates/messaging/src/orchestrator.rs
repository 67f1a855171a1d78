//! Messaging orchestrator
//!
//! [`Messenger`] composes the REST client, conversation store, message
//! stream, typing tracker, and push transport behind one façade. UI
//! layers call its operations and render its snapshots; the event loop
//! started by [`Messenger::run`] keeps state current as push events and
//! connection transitions arrive.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use roamly_shared::{
    Attachment, ConversationId, CreateConversationRequest, MessageId, MessageType, MessagingError,
    Result, UserId, UserProfile,
};

use crate::config::Config;
use crate::rest::RestClient;
use crate::store::{ConversationStore, PushOutcome};
use crate::stream::MessageStream;
use crate::transport::{
    ClientCommand, ConnectionManager, ConnectionState, ServerEvent, TransportConfig,
};
use crate::typing::TypingTracker;

/// Orchestrator lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    /// Initial data loaded (possibly degraded); operations accepted
    Ready,
}

/// User-facing notification emitted by the orchestrator
///
/// Degraded loads, lost connections, and expired sessions surface here
/// instead of failing the operation that noticed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// Façade over the messaging core
pub struct Messenger {
    rest: Arc<RestClient>,
    transport: Arc<ConnectionManager>,
    store: ConversationStore,
    stream: MessageStream,
    typing: TypingTracker,
    auth_token: String,
    profile: Arc<RwLock<Option<UserProfile>>>,
    phase: Arc<RwLock<Phase>>,
    notices_tx: mpsc::UnboundedSender<Notice>,
    notices_rx: std::sync::Mutex<Option<mpsc::UnboundedReceiver<Notice>>>,
}

impl Messenger {
    pub fn new(config: &Config, auth_token: impl Into<String>) -> Result<Self> {
        let auth_token = auth_token.into();
        let rest = Arc::new(RestClient::new(config, auth_token.clone())?);
        let transport = Arc::new(ConnectionManager::new(TransportConfig::from(config)));
        let store = ConversationStore::new(Arc::clone(&rest));
        let stream = MessageStream::new(Arc::clone(&rest));
        let typing = TypingTracker::new(Arc::clone(&transport), config.typing_quiet_period());
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();

        Ok(Self {
            rest,
            transport,
            store,
            stream,
            typing,
            auth_token,
            profile: Arc::new(RwLock::new(None)),
            phase: Arc::new(RwLock::new(Phase::Uninitialized)),
            notices_tx,
            notices_rx: std::sync::Mutex::new(Some(notices_rx)),
        })
    }

    /// Connect the push channel and load initial data
    ///
    /// Profile and conversation list load concurrently. Auth failures
    /// propagate (the session is unusable); anything else degrades to a
    /// [`Notice`] so the user still gets a working shell.
    pub async fn initialize(&self) -> Result<()> {
        *self.phase.write().await = Phase::Loading;
        self.transport.connect(Some(&self.auth_token));

        let (profile, conversations) = tokio::join!(self.rest.profile(), self.store.load());

        match profile {
            Ok(profile) => {
                debug!(user_id = %profile.id, "Profile loaded");
                *self.profile.write().await = Some(profile);
            }
            Err(e @ MessagingError::Auth(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "Profile load failed");
                self.notify(Notice::Error(format!("Profile unavailable: {}", e)));
            }
        }

        match conversations {
            Ok(()) => {}
            Err(e @ MessagingError::Auth(_)) => return Err(e),
            Err(e) => {
                warn!(error = %e, "Conversation list load failed");
                self.notify(Notice::Error(format!("Conversations unavailable: {}", e)));
            }
        }

        *self.phase.write().await = Phase::Ready;
        info!("Messenger initialized");
        Ok(())
    }

    /// Switch the active conversation
    ///
    /// Joins the conversation's push room, loads its history, and marks
    /// it read exactly once. A failed history fetch degrades to a
    /// notice; the selection itself sticks.
    pub async fn select_conversation(&self, id: ConversationId) -> Result<()> {
        if self.store.select(id).await.is_none() {
            return Err(MessagingError::NotFound(format!("conversation {}", id)));
        }
        self.typing.clear_remote().await;
        self.transport
            .emit(ClientCommand::ConversationJoin { conversation_id: id })?;

        match self.stream.load_for(id).await {
            Ok(true) => match self.rest.mark_read(id).await {
                Ok(()) => self.store.mark_read_local(id).await,
                Err(e) => warn!(conversation_id = %id, error = %e, "Mark-read failed"),
            },
            Ok(false) => {} // a newer selection superseded this one
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "History load failed");
                self.notify(Notice::Error(format!("Message history unavailable: {}", e)));
            }
        }
        Ok(())
    }

    /// Send a text message into the active conversation
    pub async fn send(&self, content: &str) -> Result<()> {
        self.send_message(content, MessageType::Text, Vec::new(), None)
            .await
    }

    /// Send a message with explicit type, attachments, or a reply target
    ///
    /// The message is not appended locally: the server's `message:new`
    /// echo is the single path into the stream, which keeps ordering
    /// authoritative.
    pub async fn send_message(
        &self,
        content: &str,
        message_type: MessageType,
        attachments: Vec<Attachment>,
        reply_to: Option<MessageId>,
    ) -> Result<()> {
        let content = content.trim();
        if content.is_empty() && attachments.is_empty() {
            return Err(MessagingError::Validation(
                "Message content is empty".to_string(),
            ));
        }

        let conversation = self.store.selected().await.ok_or_else(|| {
            MessagingError::Validation("No conversation selected".to_string())
        })?;
        let me = self
            .profile
            .read()
            .await
            .as_ref()
            .map(|p| p.id)
            .ok_or_else(|| MessagingError::Validation("Profile not loaded".to_string()))?;
        let receiver_id = conversation.other_participant(me).ok_or_else(|| {
            MessagingError::Validation("Conversation has no other participant".to_string())
        })?;

        self.typing.stop_typing(conversation.id).await?;
        self.transport.emit(ClientCommand::MessageSend {
            conversation_id: conversation.id,
            receiver_id,
            content: content.to_string(),
            message_type,
            attachments,
            reply_to,
        })
    }

    /// Open (or resume) a conversation with another user
    pub async fn create_or_get_conversation(
        &self,
        participant_id: UserId,
        initial_message: Option<String>,
    ) -> Result<ConversationId> {
        let conversation = self
            .rest
            .create_conversation(&CreateConversationRequest {
                participant_id,
                initial_message,
            })
            .await?;
        let id = conversation.id;
        self.store.upsert(conversation).await;
        Ok(id)
    }

    /// Soft-delete one of the user's own messages
    pub async fn delete_message(&self, id: MessageId) -> Result<()> {
        self.rest.delete_message(id).await?;
        self.stream.mark_deleted(id).await;
        Ok(())
    }

    /// Local user typed in the active conversation
    pub async fn start_typing(&self) -> Result<()> {
        match self.store.selected_id().await {
            Some(id) => self.typing.start_typing(id).await,
            None => Ok(()),
        }
    }

    /// Local user stopped typing (blur, clear)
    pub async fn stop_typing(&self) -> Result<()> {
        match self.store.selected_id().await {
            Some(id) => self.typing.stop_typing(id).await,
            None => Ok(()),
        }
    }

    /// Fold one push event into client state
    pub async fn handle_push(&self, event: ServerEvent) {
        match event {
            ServerEvent::MessageNew { message } => {
                let active = self.stream.conversation_id().await == Some(message.conversation_id);
                if active {
                    self.stream.append(&message).await;
                }
                let outcome = self.store.apply_incoming(&message, active).await;
                if outcome == PushOutcome::UnknownConversation {
                    // A conversation created elsewhere; refresh the list
                    if let Err(e) = self.store.load().await {
                        warn!(error = %e, "Conversation list refresh failed");
                        self.notify(Notice::Error(format!(
                            "Conversations unavailable: {}",
                            e
                        )));
                    }
                }
            }
            ServerEvent::TypingStart { user_id } => self.typing.remote_started(user_id).await,
            ServerEvent::TypingStop { user_id } => self.typing.remote_stopped(user_id).await,
        }
    }

    /// Drive push events and connection transitions until shutdown
    pub fn run(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut events = self.transport.events();
            let mut state = self.transport.state();
            let mut previous = *state.borrow();
            loop {
                tokio::select! {
                    event = events.recv() => match event {
                        Ok(event) => self.handle_push(event).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Push events lagged, refreshing conversation list");
                            if let Err(e) = self.store.load().await {
                                warn!(error = %e, "Conversation list refresh failed");
                            }
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                    changed = state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let current = *state.borrow_and_update();
                        if current != previous {
                            self.handle_connection_state(current).await;
                            previous = current;
                        }
                    }
                }
            }
        })
    }

    async fn handle_connection_state(&self, state: ConnectionState) {
        match state {
            ConnectionState::Connected => {
                // Room membership is per-connection; re-join after
                // every (re)connect
                if let Some(id) = self.store.selected_id().await {
                    debug!(conversation_id = %id, "Re-joining conversation after connect");
                    let _ = self
                        .transport
                        .emit(ClientCommand::ConversationJoin { conversation_id: id });
                }
            }
            ConnectionState::Failed => {
                self.notify(Notice::Error(
                    "Connection lost. Messages will not update until you retry.".to_string(),
                ));
            }
            ConnectionState::Unauthenticated => {
                self.notify(Notice::Error(
                    "Session expired. Please log in again.".to_string(),
                ));
            }
            ConnectionState::Reconnecting => {
                debug!("Push connection reconnecting");
            }
            ConnectionState::Connecting | ConnectionState::Disconnected => {}
        }
    }

    /// Take the notice receiver (once)
    pub fn notices(&self) -> Option<mpsc::UnboundedReceiver<Notice>> {
        match self.notices_rx.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }

    fn notify(&self, notice: Notice) {
        // Nobody listening is fine
        let _ = self.notices_tx.send(notice);
    }

    // ---- snapshots -----------------------------------------------------

    pub async fn phase(&self) -> Phase {
        *self.phase.read().await
    }

    pub async fn profile(&self) -> Option<UserProfile> {
        self.profile.read().await.clone()
    }

    pub async fn conversations(&self) -> Vec<roamly_shared::Conversation> {
        self.store.conversations().await
    }

    pub async fn selected_conversation(&self) -> Option<roamly_shared::Conversation> {
        self.store.selected().await
    }

    pub async fn messages(&self) -> Vec<roamly_shared::Message> {
        self.stream.messages().await
    }

    pub async fn typing_users(&self) -> std::collections::HashSet<UserId> {
        self.typing.typing_users().await
    }

    pub async fn total_unread(&self) -> u32 {
        self.store.total_unread().await
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.transport.current_state()
    }

    /// Tear down the push connection (logout)
    pub fn shutdown(&self) {
        self.transport.shutdown();
    }
}
