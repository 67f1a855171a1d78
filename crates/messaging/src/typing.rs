//! Typing presence
//!
//! Local side: debounced typing signals with an auto-stop timer, so the
//! remote party never sees a typing indicator stuck on after the user
//! walks away mid-draft. Remote side: the set of users currently typing
//! in the active conversation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use roamly_shared::{ConversationId, Result, UserId};

use crate::transport::{ClientCommand, ConnectionManager};

struct AutoStop {
    conversation_id: ConversationId,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TypingInner {
    remote: HashSet<UserId>,
    auto_stop: Option<AutoStop>,
}

/// Tracks local and remote typing state for the active conversation
pub struct TypingTracker {
    transport: Arc<ConnectionManager>,
    quiet_period: Duration,
    inner: Arc<RwLock<TypingInner>>,
}

impl TypingTracker {
    pub fn new(transport: Arc<ConnectionManager>, quiet_period: Duration) -> Self {
        Self {
            transport,
            quiet_period,
            inner: Arc::new(RwLock::new(TypingInner::default())),
        }
    }

    /// Signal that the local user is typing
    ///
    /// Each call re-arms the auto-stop timer; after one quiet period
    /// with no further keystrokes a stop is emitted automatically.
    pub async fn start_typing(&self, conversation_id: ConversationId) -> Result<()> {
        self.transport
            .emit(ClientCommand::TypingStart { conversation_id })?;

        let mut inner = self.inner.write().await;
        if let Some(previous) = inner.auto_stop.take() {
            previous.handle.abort();
        }

        let transport = Arc::clone(&self.transport);
        let tracker = Arc::clone(&self.inner);
        let quiet = self.quiet_period;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let mut inner = tracker.write().await;
            let armed = inner
                .auto_stop
                .as_ref()
                .is_some_and(|a| a.conversation_id == conversation_id);
            if armed {
                inner.auto_stop = None;
                debug!(conversation_id = %conversation_id, "Typing auto-stop");
                let _ = transport.emit(ClientCommand::TypingStop { conversation_id });
            }
        });
        inner.auto_stop = Some(AutoStop {
            conversation_id,
            handle,
        });
        Ok(())
    }

    /// Signal that the local user stopped typing (send, blur, switch)
    ///
    /// A stop with no armed timer is a no-op, so the remote side never
    /// sees duplicate stops.
    pub async fn stop_typing(&self, conversation_id: ConversationId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let Some(armed) = inner.auto_stop.take() else {
            return Ok(());
        };
        armed.handle.abort();
        if armed.conversation_id == conversation_id {
            self.transport
                .emit(ClientCommand::TypingStop { conversation_id })?;
        }
        Ok(())
    }

    /// Fold a remote typing-start push event
    pub async fn remote_started(&self, user_id: UserId) {
        self.inner.write().await.remote.insert(user_id);
    }

    /// Fold a remote typing-stop push event
    pub async fn remote_stopped(&self, user_id: UserId) {
        self.inner.write().await.remote.remove(&user_id);
    }

    /// Users currently typing in the active conversation
    pub async fn typing_users(&self) -> HashSet<UserId> {
        self.inner.read().await.remote.clone()
    }

    /// Reset remote state on conversation switch
    pub async fn clear_remote(&self) {
        self.inner.write().await.remote.clear();
    }
}
