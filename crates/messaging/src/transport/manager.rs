//! Push connection management
//!
//! One persistent bidirectional connection per client process,
//! authenticated with a bearer token at handshake (query parameter),
//! with bounded fixed-delay reconnection. The manager is created at
//! session start and torn down at logout; components receive it by
//! reference instead of reaching for a global.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_retry::strategy::FixedInterval;
use tokio_retry::RetryIf;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use roamly_shared::{MessagingError, Result};

use super::events::{ClientCommand, ServerEvent};
use crate::config::Config;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the push-event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Reconnect attempts exhausted; a manual retry or re-login is needed
    Failed,
    /// No token available, or the server rejected the handshake
    /// credentials. Terminal until re-login.
    Unauthenticated,
}

/// Transport settings, usually derived from [`Config`]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub socket_url: String,
    /// Ceiling on consecutive failed connection attempts
    pub max_attempts: u32,
    /// Fixed delay between attempts (no backoff, no jitter)
    pub retry_delay: std::time::Duration,
}

impl From<&Config> for TransportConfig {
    fn from(config: &Config) -> Self {
        Self {
            socket_url: config.socket_url.clone(),
            max_attempts: config.reconnect_max_attempts.max(1),
            retry_delay: config.reconnect_delay(),
        }
    }
}

/// Owns the singleton push connection
///
/// `connect` is a no-op while a connection task is live; commands queue
/// through an unbounded channel and survive reconnects; push events fan
/// out on a broadcast channel whose receivers are the subscription
/// handles (dropping a receiver unsubscribes it on every exit path).
pub struct ConnectionManager {
    config: TransportConfig,
    outgoing_tx: mpsc::UnboundedSender<ClientCommand>,
    outgoing_rx: Arc<Mutex<mpsc::UnboundedReceiver<ClientCommand>>>,
    events_tx: broadcast::Sender<ServerEvent>,
    state_tx: watch::Sender<ConnectionState>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub fn new(config: TransportConfig) -> Self {
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            outgoing_tx,
            outgoing_rx: Arc::new(Mutex::new(outgoing_rx)),
            events_tx,
            state_tx,
            task: std::sync::Mutex::new(None),
        }
    }

    /// Establish (or reuse) the connection
    ///
    /// Without a token no connection is attempted: the manager reports
    /// `Unauthenticated` instead of erroring, so hosts can render a
    /// logged-out state. A second call while a connection task is live
    /// is a no-op.
    pub fn connect(&self, token: Option<&str>) {
        let Some(token) = token else {
            warn!("Push connection not attempted: no auth token");
            self.state_tx.send_replace(ConnectionState::Unauthenticated);
            return;
        };

        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                debug!("Push connection already live, connect ignored");
                return;
            }
        }

        let url = format!("{}?token={}", self.config.socket_url, token);
        let config = self.config.clone();
        let outgoing = Arc::clone(&self.outgoing_rx);
        let events_tx = self.events_tx.clone();
        let state_tx = self.state_tx.clone();
        *task = Some(tokio::spawn(run_connection(
            config, url, outgoing, events_tx, state_tx,
        )));
    }

    /// Queue a command for the push channel
    ///
    /// Commands queued while the connection is down are flushed once it
    /// is re-established.
    pub fn emit(&self, command: ClientCommand) -> Result<()> {
        self.outgoing_tx
            .send(command)
            .map_err(|_| MessagingError::Internal("push channel closed".to_string()))
    }

    /// Subscribe to push events
    ///
    /// The returned receiver is the subscription handle; dropping it
    /// unsubscribes.
    pub fn events(&self) -> broadcast::Receiver<ServerEvent> {
        self.events_tx.subscribe()
    }

    /// Watch connection state transitions
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.current_state() == ConnectionState::Connected
    }

    /// Tear the connection down (logout path)
    pub fn shutdown(&self) {
        let mut task = match self.task.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = task.take() {
            handle.abort();
            info!("Push connection shut down");
        }
        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    #[cfg(test)]
    pub(crate) fn push_event(&self, event: ServerEvent) {
        let _ = self.events_tx.send(event);
    }

    #[cfg(test)]
    pub(crate) async fn drain_outgoing(&self) -> Vec<ClientCommand> {
        let mut rx = self.outgoing_rx.lock().await;
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
            }
        }
    }
}

enum PumpExit {
    ConnectionLost,
    ManagerClosed,
}

/// Connection driver: connect with bounded retry, pump frames, repeat
/// after drops, and park in a terminal state on auth rejection or
/// attempt exhaustion.
async fn run_connection(
    config: TransportConfig,
    url: String,
    outgoing: Arc<Mutex<mpsc::UnboundedReceiver<ClientCommand>>>,
    events_tx: broadcast::Sender<ServerEvent>,
    state_tx: watch::Sender<ConnectionState>,
) {
    let mut first = true;
    loop {
        state_tx.send_replace(if first {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        let attempts = AtomicU32::new(0);
        let strategy =
            FixedInterval::new(config.retry_delay).take(config.max_attempts.saturating_sub(1) as usize);
        let action = || {
            let url = url.clone();
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            async move {
                match connect_socket(&url).await {
                    Ok(ws) => Ok(ws),
                    Err(e) => {
                        warn!(attempt, error = %e, "Push connection attempt failed");
                        Err(e)
                    }
                }
            }
        };

        match RetryIf::spawn(strategy, action, |e: &MessagingError| e.is_transient()).await {
            Ok(ws) => {
                first = false;
                state_tx.send_replace(ConnectionState::Connected);
                info!("Push connection established");

                let mut rx = outgoing.lock().await;
                match pump(ws, &mut rx, &events_tx).await {
                    PumpExit::ConnectionLost => {
                        warn!("Push connection lost");
                        continue;
                    }
                    PumpExit::ManagerClosed => {
                        state_tx.send_replace(ConnectionState::Disconnected);
                        return;
                    }
                }
            }
            Err(MessagingError::Auth(reason)) => {
                error!(reason = %reason, "Push connection rejected: authentication failure");
                state_tx.send_replace(ConnectionState::Unauthenticated);
                return;
            }
            Err(e) => {
                error!(
                    max_attempts = config.max_attempts,
                    error = %e,
                    "Push connection attempts exhausted"
                );
                state_tx.send_replace(ConnectionState::Failed);
                return;
            }
        }
    }
}

async fn connect_socket(url: &str) -> Result<WsStream> {
    use tokio_tungstenite::tungstenite::Error as WsError;

    match connect_async(url).await {
        Ok((ws, _response)) => Ok(ws),
        Err(WsError::Http(response)) if response.status().as_u16() == 401 || response.status().as_u16() == 403 => {
            Err(MessagingError::Auth(format!(
                "handshake rejected with {}",
                response.status()
            )))
        }
        Err(e) => Err(MessagingError::Transport(e.to_string())),
    }
}

/// Forward outbound commands and inbound push events until the socket
/// drops or the manager goes away.
async fn pump(
    ws: WsStream,
    outgoing: &mut mpsc::UnboundedReceiver<ClientCommand>,
    events_tx: &broadcast::Sender<ServerEvent>,
) -> PumpExit {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            command = outgoing.recv() => match command {
                Some(command) => match serde_json::to_string(&command) {
                    Ok(json) => {
                        if sink.send(WsMessage::Text(json.into())).await.is_err() {
                            return PumpExit::ConnectionLost;
                        }
                    }
                    Err(e) => error!(error = ?e, "Failed to serialize outbound command"),
                },
                None => return PumpExit::ManagerClosed,
            },
            frame = stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => {
                    match serde_json::from_str::<ServerEvent>(text.as_str()) {
                        Ok(event) => {
                            // No receivers is fine: events before anyone
                            // subscribes are dropped
                            let _ = events_tx.send(event);
                        }
                        Err(e) => warn!(error = ?e, frame = %text, "Failed to parse push event"),
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => return PumpExit::ConnectionLost,
                Some(Ok(_)) => {} // ping/pong handled by tungstenite, binary ignored
                Some(Err(e)) => {
                    warn!(error = ?e, "Push connection error");
                    return PumpExit::ConnectionLost;
                }
            }
        }
    }
}
