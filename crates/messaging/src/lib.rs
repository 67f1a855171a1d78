//! Roamly Messaging Core
//!
//! Client-side real-time messaging for the Roamly rental marketplace:
//! a conversation cache, a per-conversation message stream, typing
//! presence, and the persistent push connection that keeps them live.
//!
//! The REST backend owns persistence; this crate is a read-through cache
//! plus the socket protocol glue. The [`Messenger`] façade composes the
//! parts and is what UI layers talk to.

pub mod config;
pub mod orchestrator;
pub mod rest;
pub mod store;
pub mod stream;
pub mod transport;
pub mod typing;

pub use config::{Config, ConfigError};
pub use orchestrator::{Messenger, Notice, Phase};
pub use rest::RestClient;
pub use store::{ConversationStore, PushOutcome};
pub use stream::MessageStream;
pub use transport::{
    ClientCommand, ConnectionManager, ConnectionState, ServerEvent, TransportConfig,
};
pub use typing::TypingTracker;
