//! Push channel transport
//!
//! The only component that owns the physical socket. Everything above it
//! sees typed commands going out and typed [`ServerEvent`]s coming in.

pub mod events;
pub mod manager;

pub use events::{ClientCommand, ServerEvent};
pub use manager::{ConnectionManager, ConnectionState, TransportConfig};
