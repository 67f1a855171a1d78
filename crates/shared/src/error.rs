//! Error types for the Roamly messaging core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessagingError {
    /// Missing or rejected credentials. Terminal for the session:
    /// callers must force a re-login instead of retrying.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Connection refused, dropped, or handshake failure. Transient:
    /// the transport retries these up to its attempt ceiling.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// REST collaborator request failed.
    #[error("Request failed: {0}")]
    Http(String),

    /// Rejected locally before any network call (empty content,
    /// no active conversation, no resolvable receiver).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MessagingError {
    /// Returns true if this error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            MessagingError::Transport(_) | MessagingError::Http(_) => true,
            MessagingError::Auth(_)
            | MessagingError::Validation(_)
            | MessagingError::NotFound(_)
            | MessagingError::Internal(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, MessagingError>;
