//! Message error types.

use thiserror::Error;

use crate::db::StoreError;

/// Message errors
#[derive(Debug, Error)]
pub enum MessageError {
    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Category field absent
    #[error("Category is required")]
    MissingCategory,

    /// Category outside the known feeds
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Field present but unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Message not found
    #[error("Message not found")]
    NotFound,

    /// Replied-to message does not exist
    #[error("Reply target not found")]
    ReplyNotFound,

    /// Caller is not the sender
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl MessageError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            MessageError::Store(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for message operations
pub type MessageResult<T> = Result<T, MessageError>;
