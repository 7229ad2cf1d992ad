//! Resource and comment error types.

use thiserror::Error;

use crate::db::StoreError;

/// Resource errors
#[derive(Debug, Error)]
pub enum ResourceError {
    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Required fields absent
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    /// Field present but unusable
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("Resource not found")]
    NotFound,

    /// Caller does not own the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl ResourceError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            ResourceError::Store(e) => e.client_message(),
            _ => self.to_string(),
        }
    }
}

/// Result type for resource operations
pub type ResourceResult<T> = Result<T, ResourceError>;
