//! Upload error types.

use thiserror::Error;

/// File intake errors
#[derive(Debug, Error)]
pub enum UploadError {
    /// Disk write or directory creation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload exceeds the per-file cap
    #[error("File too large: limit is {limit} bytes")]
    TooLarge { limit: u64 },
}

impl UploadError {
    /// Get a client-safe error message
    pub fn client_message(&self) -> String {
        match self {
            UploadError::Io(_) => "Internal server error".to_string(),
            UploadError::TooLarge { .. } => self.to_string(),
        }
    }
}

/// Result type for upload operations
pub type UploadResult<T> = Result<T, UploadError>;
