//! Authentication error types.

use thiserror::Error;

use crate::db::StoreError;

/// Token verification failures. Callers distinguish expiry from tampering so
/// clients can prompt a re-login instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Expiry timestamp has passed
    #[error("Token expired")]
    Expired,

    /// Bad signature, malformed token or wrong secret
    #[error("Invalid token")]
    Invalid,

    /// Token could not be signed
    #[error("Token signing failed: {0}")]
    Signing(String),
}

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Storage error
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Required registration or login fields are absent
    #[error("Missing required fields: {0}")]
    MissingFields(String),

    /// Password too weak
    #[error("Weak password: {0}")]
    WeakPassword(String),

    /// Email, username, student ID or phone already registered
    #[error("User already exists: {0}")]
    AlreadyExists(String),

    /// Unknown identifier or wrong password
    #[error("Identifier or password is incorrect")]
    InvalidCredentials,

    /// User not found
    #[error("User not found")]
    UserNotFound,

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Token error
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl AuthError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            AuthError::Store(e) => e.client_message(),
            AuthError::HashingFailed => "Internal server error".to_string(),
            AuthError::Token(TokenError::Signing(_)) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;
