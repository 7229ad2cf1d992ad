//! API error taxonomy and its JSON rendering.
//!
//! Every handler returns [`ApiError`] on failure. The body is always
//! `{"error": <kind>, "message": <human readable text>}`.

use axum::{
    Json,
    extract::{
        multipart::MultipartError,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use campus_share::{
    auth::{AuthError, TokenError},
    db::StoreError,
    messages::MessageError,
    resources::ResourceError,
    uploads::UploadError,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced to HTTP clients
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed input (400)
    #[error("{0}")]
    Validation(String),

    /// Missing, expired or invalid token, or bad credentials (401)
    #[error("{0}")]
    Auth(String),

    /// Caller does not own the target (403)
    #[error("{0}")]
    Forbidden(String),

    /// Dangling ID (404)
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness violation (409)
    #[error("{0}")]
    Conflict(String),

    /// Upload over the size cap (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Unexpected failure (500); the cause is logged, never returned
    #[error("Internal server error")]
    Server(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "ValidationError",
            ApiError::Auth(_) => "AuthError",
            ApiError::Forbidden(_) => "ForbiddenError",
            ApiError::NotFound(_) => "NotFoundError",
            ApiError::Conflict(_) => "ConflictError",
            ApiError::PayloadTooLarge(_) => "PayloadTooLargeError",
            ApiError::Server(_) => "ServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Server(cause) = &self {
            tracing::error!(cause = %cause, "Request failed");
        }

        let body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(_) => ApiError::Conflict(err.client_message()),
            other => ApiError::Server(other.to_string()),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => ApiError::Auth("Token expired".to_string()),
            TokenError::Invalid => ApiError::Auth("Invalid token".to_string()),
            TokenError::Signing(cause) => ApiError::Server(cause),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.client_message();
        match err {
            AuthError::Store(e) => e.into(),
            AuthError::Token(e) => e.into(),
            AuthError::MissingFields(_) | AuthError::WeakPassword(_) => {
                ApiError::Validation(message)
            }
            AuthError::AlreadyExists(_) => ApiError::Conflict(message),
            AuthError::InvalidCredentials => ApiError::Auth(message),
            AuthError::UserNotFound => ApiError::NotFound(message),
            AuthError::HashingFailed => ApiError::Server("password hashing failed".to_string()),
        }
    }
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        let message = err.client_message();
        match err {
            ResourceError::Store(e) => e.into(),
            ResourceError::MissingFields(_) | ResourceError::InvalidInput(_) => {
                ApiError::Validation(message)
            }
            ResourceError::NotFound => ApiError::NotFound(message),
            ResourceError::Forbidden(_) => ApiError::Forbidden(message),
        }
    }
}

impl From<MessageError> for ApiError {
    fn from(err: MessageError) -> Self {
        let message = err.client_message();
        match err {
            MessageError::Store(e) => e.into(),
            MessageError::MissingCategory
            | MessageError::UnknownCategory(_)
            | MessageError::InvalidInput(_) => ApiError::Validation(message),
            MessageError::NotFound | MessageError::ReplyNotFound => ApiError::NotFound(message),
            MessageError::Forbidden(_) => ApiError::Forbidden(message),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { .. } => ApiError::PayloadTooLarge(err.client_message()),
            UploadError::Io(e) => ApiError::Server(format!("upload I/O: {e}")),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(rejection.body_text()),
            _ => ApiError::Validation(rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        match err.status() {
            StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge(err.body_text()),
            _ => ApiError::Validation(err.body_text()),
        }
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Validation(String::new()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Auth(String::new()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden(String::new()).status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound(String::new()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Conflict(String::new()).status(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::PayloadTooLarge(String::new()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_server_error_hides_cause() {
        let err = ApiError::Server("relation \"users\" does not exist".to_string());
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn test_domain_errors_map_to_taxonomy() {
        let err: ApiError = AuthError::AlreadyExists("email already registered".to_string()).into();
        assert!(matches!(err, ApiError::Conflict(_)));

        let err: ApiError = TokenError::Expired.into();
        assert_eq!(err.to_string(), "Token expired");

        let err: ApiError = ResourceError::Forbidden("nope".to_string()).into();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err: ApiError = MessageError::ReplyNotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err: ApiError = UploadError::TooLarge { limit: 10 }.into();
        assert!(matches!(err, ApiError::PayloadTooLarge(_)));

        let err: ApiError = StoreError::Conflict("phone".to_string()).into();
        assert_eq!(err.to_string(), "phone already exists");
    }
}
