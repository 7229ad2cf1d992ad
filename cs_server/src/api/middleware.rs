//! Authentication middleware for protected endpoints.
//!
//! Extracts the bearer token from the `Authorization` header, verifies it and
//! injects the caller's [`AuthUser`] into request extensions. The user record
//! is not re-fetched, so a token stays usable until it expires.
//!
//! # Usage
//!
//! ```rust,no_run
//! use axum::{Extension, Router, middleware, routing::get};
//! use cs_server::api::{AppState, middleware::{AuthUser, auth_middleware}};
//!
//! async fn whoami(Extension(user): Extension<AuthUser>) -> String {
//!     user.email
//! }
//!
//! # let state: AppState = unimplemented!();
//! let protected: Router<AppState> = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(middleware::from_fn_with_state(state, auth_middleware));
//! # let _ = protected;
//! ```

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use campus_share::auth::{TokenError, UserId};

use super::{AppState, error::ApiError};
use crate::logging::log_security_event;

/// Authenticated caller, available to handlers as `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: String,
}

/// Pull the token out of an `Authorization` value. Like a naive
/// `split(' ')[1]`, the scheme word itself is not checked.
fn token_from_header(value: &str) -> Option<&str> {
    value.split(' ').nth(1).filter(|token| !token.is_empty())
}

/// Authentication middleware that validates JWT tokens and injects [`AuthUser`].
///
/// # Errors
///
/// All failures are `401`:
/// - header absent: "No token provided"
/// - header without a token segment: "Invalid token format"
/// - expiry passed: "Token expired"
/// - anything else: "Invalid token"
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Err(ApiError::Auth("No token provided".to_string()));
    };

    let token = header
        .to_str()
        .ok()
        .and_then(token_from_header)
        .ok_or_else(|| ApiError::Auth("Invalid token format".to_string()))?;

    match state.auth_manager.verify_token(token) {
        Ok(claims) => {
            request.extensions_mut().insert(AuthUser {
                user_id: claims.user_id,
                email: claims.email,
            });
            Ok(next.run(request).await)
        }
        Err(e) => {
            if matches!(e, TokenError::Invalid) {
                log_security_event("invalid_token", None, "Rejected bearer token");
            }
            Err(e.into())
        }
    }
}
