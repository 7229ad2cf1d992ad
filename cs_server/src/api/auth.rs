//! Authentication API handlers.
//!
//! Register and login are public; profile and logout require a bearer token.
//!
//! # Examples
//!
//! Register a new user:
//! ```bash
//! curl -X POST http://localhost:5000/api/auth/register \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "ana@campus.edu", "username": "ana", "password": "secret1",
//!        "student_id": "21BCE0001", "phone": "9876543210"}'
//! ```
//!
//! Login with any identifier:
//! ```bash
//! curl -X POST http://localhost:5000/api/auth/login \
//!   -H "Content-Type: application/json" \
//!   -d '{"email": "21BCE0001", "password": "secret1"}'
//! ```

use axum::{Extension, Json, extract::State, http::StatusCode};
use campus_share::auth::{AuthError, AuthSession, LoginRequest, ProfileUpdate, RegisterRequest, User};
use serde::Serialize;

use super::{AppState, error::ApiResult, extract::ApiJson, middleware::AuthUser};
use crate::{logging::log_security_event, metrics};

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: &'static str,
    pub token: String,
    pub user: User,
}

impl AuthResponse {
    fn new(message: &'static str, session: AuthSession) -> Self {
        Self {
            success: true,
            message,
            token: session.token,
            user: session.user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Register a new account and log it in.
///
/// # Response
///
/// `201 Created` with `{success, message, token, user}`.
///
/// # Errors
///
/// - `400`: missing field or password shorter than six characters
/// - `409`: email, username, student ID or phone already registered
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let session = state.auth_manager.register(request).await?;

    tracing::info!(user_id = %session.user.id, "User registered");
    metrics::registrations_total();

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new("User registered successfully", session)),
    ))
}

/// Authenticate by email, username, student ID or phone.
///
/// # Errors
///
/// - `400`: identifier or password missing
/// - `401`: unknown identifier or wrong password (same message for both)
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    match state.auth_manager.login(request).await {
        Ok(session) => {
            metrics::login_attempts_total(true);
            Ok(Json(AuthResponse::new("Login successful", session)))
        }
        Err(e) => {
            if matches!(e, AuthError::InvalidCredentials) {
                metrics::login_attempts_total(false);
                log_security_event("failed_login", None, "Invalid credentials");
            }
            Err(e.into())
        }
    }
}

/// Current user's profile.
pub async fn profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state.auth_manager.profile(caller.user_id).await?;

    Ok(Json(ProfileResponse {
        success: true,
        message: None,
        user,
    }))
}

/// Partial profile update.
///
/// # Errors
///
/// - `404`: the token's user no longer exists
/// - `409`: new phone or student ID belongs to another user
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = state
        .auth_manager
        .update_profile(caller.user_id, update)
        .await?;

    Ok(Json(ProfileResponse {
        success: true,
        message: Some("Profile updated successfully"),
        user,
    }))
}

/// Tokens are stateless; logout only tells the client to drop its token.
pub async fn logout(Extension(caller): Extension<AuthUser>) -> Json<MessageResponse> {
    tracing::debug!(user_id = %caller.user_id, email = %caller.email, "Logout");

    Json(MessageResponse {
        success: true,
        message: "Logout successful. Please clear the token on frontend.",
    })
}
