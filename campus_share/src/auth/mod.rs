//! Authentication module providing registration, login and token handling.
//!
//! This module implements:
//! - Argon2id password hashing with an optional server-side pepper
//! - Stateless HS256 JWT bearer tokens (7-day expiry, no revocation list)
//! - Login by email, username, student ID or phone
//! - Owner-only partial profile updates
//!
//! ## Example
//!
//! ```no_run
//! use campus_share::auth::{AuthManager, LoginRequest, TokenService};
//! use campus_share::db::Repositories;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repos = Repositories::in_memory();
//! let auth = AuthManager::new(repos.users, TokenService::new("jwt_secret"), String::new());
//!
//! let session = auth
//!     .login(LoginRequest {
//!         email: Some("student42".to_string()),
//!         password: Some("secret1".to_string()),
//!     })
//!     .await?;
//! let claims = auth.verify_token(&session.token)?;
//! assert_eq!(claims.user_id, session.user.id);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod manager;
pub mod models;
pub mod tokens;

pub use errors::{AuthError, AuthResult, TokenError};
pub use manager::AuthManager;
pub use models::{
    AuthSession, Credentials, IdentityKeys, LoginRequest, NewUser, ProfileUpdate, RegisterRequest,
    Role, TokenClaims, TokenIdentity, User, UserId, UserSummary,
};
pub use tokens::TokenService;
