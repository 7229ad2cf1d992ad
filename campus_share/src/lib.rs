//! # Campus Share
//!
//! Domain library for a campus-restricted resource sharing and category chat
//! service. Students register and authenticate, publish academic resources,
//! comment on them, and post messages into category feeds.
//!
//! ## Core Modules
//!
//! - [`auth`]: Credential store, Argon2id password hashing and JWT token service
//! - [`resources`]: Academic resource metadata, search and download counting
//! - [`comments`]: Append-only comments attached to resources
//! - [`messages`]: Category-scoped chat posts with optional media and replies
//! - [`uploads`]: Local-disk file intake for media and resource files
//! - [`db`]: Repository traits with PostgreSQL and in-memory backends
//!
//! ## Example
//!
//! ```no_run
//! use campus_share::auth::{AuthManager, RegisterRequest, TokenService};
//! use campus_share::db::Repositories;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repos = Repositories::in_memory();
//! let auth = AuthManager::new(
//!     repos.users.clone(),
//!     TokenService::new("a_very_long_development_secret_value"),
//!     String::new(),
//! );
//!
//! let session = auth
//!     .register(RegisterRequest {
//!         email: Some("a@x.com".to_string()),
//!         username: Some("a".to_string()),
//!         password: Some("secret1".to_string()),
//!         student_id: Some("S1".to_string()),
//!         phone: Some("111".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//! println!("registered {}", session.user.username);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod comments;
pub mod db;
pub mod de;
pub mod messages;
pub mod pagination;
pub mod resources;
pub mod uploads;

pub use auth::{AuthManager, TokenService, User, UserId};
pub use comments::CommentManager;
pub use db::{Database, DatabaseConfig, Repositories};
pub use messages::{Category, MessageManager};
pub use pagination::{PageRequest, Pagination};
pub use resources::ResourceManager;
pub use uploads::UploadStore;
