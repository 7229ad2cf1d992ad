//! HTTP API for the campus share server.
//!
//! # Modules
//!
//! - [`auth`]: Registration, login, profile and logout
//! - [`resources`]: Resource publishing, browsing, search, downloads and comments
//! - [`messages`]: Category chat feeds with optional media
//! - [`middleware`]: Bearer token gate for protected endpoints
//! - [`request_id`]: Request correlation and access logging
//!
//! # Endpoints Overview
//!
//! ## Public
//! - `POST /api/auth/register`, `POST /api/auth/login`
//! - `GET /api/resources`, `GET /api/resources/{id}`, `GET /api/resources/search/query`
//! - `GET /api/resources/{id}/download`, `GET /api/resources/{id}/comments`
//! - `GET /api/messages/category/{name}`
//! - `GET /uploads/*`, `GET /health`
//!
//! ## Bearer token required
//! - `GET|PUT /api/auth/profile`, `POST /api/auth/logout`
//! - `POST /api/resources/upload`, `POST /api/resources/{id}/comments`
//! - `PUT|DELETE /api/resources/{id}`, `GET /api/resources/my-uploads/all`
//! - `POST /api/messages/post`, `DELETE /api/messages/{id}`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use campus_share::{auth::TokenService, db::Repositories, uploads::UploadStore};
//! use cs_server::api::{AppState, create_router};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState::new(
//!     Repositories::in_memory(),
//!     TokenService::new("a_very_long_development_secret_value"),
//!     String::new(),
//!     UploadStore::new("uploads", 25 * 1024 * 1024),
//! );
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:5000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod multipart;
pub mod request_id;
pub mod resources;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State},
    http::{
        HeaderName, HeaderValue, Method, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use campus_share::{
    AuthManager, CommentManager, MessageManager, ResourceManager,
    auth::TokenService,
    db::{Database, Repositories},
    uploads::UploadStore,
};
use serde_json::json;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
};

use error::ApiError;
use request_id::REQUEST_ID_HEADER;

/// Headroom above the file cap for the other multipart parts and framing.
const FORM_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Application state shared across all handlers.
///
/// Cloned per request; every field is behind an `Arc` or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub resource_manager: Arc<ResourceManager>,
    pub comment_manager: Arc<CommentManager>,
    pub message_manager: Arc<MessageManager>,
    pub uploads: Arc<UploadStore>,
    /// `None` when running on the in-memory store.
    pub database: Option<Database>,
    pub environment: String,
    pub cors_origins: Vec<String>,
}

impl AppState {
    /// Wire the managers over one set of repositories.
    pub fn new(
        repos: Repositories,
        tokens: TokenService,
        pepper: String,
        uploads: UploadStore,
    ) -> Self {
        let uploads = Arc::new(uploads);

        Self {
            auth_manager: Arc::new(AuthManager::new(repos.users.clone(), tokens, pepper)),
            resource_manager: Arc::new(ResourceManager::new(
                repos.resources.clone(),
                repos.users.clone(),
                uploads.clone(),
            )),
            comment_manager: Arc::new(CommentManager::new(
                repos.comments,
                repos.resources,
                repos.users.clone(),
            )),
            message_manager: Arc::new(MessageManager::new(
                repos.messages,
                repos.users,
                uploads.clone(),
            )),
            uploads,
            database: None,
            environment: "development".to_string(),
            cors_origins: Vec::new(),
        }
    }

    pub fn with_database(mut self, database: Database) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }
}

/// Create the complete router with all endpoints and middleware.
///
/// ```text
/// GET  /health                              - Health check
/// GET  /uploads/{file}                      - Stored media
/// POST /api/auth/register                   - Register
/// POST /api/auth/login                      - Login
/// GET  /api/auth/profile                    - Own profile (auth)
/// PUT  /api/auth/profile                    - Update profile (auth)
/// POST /api/auth/logout                     - Logout (auth)
/// POST /api/resources/upload                - Publish resource (auth)
/// GET  /api/resources                       - List resources
/// GET  /api/resources/search/query          - Search resources
/// GET  /api/resources/my-uploads/all        - Own resources (auth)
/// GET  /api/resources/{id}                  - Resource detail
/// PUT  /api/resources/{id}                  - Update resource (owner)
/// DELETE /api/resources/{id}                - Delete resource (owner)
/// GET  /api/resources/{id}/download         - Count download
/// GET  /api/resources/{id}/comments         - List comments
/// POST /api/resources/{id}/comments         - Add comment (auth)
/// POST /api/messages/post                   - Post message (auth)
/// GET  /api/messages/category/{name}        - Category feed
/// DELETE /api/messages/{id}                 - Delete message (sender)
/// ```
pub fn create_router(state: AppState) -> Router {
    let api_routes = create_api_router(state.clone());
    let cors = cors_layer(&state.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .nest_service("/uploads", ServeDir::new(state.uploads.root()))
        .fallback(route_not_found)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(cors)
        .with_state(state)
}

fn create_api_router(state: AppState) -> Router<AppState> {
    let form_limit = usize::try_from(state.uploads.max_bytes().saturating_add(FORM_OVERHEAD_BYTES))
        .unwrap_or(usize::MAX);

    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/resources", get(resources::list))
        .route("/resources/search/query", get(resources::search))
        .route("/resources/{id}", get(resources::get))
        .route("/resources/{id}/download", get(resources::download))
        .route("/resources/{id}/comments", get(resources::list_comments))
        .route("/messages/category/{name}", get(messages::list_by_category));

    let protected_routes = Router::new()
        .route("/auth/profile", get(auth::profile).put(auth::update_profile))
        .route("/auth/logout", post(auth::logout))
        .route(
            "/resources/upload",
            post(resources::upload).layer(DefaultBodyLimit::max(form_limit)),
        )
        .route("/resources/my-uploads/all", get(resources::my_uploads))
        .route(
            "/resources/{id}",
            put(resources::update).delete(resources::delete),
        )
        .route("/resources/{id}/comments", post(resources::add_comment))
        .route(
            "/messages/post",
            post(messages::post).layer(DefaultBodyLimit::max(form_limit)),
        )
        .route("/messages/{id}", axum::routing::delete(messages::delete))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Credentialed CORS for the configured browser origins.
///
/// Wildcards cannot be combined with credentials, so methods and headers are
/// listed explicitly. Origins that are not valid header values are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
}

async fn route_not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Liveness plus storage status.
///
/// `200 OK` when the store is reachable (or in-memory), `503 Service
/// Unavailable` when the configured database does not answer.
///
/// ```bash
/// curl http://localhost:5000/health
/// # {"status":"ok","timestamp":"2026-03-01T10:30:00Z","environment":"development","database":"connected"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (database, healthy) = match &state.database {
        Some(db) => match db.health_check().await {
            Ok(()) => ("connected", true),
            Err(e) => {
                tracing::warn!("Health check query failed: {}", e);
                ("unavailable", false)
            }
        },
        None => ("in-memory", true),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if healthy { "ok" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": state.environment,
        "database": database,
    });

    (status_code, Json(response))
}
