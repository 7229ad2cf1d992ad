//! Database module providing PostgreSQL connection pooling, schema bootstrap
//! and the repository bundle shared by the managers.
//!
//! Two backends implement every repository trait:
//! - [`PgStore`]: PostgreSQL through sqlx, used in production
//! - [`MemoryStore`]: process-local, used for development without a database and in tests

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::{sync::Arc, time::Duration};
use thiserror::Error;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use repository::{CommentRepository, MessageRepository, ResourceRepository, UserRepository};

/// Storage errors shared by all repositories
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unique constraint violated on the named field
    #[error("Duplicate value for {0}")]
    Conflict(String),

    /// Stored row could not be mapped back into a model
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Database details are never shown to clients.
    pub fn client_message(&self) -> String {
        match self {
            StoreError::Conflict(field) => format!("{field} already exists"),
            _ => "Internal server error".to_string(),
        }
    }
}

/// Result type for repository operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Schema, applied idempotently at startup.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        email TEXT NOT NULL UNIQUE,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        full_name TEXT,
        student_id TEXT NOT NULL UNIQUE,
        phone TEXT NOT NULL UNIQUE,
        is_hosteller BOOLEAN NOT NULL DEFAULT FALSE,
        hostel TEXT,
        degree TEXT,
        branch TEXT,
        department TEXT,
        year INTEGER,
        consent_for_contact BOOLEAN NOT NULL DEFAULT FALSE,
        role TEXT NOT NULL DEFAULT 'student',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS resources (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        subject TEXT NOT NULL,
        year INTEGER NOT NULL,
        file_url TEXT NOT NULL,
        stored_file BOOLEAN NOT NULL DEFAULT FALSE,
        uploaded_by UUID NOT NULL REFERENCES users(id),
        downloads BIGINT NOT NULL DEFAULT 0,
        tags TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "ALTER TABLE resources ADD COLUMN IF NOT EXISTS stored_file BOOLEAN NOT NULL DEFAULT FALSE",
    "CREATE INDEX IF NOT EXISTS resources_created_at_idx ON resources (created_at DESC)",
    "CREATE INDEX IF NOT EXISTS resources_uploaded_by_idx ON resources (uploaded_by)",
    r#"
    CREATE TABLE IF NOT EXISTS comments (
        id UUID PRIMARY KEY,
        resource_id UUID NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
        user_id UUID NOT NULL REFERENCES users(id),
        comment TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS comments_resource_idx ON comments (resource_id, created_at DESC)",
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id UUID PRIMARY KEY,
        category TEXT NOT NULL,
        text TEXT NOT NULL DEFAULT '',
        media_url TEXT,
        media_type TEXT,
        sender UUID NOT NULL REFERENCES users(id),
        reply_to UUID REFERENCES messages(id) ON DELETE SET NULL,
        consent_for_contact BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS messages_category_idx ON messages (category, created_at DESC)",
];

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use campus_share::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::new("postgres://postgres@localhost/campus_share");
    ///     let db = Database::new(&config).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes that do not exist yet
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Repository handles consumed by the managers.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub resources: Arc<dyn ResourceRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub messages: Arc<dyn MessageRepository>,
}

impl Repositories {
    /// Repositories backed by PostgreSQL.
    pub fn postgres(pool: PgPool) -> Self {
        Self::from_store(Arc::new(PgStore::new(pool)))
    }

    /// Repositories backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::from_store(Arc::new(MemoryStore::new()))
    }

    fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + ResourceRepository + CommentRepository + MessageRepository + 'static,
    {
        Self {
            users: store.clone(),
            resources: store.clone(),
            comments: store.clone(),
            messages: store,
        }
    }
}
