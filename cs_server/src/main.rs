//! Campus share HTTP server.
//!
//! Serves the REST API over PostgreSQL, or over the in-memory store in
//! development when no database is configured or reachable.

use std::net::SocketAddr;

use anyhow::Error;
use campus_share::{
    auth::TokenService,
    db::{Database, DatabaseConfig, Repositories},
    uploads::UploadStore,
};
use cs_server::{
    api,
    config::{ConfigError, ServerConfig},
    logging, metrics,
};
use pico_args::Arguments;
use tracing::{info, warn};

const HELP: &str = "\
Run the campus share API server

USAGE:
  cs_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 0.0.0.0:$PORT]
  --db-url     URL         Database connection string  [default: env DATABASE_URL]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  APP_ENV                  Deployment environment [default: development]
  PORT                     Listen port when SERVER_BIND is unset [default: 5000]
  DATABASE_URL             PostgreSQL connection string (required outside development)
  JWT_SECRET               JWT signing secret, at least 32 characters
  PASSWORD_PEPPER          Optional password hashing pepper
  CORS_ORIGINS             Comma-separated allowed origins
  UPLOAD_DIR               Upload directory [default: uploads]
  MAX_UPLOAD_BYTES         Per-file upload cap [default: 26214400]
  METRICS_BIND             Prometheus listener address (disabled when unset)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        return Ok(());
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url)
        .and_then(|config| config.validate().map(|()| config))
        .map_err(|e: ConfigError| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!(
        environment = %config.environment,
        "Starting campus share server at {}",
        config.bind
    );

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics available at http://{}/metrics", addr);
    }

    let database = connect_database(&config).await?;
    let repos = match &database {
        Some(db) => Repositories::postgres(db.pool().clone()),
        None => Repositories::in_memory(),
    };

    let uploads = UploadStore::new(&config.uploads.dir, config.uploads.max_bytes);
    uploads
        .ensure_dir()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create upload directory: {}", e))?;
    info!("Storing uploads in {}", uploads.root().display());

    let mut state = api::AppState::new(
        repos,
        TokenService::new(&config.security.jwt_secret),
        config.security.password_pepper.clone(),
        uploads,
    )
    .with_environment(config.environment.clone())
    .with_cors_origins(config.cors_origins.clone());
    if let Some(db) = &database {
        state = state.with_database(db.clone());
    }

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Connect and bootstrap the schema.
///
/// In development a missing or unreachable database falls back to the
/// in-memory store; elsewhere it is fatal.
async fn connect_database(config: &ServerConfig) -> Result<Option<Database>, Error> {
    let Some(db_config) = &config.database else {
        warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
        return Ok(None);
    };

    match open_database(db_config).await {
        Ok(db) => {
            info!("Database connected successfully");
            Ok(Some(db))
        }
        Err(e) if config.is_development() => {
            warn!("Database unavailable ({}); falling back to in-memory store", e);
            Ok(None)
        }
        Err(e) => Err(anyhow::anyhow!("Failed to connect to database: {}", e)),
    }
}

async fn open_database(config: &DatabaseConfig) -> Result<Database, Error> {
    let db = Database::new(config).await?;
    db.migrate().await?;
    Ok(db)
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
