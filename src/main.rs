//! MSS - Multi-Site Session server
//!
//! Stores accounts for external sites, each site carrying a set of
//! dynamically defined property fields.
//!
//! STARTUP: the SQLite store is opened and brought up to date by the
//! migration runner before the HTTP surface comes up:
//! - a fresh database file always gets every migration applied
//! - an existing one is migrated only when `MSS_AUTO_MIGRATE` is set,
//!   otherwise pending versions are logged and left alone

mod config;
mod db;
mod error;
mod migrate;
mod models;
mod routes;
mod state;
mod validation;

use crate::config::Settings;
use crate::db::Store;
use crate::migrate::{DirectoryMigrations, EmbeddedMigrations, MigrationSource};
use crate::routes::create_router;
use crate::state::AppState;
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("🚀 Starting MSS server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("📋 Configuration loaded successfully");

    let migrations = migration_source(&settings);
    let store = open_store(&settings, migrations.as_ref())?;
    let state = Arc::new(AppState::new(store, migrations));

    // Build the router
    let app = create_router(state, &settings);

    let addr = SocketAddr::from((settings.server.host, settings.server.port));
    info!("🌐 Server listening on http://{}", addr);

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,mss_server=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Migrations from `MSS_MIGRATIONS_DIR` when set, else the embedded set
fn migration_source(settings: &Settings) -> Box<dyn MigrationSource> {
    match &settings.database.migrations_dir {
        Some(dir) => Box::new(DirectoryMigrations::new(dir.clone())),
        None => Box::new(EmbeddedMigrations),
    }
}

/// Open the store and apply the startup migration policy
fn open_store(settings: &Settings, migrations: &dyn MigrationSource) -> anyhow::Result<Store> {
    let path = &settings.database.path;
    let needs_init = !path
        .try_exists()
        .with_context(|| format!("Failed to check database file {}", path.display()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
    }

    let store = Store::open(path)?;
    info!("✅ Store opened: {}", path.display());

    if needs_init || settings.database.auto_migrate {
        info!(
            "Applying migrations from {} (new database: {})",
            migrations.describe(),
            needs_init
        );
        match store.apply_migrations(migrations) {
            Ok(applied) => info!("✅ Applied {} migration(s)", applied),
            Err(e) => {
                error!("❌ FATAL: Migration failed: {}", e);
                return Err(e.into());
            }
        }
    } else {
        match store.pending_migrations(migrations) {
            Ok(pending) if pending.is_empty() => info!("Schema is up to date"),
            Ok(pending) => warn!(
                "⚠️  {} pending migration(s): {} (set MSS_AUTO_MIGRATE=1 to apply)",
                pending.len(),
                pending.join(", ")
            ),
            Err(e) => warn!("⚠️  Could not check pending migrations: {}", e),
        }
    }

    Ok(store)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("📴 Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            info!("📴 Received terminate signal, initiating graceful shutdown...");
        },
    }
}
