use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heatos_lead_api::app::{build_router, build_state, RateLimit, RouterOptions};
use heatos_lead_api::config::Config;
use heatos_lead_api::connection::{spawn_monitor, ConnectionStatus};
use heatos_lead_api::db::Database;
use heatos_lead_api::db_storage::{LeadStore, PgLeadStore};

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Main entry point for the application.
///
/// Initializes logging and configuration, builds the lazily connected pool,
/// starts the connection monitor and serves HTTP until shutdown.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "heatos_lead_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let db = Database::connect_lazy(&config)?;
    tracing::info!("Database connection pool created");

    let status = ConnectionStatus::new();
    let store: Arc<dyn LeadStore> = Arc::new(PgLeadStore::new(db.pool.clone()));

    // Requests are rejected as "not initialized" until the first connection succeeds
    let monitor = spawn_monitor(
        store.clone(),
        status.clone(),
        Duration::from_secs(config.db_heartbeat_interval_secs),
    );

    let state = build_state(store, status, config.links.clone());
    let app = build_router(
        state,
        RouterOptions {
            body_limit_bytes: config.body_limit_bytes,
            rate_limit: Some(RateLimit {
                per_second: config.rate_limit_per_second,
                burst: config.rate_limit_burst,
            }),
        },
    )?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server is up & running on {}", addr);
    tracing::info!("API is ready to use: http://localhost:{}", config.port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    monitor.abort();
    db.pool.close().await;
    tracing::info!("Database connection pool closed");

    Ok(())
}
