//! Flashdeck Server Binary
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! flashdeck --config config.yaml
//!
//! # With environment variables only
//! FLASHDECK_STORAGE__BACKEND=memory flashdeck
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{debug, error, info};

use flashdeck_api::http::{create_router_with_observability, AppState};
use flashdeck_api::observability::{init_logging, init_metrics, LoggingConfig, MetricsState};
use flashdeck_server::config::StorageBackend;
use flashdeck_server::ServerConfig;
use flashdeck_storage::{
    DataStore, MemoryDataStore, MemorySessionStore, PostgresConfig, PostgresDataStore,
};

/// How often expired sessions are swept from the session store.
const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(300);

/// Flashdeck - flashcard study server
#[derive(Parser, Debug)]
#[command(name = "flashdeck")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(&LoggingConfig::from_settings(&config.logging))?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Flashdeck server");

    let metrics_state = if config.metrics.enabled {
        let state = init_metrics()?;
        info!("Metrics enabled at /metrics");
        Some(state)
    } else {
        None
    };

    let addr: SocketAddr = config.bind_address().parse()?;

    info!(backend = %config.storage.backend, "Selected storage backend");

    match config.storage.backend {
        StorageBackend::Memory => {
            let storage = MemoryDataStore::new_shared();
            run_server(storage, addr, &config, metrics_state).await
        }
        StorageBackend::Postgres => {
            let database_url = config.storage.database_url.as_ref().ok_or_else(|| {
                anyhow::anyhow!("storage.database_url is required for postgres backend")
            })?;

            info!("Connecting to PostgreSQL database");
            let pg_config = PostgresConfig {
                database_url: database_url.clone(),
                max_connections: config.storage.pool_size,
                min_connections: 1,
                connect_timeout_secs: config.storage.connection_timeout_secs,
                query_timeout_secs: config.storage.query_timeout_secs,
                ..Default::default()
            };

            let storage = PostgresDataStore::from_config(&pg_config).await?;
            info!("PostgreSQL connection established");

            info!("Running database migrations");
            storage.run_migrations().await?;
            info!("Database migrations complete");

            run_server(Arc::new(storage), addr, &config, metrics_state).await
        }
    }
}

/// Builds the application state and serves HTTP until a shutdown signal.
async fn run_server<S: DataStore>(
    storage: Arc<S>,
    addr: SocketAddr,
    config: &ServerConfig,
    metrics_state: Option<MetricsState>,
) -> anyhow::Result<()> {
    let sessions = MemorySessionStore::new_shared(Duration::from_secs(config.session.ttl_secs));

    let purge_sessions = Arc::clone(&sessions);
    let purge_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purge_sessions.purge_expired();
            debug!(
                purged,
                remaining = purge_sessions.active_sessions(),
                "session sweep finished"
            );
        }
    });

    let state = AppState::from_config(storage, sessions, config);
    let router = create_router_with_observability(
        state,
        metrics_state,
        config.server.body_limit_bytes,
    );

    info!(%addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    purge_task.abort();
    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_parsing() {
        let args = Args::try_parse_from(["flashdeck"]).unwrap();
        assert!(args.config.is_none());

        let args = Args::try_parse_from(["flashdeck", "--config", "config.yaml"]).unwrap();
        assert_eq!(args.config, Some("config.yaml".to_string()));

        let args = Args::try_parse_from(["flashdeck", "-c", "test.yaml"]).unwrap();
        assert_eq!(args.config, Some("test.yaml".to_string()));
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Args::try_parse_from(["flashdeck", "--port", "80"]).is_err());
    }
}
