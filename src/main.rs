mod api;
mod app_state;
mod config;
mod core;
mod domain;
mod errors;
mod routes;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::app_state::build_app_state;
use crate::config::AppConfig;
use crate::core::persistence::logs::log_repository::LOG_FILE_PREFIX;
use crate::core::persistence::mysql::mysql_report_store::MySqlReportStore;

fn init_tracing(log_dir: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log dir {log_dir}"))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ota_report_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();

    Ok(guard)
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
    info!("Shutdown requested, cancelling running reports");
    shutdown.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let _log_guard = init_tracing(&config.log_dir)?;

    let store = MySqlReportStore::connect_lazy(&config.database_url, config.db_max_connections)?;
    let shutdown = CancellationToken::new();
    let state = build_app_state(&config, store.clone(), shutdown.clone());

    let app = routes::app_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(
        addr = %config.bind_addr,
        raw_retention_hours = config.raw_retention_hours,
        minute_retention_hours = config.minute_retention_hours,
        percentile_workers = config.percentile_workers,
        "Usage report server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("server error")?;

    store.close().await;
    info!("Server stopped");
    Ok(())
}
