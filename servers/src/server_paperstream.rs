//! # Paperstream Server
//!
//! Runs the firehose link extractor behind a small HTTP control surface:
//! `POST /start`, `POST /stop`, `GET /status`, `GET /health`. A cron job calls
//! `start` every minute so a stream the host dropped comes back on its own.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use lib_paperstream::StreamManager;
use lib_paperstream::loggers::{LogSettings, setup_logging};
use tokio::signal;
use tracing::{info, warn};

mod paperstream_logic;
use paperstream_logic::{config, routes, scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so clap sees its values.
    dotenvy::dotenv().ok();

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    let config = config::load_config()?;

    let log_settings = LogSettings {
        log_dir: config.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs")),
        log_level: config.log_level.clone().unwrap_or_else(|| "info".to_string()),
        app_name: "server_paperstream".to_string(),
        ansi: true,
    };
    let _log_guard = setup_logging(&log_settings)?;

    let pipeline_config = config.to_pipeline_config()?;
    info!(
        stream = %pipeline_config.stream_url,
        ingest = %pipeline_config.ingest.base_url,
        "Configuration loaded"
    );

    let manager = StreamManager::new(pipeline_config).context("failed to build stream manager")?;

    if config.autostart.unwrap_or(true) {
        manager.start();
    }

    let cron = config.self_heal_cron.as_deref().unwrap_or("0 * * * * *");
    let mut self_heal = scheduler::start_self_heal(&manager, cron).await?;

    let port = config.port.unwrap_or(8787);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Control surface live at http://{}", addr);

    axum::serve(listener, routes::router(manager.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    warn!("Shutdown signal received. Stopping stream...");
    if let Err(e) = self_heal.shutdown().await {
        warn!(error = %e, "Self-heal scheduler did not shut down cleanly");
    }
    manager.stop().await;
    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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
