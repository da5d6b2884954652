use std::path::PathBuf;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Directory for the daily rolling JSON files. Created if missing.
    pub log_dir: PathBuf,
    /// Filter used when `RUST_LOG` is not set, e.g. `info` or `lib_paperstream=debug`.
    pub log_level: String,
    /// File name prefix of the rolling files.
    pub app_name: String,
    pub ansi: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("logs"),
            log_level: "info".to_string(),
            app_name: "paperstream".to_string(),
            ansi: true,
        }
    }
}

/// Builds the `EnvFilter`: `RUST_LOG` wins, the configured level is the fallback.
pub fn env_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| PipelineError::Logging(format!("invalid log filter '{}': {}", log_level, e)))
}

/// Installs the global subscriber: console output plus JSON lines in a daily
/// rolling file.
///
/// The returned guard flushes the file writer on drop; hold it in `main` for
/// the life of the process.
pub fn setup_logging(settings: &LogSettings) -> Result<WorkerGuard> {
    std::fs::create_dir_all(&settings.log_dir)?;

    let file_appender = rolling::daily(&settings.log_dir, &settings.app_name);
    let (non_blocking_appender, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer().with_target(true).with_ansi(settings.ansi);
    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking_appender)
        .json();

    tracing_subscriber::registry()
        .with(env_filter(&settings.log_level)?)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| PipelineError::Logging(e.to_string()))?;

    info!(level = %settings.log_level, dir = %settings.log_dir.display(), "Logging initialized");
    Ok(guard)
}
