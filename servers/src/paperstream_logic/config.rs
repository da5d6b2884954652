use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use lib_paperstream::configs::pipeline_config::{DEFAULT_STREAM_URL, POST_COLLECTION};
use lib_paperstream::{IngestConfig, PipelineConfig};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "server_paperstream.conf";

#[derive(Parser, Deserialize, Serialize, Clone, Default)]
#[clap(about = "Bluesky firehose link extractor", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "PAPERSTREAM_PORT", help = "Port for the control surface.")]
    pub port: Option<u16>,

    #[clap(long, env = "PAPERSTREAM_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "PAPERSTREAM_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "PAPERSTREAM_LOG_LEVEL", help = "Log filter used when RUST_LOG is unset.")]
    pub log_level: Option<String>,

    #[clap(long, env = "JETSTREAM_URL", help = "Jetstream WebSocket URL.")]
    pub stream_url: Option<String>,

    #[clap(long, env = "INGEST_BASE_URL", help = "Base URL of the ingestion endpoints.")]
    pub ingest_base_url: Option<String>,

    #[clap(long, env = "INGEST_SECRET", hide_env_values = true, help = "Bearer secret for the ingestion endpoints.")]
    pub ingest_secret: Option<String>,

    #[clap(long, env = "INGEST_TIMEOUT_SECONDS", help = "Timeout per ingestion request.")]
    pub ingest_timeout_seconds: Option<u64>,

    #[clap(long, env = "RECONNECT_DELAY_SECONDS", help = "Delay before reconnecting a closed stream.")]
    pub reconnect_delay_seconds: Option<u64>,

    #[clap(long, env = "KEEPALIVE_INTERVAL_SECONDS", help = "Interval of the keep-alive wake.")]
    pub keepalive_interval_seconds: Option<u64>,

    #[clap(long, env = "SELF_HEAL_CRON", help = "Cron expression of the self-heal job (with seconds).")]
    pub self_heal_cron: Option<String>,

    #[clap(long, env = "PAPERSTREAM_AUTOSTART", help = "Start the stream at boot (true/false).")]
    pub autostart: Option<bool>,
}

impl Config {
    /// Built-in defaults, the lowest layer.
    pub fn defaults() -> Config {
        Config {
            port: Some(8787),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            stream_url: Some(DEFAULT_STREAM_URL.to_string()),
            ingest_base_url: Some("http://127.0.0.1:3000/".to_string()),
            ingest_timeout_seconds: Some(10),
            reconnect_delay_seconds: Some(5),
            keepalive_interval_seconds: Some(5),
            self_heal_cron: Some("0 * * * * *".to_string()),
            autostart: Some(true),
            ..Default::default()
        }
    }

    // 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            stream_url: other.stream_url.or(self.stream_url),
            ingest_base_url: other.ingest_base_url.or(self.ingest_base_url),
            ingest_secret: other.ingest_secret.or(self.ingest_secret),
            ingest_timeout_seconds: other.ingest_timeout_seconds.or(self.ingest_timeout_seconds),
            reconnect_delay_seconds: other.reconnect_delay_seconds.or(self.reconnect_delay_seconds),
            keepalive_interval_seconds: other.keepalive_interval_seconds.or(self.keepalive_interval_seconds),
            self_heal_cron: other.self_heal_cron.or(self.self_heal_cron),
            autostart: other.autostart.or(self.autostart),
        }
    }

    /// Library configuration. Fails when the ingestion secret is missing.
    pub fn to_pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let secret = match self.ingest_secret.as_deref() {
            Some(s) if !s.trim().is_empty() => s.to_string(),
            _ => bail!("ingestion secret is required (INGEST_SECRET or --ingest-secret)"),
        };
        let defaults = PipelineConfig::default();
        let seconds = |v: Option<u64>, fallback: Duration| v.map(Duration::from_secs).unwrap_or(fallback);

        Ok(PipelineConfig {
            stream_url: self.stream_url.clone().unwrap_or(defaults.stream_url),
            post_collection: POST_COLLECTION.to_string(),
            reconnect_delay: seconds(self.reconnect_delay_seconds, defaults.reconnect_delay),
            keepalive_interval: seconds(self.keepalive_interval_seconds, defaults.keepalive_interval),
            ingest: IngestConfig {
                base_url: self.ingest_base_url.clone().unwrap_or(defaults.ingest.base_url),
                secret,
                timeout: seconds(self.ingest_timeout_seconds, defaults.ingest.timeout),
                max_retries: 0,
            },
        })
    }
}

/// Reads a JSON config file. A missing file is not an error.
fn read_config_file(path: &Path) -> anyhow::Result<Option<Config>> {
    if !path.exists() {
        tracing::info!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
        return Ok(None);
    }
    let config_str = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let file_config = serde_json::from_str::<Config>(&config_str)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(Some(file_config))
}

/// Layers defaults, the config file, then env/CLI values in `cli`.
pub fn load_config_from(cli: Config) -> anyhow::Result<Config> {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path)? {
        current_config = current_config.merge(file_config);
    }
    Ok(current_config.merge(cli))
}

pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(Config::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(config_path: PathBuf) -> Config {
        Config {
            config_path: Some(config_path),
            ..Default::default()
        }
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(cli(dir.path().join("absent.conf"))).unwrap();
        assert_eq!(config.port, Some(8787));
        assert_eq!(config.self_heal_cron.as_deref(), Some("0 * * * * *"));
        assert_eq!(config.ingest_secret, None);
    }

    #[test]
    fn file_overrides_defaults_and_cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 9000, "ingestSecret": "from-file", "reconnectDelaySeconds": 7}}"#).unwrap();

        let mut args = cli(file.path().to_path_buf());
        args.port = Some(9100);
        let config = load_config_from(args).unwrap();

        assert_eq!(config.port, Some(9100));
        assert_eq!(config.ingest_secret.as_deref(), Some("from-file"));
        assert_eq!(config.reconnect_delay_seconds, Some(7));
        assert_eq!(config.keepalive_interval_seconds, Some(5));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(load_config_from(cli(file.path().to_path_buf())).is_err());
    }

    #[test]
    fn pipeline_config_requires_a_secret() {
        let config = Config::defaults();
        assert!(config.to_pipeline_config().is_err());

        let config = Config {
            ingest_secret: Some("s3cret".into()),
            ingest_timeout_seconds: Some(3),
            ..Config::defaults()
        };
        let pipeline = config.to_pipeline_config().unwrap();
        assert_eq!(pipeline.ingest.secret, "s3cret");
        assert_eq!(pipeline.ingest.timeout, Duration::from_secs(3));
        assert_eq!(pipeline.ingest.max_retries, 0);
        assert_eq!(pipeline.reconnect_delay, Duration::from_secs(5));
    }
}
