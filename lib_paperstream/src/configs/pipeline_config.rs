use std::fmt;
use std::time::Duration;

/// Default Jetstream endpoint, pre-filtered to the post collection.
pub const DEFAULT_STREAM_URL: &str =
    "wss://jetstream2.us-east.bsky.network/subscribe?wantedCollections=app.bsky.feed.post";

/// Record collection that holds Bluesky posts.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Configuration for the live stream and everything hanging off it.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub stream_url: String,
    pub post_collection: String,
    /// Fixed delay between a close and the next connection attempt.
    pub reconnect_delay: Duration,
    /// Interval of the keep-alive wake that reconnects a silently dropped stream.
    pub keepalive_interval: Duration,
    pub ingest: IngestConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stream_url: DEFAULT_STREAM_URL.to_string(),
            post_collection: POST_COLLECTION.to_string(),
            reconnect_delay: Duration::from_secs(5),
            keepalive_interval: Duration::from_secs(5),
            ingest: IngestConfig::default(),
        }
    }
}

/// Downstream ingestion endpoints.
#[derive(Clone)]
pub struct IngestConfig {
    /// Base URL the per-category paths are joined onto.
    pub base_url: String,
    /// Shared bearer secret sent with every batch.
    pub secret: String,
    pub timeout: Duration,
    /// Retries for transient failures. Ingestion is at-most-once, so this stays 0.
    pub max_retries: u32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000/".to_string(),
            secret: String::new(),
            timeout: Duration::from_secs(10),
            max_retries: 0,
        }
    }
}

// Keep the secret out of logs.
impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("base_url", &self.base_url)
            .field("secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_jetstream_setup() {
        let config = PipelineConfig::default();
        assert!(config.stream_url.starts_with("wss://"));
        assert!(config.stream_url.contains("wantedCollections=app.bsky.feed.post"));
        assert_eq!(config.post_collection, POST_COLLECTION);
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.keepalive_interval, Duration::from_secs(5));
        assert_eq!(config.ingest.max_retries, 0);
    }

    #[test]
    fn debug_output_redacts_the_secret() {
        let ingest = IngestConfig {
            secret: "hunter2".to_string(),
            ..IngestConfig::default()
        };
        let printed = format!("{:?}", ingest);
        assert!(!printed.contains("hunter2"));
        assert!(printed.contains("<redacted>"));
    }
}
