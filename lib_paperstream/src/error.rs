use thiserror::Error;

/// Result type alias for pipeline setup operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors raised while building or configuring the pipeline.
///
/// Runtime failures on the live stream are never surfaced through this type;
/// they end up in the status `lastError` instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[cfg(feature = "retrieve")]
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[cfg(feature = "retrieve")]
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error occurred: {0}")]
    Io(#[from] std::io::Error),
}
