//! # lib_paperstream
//!
//! Shared library behind the `paperstream` servers. It watches the Bluesky
//! Jetstream firehose for new posts, pulls references to papers, newsletter
//! posts and journalism articles out of the post text, and forwards them to
//! the ingestion endpoints.
//!
//! ## Modules:
//! - **`extract`**: the declarative pattern table and the scan routine.
//! - **`events`**: Jetstream message model and the `EventProcessor`.
//! - **`retrieve`**: the bearer-authenticated HTTP client (feature `retrieve`).
//! - **`core`**: connection state, dispatcher, stream manager and keep-alive
//!   (feature `ingestors`).
//! - **`ingestors`**: the live Jetstream WebSocket session (feature `ingestors`).
//! - **`configs`**: typed configuration with defaults.
//! - **`loggers`**: tracing subscriber setup (feature `loggers`).

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

pub mod configs;
pub mod error;
pub mod events;
pub mod extract;

#[cfg(feature = "ingestors")]
pub mod core;
#[cfg(feature = "ingestors")]
pub mod ingestors;
#[cfg(feature = "loggers")]
pub mod loggers;
#[cfg(feature = "retrieve")]
pub mod retrieve;

// Re-export the types the servers touch directly.
pub use configs::pipeline_config::{IngestConfig, PipelineConfig};
pub use error::{PipelineError, Result};
pub use events::{EventProcessor, PreparedPost, StreamEvent};
pub use extract::{extract_all, Category, ExtractedEntity, Extraction};

#[cfg(feature = "ingestors")]
pub use crate::core::{StartStatus, StatusSnapshot, StopStatus, StreamManager};
