//! # Data Ingestors Module
//!
//! Clients for the live sources feeding the pipeline. Each ingestor owns the
//! protocol side of one source (connect, read frames, close) and hands decoded
//! frames to a `SessionHandler`. Reconnection policy lives in the caller.
//!
//! ## Contained Modules:
//! - **`jetstream_wss`**: one WebSocket session against the Bluesky Jetstream.

/// The WebSocket client for the Jetstream firehose.
pub mod jetstream_wss;

pub use jetstream_wss::{JetstreamWssIngestor, SessionEnd, SessionHandler};
