//! # Core Engine Module
//!
//! The live side of the pipeline: connection state, the stream manager that
//! owns the Jetstream connection, the keep-alive wake, and the dispatcher that
//! forwards findings downstream.
//!
//! - **`state`**: atomic phase and counters behind the status route.
//! - **`stream_manager`**: start/stop, reconnect, and per-message routing.
//! - **`keepalive`**: self-healing reconnect for silently dropped streams.
//! - **`dispatcher`**: per-category fire-and-forget ingestion requests.

/// Connection phase, counters, and status snapshots.
pub mod state;
/// Per-category ingestion requests on detached tasks.
pub mod dispatcher;
/// Periodic wake that reconnects an idle stream.
pub mod keepalive;
/// The single connection owner.
pub mod stream_manager;

// --- Public API Re-exports ---
pub use dispatcher::{IngestionBatch, IngestionDispatcher};
pub use state::{ConnectionPhase, FoundCounts, PipelineState, StatusSnapshot};
pub use stream_manager::{StartStatus, StopStatus, StreamManager};
