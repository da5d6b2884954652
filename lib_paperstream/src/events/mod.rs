//! # Stream Events
//!
//! Decoding of raw Jetstream frames and the filter that turns a creation
//! commit on the post collection into a `PreparedPost` ready for extraction.

/// Serde shapes of the Jetstream JSON envelope.
pub mod model;
/// Decode, filter, and shape extraction input.
pub mod processor;

pub use model::StreamEvent;
pub use processor::{EventError, EventProcessor, PreparedPost};
