//! # Data Retrieval Module
//!
//! Outbound HTTP for the pipeline: one `ApiClient` built on `reqwest` and
//! `reqwest-middleware` that owns base-URL joining, bearer authentication and
//! JSON bodies, so the dispatcher only deals with categories and payloads.

/// Generic HTTP API client with optional retry middleware.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiResponse};
