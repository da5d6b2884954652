//! # Configuration Modules
//!
//! Typed configuration for the pipeline. Layering (file, env, CLI) is the
//! binary's job; this crate only defines the shapes and their defaults.

/// Stream, keep-alive and ingestion settings.
pub mod pipeline_config;
