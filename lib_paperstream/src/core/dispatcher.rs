//! # Ingestion Dispatcher
//!
//! Turns one event's extraction into at most one `POST` per category and sends
//! them as detached tasks on the session's `TaskTracker`.
//!
//! Categories are independent: each request runs in its own task, so a slow or
//! failing endpoint never holds back the others or the stream. Delivery is
//! at-most-once. A failure lands in `lastError` and the log, nowhere else.

use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::core::state::PipelineState;
use crate::events::PreparedPost;
use crate::extract::{Category, ExtractedEntity, Extraction};
use crate::retrieve::ky_http::{ApiClient, RequestError};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("HTTP {status}{}", body_suffix(.body))]
    Status { status: u16, body: Option<String> },
}

fn body_suffix(body: &Option<String>) -> String {
    body.as_deref().map(|b| format!(": {}", b)).unwrap_or_default()
}

/// One outbound request body, before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionBatch {
    pub category: Category,
    pub entities: Vec<ExtractedEntity>,
    pub post_uri: String,
    pub author_did: String,
    pub post_text: String,
    pub created_at: String,
    pub quoted_post_uri: Option<String>,
}

impl IngestionBatch {
    /// JSON body: the entity list under the category's key plus post context.
    pub fn to_payload(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            self.category.payload_key().to_string(),
            serde_json::to_value(&self.entities).unwrap_or(Value::Array(Vec::new())),
        );
        body.insert("postUri".into(), Value::String(self.post_uri.clone()));
        body.insert("authorDid".into(), Value::String(self.author_did.clone()));
        body.insert("postText".into(), Value::String(self.post_text.clone()));
        body.insert("createdAt".into(), Value::String(self.created_at.clone()));
        if let Some(uri) = &self.quoted_post_uri {
            body.insert("quotedPostUri".into(), Value::String(uri.clone()));
        }
        Value::Object(body)
    }
}

/// Batches to send for one post. A category goes out when it found something,
/// or, for categories that forward quotes, when the post quotes another post.
pub fn build_batches(post: &PreparedPost, extraction: &Extraction) -> Vec<IngestionBatch> {
    Category::ALL
        .into_iter()
        .filter_map(|category| {
            let entities = extraction.get(category);
            let quoted = category.forwards_quotes() && post.quoted_post_uri.is_some();
            if entities.is_empty() && !quoted {
                return None;
            }
            Some(IngestionBatch {
                category,
                entities: entities.to_vec(),
                post_uri: post.post_uri.clone(),
                author_did: post.author_did.clone(),
                post_text: post.text.clone(),
                created_at: post.created_at.clone(),
                quoted_post_uri: post.quoted_post_uri.clone(),
            })
        })
        .collect()
}

pub struct IngestionDispatcher {
    client: Arc<ApiClient>,
    state: Arc<PipelineState>,
    tracker: TaskTracker,
}

impl IngestionDispatcher {
    pub fn new(client: ApiClient, state: Arc<PipelineState>, tracker: TaskTracker) -> Self {
        Self {
            client: Arc::new(client),
            state,
            tracker,
        }
    }

    /// Spawns one task per batch and returns immediately. Each task stops early
    /// when `token` is cancelled.
    pub fn dispatch(&self, post: &PreparedPost, extraction: &Extraction, token: &CancellationToken) -> usize {
        let batches = build_batches(post, extraction);
        let spawned = batches.len();

        for batch in batches {
            let client = Arc::clone(&self.client);
            let state = Arc::clone(&self.state);
            let token = token.clone();
            self.tracker.spawn(async move {
                let category = batch.category;
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(%category, "dispatch cancelled");
                    }
                    outcome = send_batch(&client, &batch) => match outcome {
                        Ok(()) => debug!(%category, post = %batch.post_uri, "batch delivered"),
                        Err(e) => {
                            warn!(%category, post = %batch.post_uri, error = %e, "dispatch failed");
                            state.record_error(format!("{} dispatch failed: {}", category, e));
                        }
                    }
                }
            });
        }
        spawned
    }
}

pub async fn send_batch(client: &ApiClient, batch: &IngestionBatch) -> Result<(), DispatchError> {
    let response = client
        .post_json(batch.category.ingest_path(), &batch.to_payload())
        .await?;
    if response.success {
        Ok(())
    } else {
        Err(DispatchError::Status {
            status: response.status,
            body: response.error_body,
        })
    }
}
