use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::trace;

use super::model::{Embed, StreamEvent};
use crate::extract::{extract_all, Extraction};

#[derive(Debug, Error)]
pub enum EventError {
    #[error("failed to decode stream message: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A creation event on the post collection, shaped for extraction and dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPost {
    /// `at://<did>/<collection>/<rkey>`
    pub post_uri: String,
    pub author_did: String,
    /// The post text as written.
    pub text: String,
    /// Text plus embed and link-facet URIs, newline separated.
    pub analysis_text: String,
    pub created_at: String,
    pub quoted_post_uri: Option<String>,
}

impl PreparedPost {
    pub fn extract(&self) -> Extraction {
        extract_all(&self.analysis_text)
    }
}

/// Decodes raw frames and keeps only creation commits on one collection.
#[derive(Debug, Clone)]
pub struct EventProcessor {
    collection: String,
    quote_marker: String,
}

impl EventProcessor {
    pub fn new(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let quote_marker = format!("/{}/", collection);
        Self { collection, quote_marker }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn decode(&self, raw: &str) -> Result<StreamEvent, EventError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Returns the prepared post, or `None` for anything that is not a
    /// creation commit on the configured collection.
    pub fn qualify(&self, event: &StreamEvent) -> Option<PreparedPost> {
        if event.kind != "commit" {
            return None;
        }
        let commit = event.commit.as_ref()?;
        if commit.operation != "create" || commit.collection != self.collection {
            return None;
        }

        let record = commit.record.clone().unwrap_or_default();
        let text = record.text.unwrap_or_default();

        let mut analysis_text = text.clone();
        let mut append = |uri: &str| {
            if !analysis_text.is_empty() {
                analysis_text.push('\n');
            }
            analysis_text.push_str(uri);
        };

        let mut quoted_post_uri = None;
        if let Some(embed) = &record.embed {
            for uri in external_uris(embed) {
                append(uri);
            }
            quoted_post_uri = self.quoted_post(embed);
        }
        for feature in record.facets.iter().flat_map(|f| &f.features) {
            if let Some(uri) = feature.link_uri() {
                append(uri);
            }
        }

        let created_at = record
            .created_at
            .unwrap_or_else(|| timestamp_from_micros(event.time_us));

        trace!(did = %event.did, rkey = %commit.rkey, "qualified post");

        Some(PreparedPost {
            post_uri: format!("at://{}/{}/{}", event.did, commit.collection, commit.rkey),
            author_did: event.did.clone(),
            text,
            analysis_text,
            created_at,
            quoted_post_uri,
        })
    }

    fn quoted_post(&self, embed: &Embed) -> Option<String> {
        let uri = embed.record.as_ref()?.target_uri()?;
        uri.contains(&self.quote_marker).then(|| uri.to_string())
    }
}

/// Link-card URIs, both on the embed itself and under quote-with-media.
fn external_uris(embed: &Embed) -> impl Iterator<Item = &str> {
    let own = embed.external.as_ref().and_then(|e| e.uri.as_deref());
    let media = embed
        .media
        .as_ref()
        .and_then(|m| m.external.as_ref())
        .and_then(|e| e.uri.as_deref());
    own.into_iter().chain(media)
}

fn timestamp_from_micros(time_us: i64) -> String {
    DateTime::from_timestamp_micros(time_us)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
