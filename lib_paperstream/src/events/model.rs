//! Serde model of a Jetstream message.
//!
//! Every field the pipeline does not need is left out, and every field it does
//! need is optional below the envelope: absent data is a normal outcome, not a
//! decode error.

use serde::{Deserialize, Deserializer};

/// One message from the stream.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamEvent {
    pub did: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_us: i64,
    pub kind: String,
    #[serde(default)]
    pub commit: Option<Commit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub rev: Option<String>,
    pub operation: String,
    pub collection: String,
    pub rkey: String,
    #[serde(default)]
    pub record: Option<PostRecord>,
    #[serde(default)]
    pub cid: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub embed: Option<Embed>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub facets: Vec<Facet>,
}

/// Post embed. The same shape covers link cards, quotes, and quote-with-media,
/// where the quoted record sits one level deeper and the card under `media`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embed {
    #[serde(rename = "$type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub external: Option<External>,
    #[serde(default)]
    pub record: Option<EmbedRecord>,
    #[serde(default)]
    pub media: Option<Box<Embed>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct External {
    #[serde(default)]
    pub uri: Option<String>,
}

/// Either a strong ref `{uri}` or a nested wrapper `{record: {uri}}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbedRecord {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub record: Option<Box<EmbedRecord>>,
}

impl EmbedRecord {
    /// The innermost record URI.
    pub fn target_uri(&self) -> Option<&str> {
        match &self.record {
            Some(inner) => inner.target_uri(),
            None => self.uri.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Facet {
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<FacetFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FacetFeature {
    #[serde(rename = "$type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

impl FacetFeature {
    pub const LINK_TYPE: &'static str = "app.bsky.richtext.facet#link";

    pub fn link_uri(&self) -> Option<&str> {
        match self.kind.as_deref() {
            Some(Self::LINK_TYPE) => self.uri.as_deref(),
            _ => None,
        }
    }
}

/// `default` alone only covers a missing key; an explicit `null` gets the same
/// treatment here.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
