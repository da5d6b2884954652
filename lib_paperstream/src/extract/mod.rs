//! # Link Extraction
//!
//! Recognizes references to papers, long-form newsletter posts and journalism
//! articles in free-form post text.
//!
//! Every publisher shape is one row in a declarative table (`patterns`), and a
//! single generic routine (`scan`) runs a family of rows over the text:
//! match, reject truncated links, normalize to a namespaced canonical id, drop
//! reserved test ids, and deduplicate. Adding a publisher is a table entry.
//!
//! Extraction is a pure function of the text. The regexes are compiled once
//! into statics and never mutated, so `extract_all` can be called from any
//! number of tasks at once.

use std::collections::HashSet;

use serde::Serialize;

/// The declarative pattern table, one family per category.
pub mod patterns;
/// The generic scan routine and its truncation/punctuation helpers.
pub mod scan;

pub use patterns::ExtractionPattern;

/// Output category. Each has its own downstream endpoint and payload key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Papers,
    LongFormPosts,
    Articles,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Papers, Category::LongFormPosts, Category::Articles];

    /// Key the entity list is sent under in the outbound JSON body.
    pub fn payload_key(self) -> &'static str {
        match self {
            Category::Papers => "papers",
            Category::LongFormPosts => "longFormPosts",
            Category::Articles => "articles",
        }
    }

    /// Path joined onto the ingestion base URL.
    pub fn ingest_path(self) -> &'static str {
        match self {
            Category::Papers => "api/papers/ingest",
            Category::LongFormPosts => "api/longform/ingest",
            Category::Articles => "api/articles/ingest",
        }
    }

    /// Whether a quoted post alone is enough to send a batch for this category.
    pub fn forwards_quotes(self) -> bool {
        matches!(self, Category::Papers | Category::LongFormPosts)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Category::Papers => 0,
            Category::LongFormPosts => 1,
            Category::Articles => 2,
        }
    }

    fn patterns(self) -> &'static [ExtractionPattern] {
        match self {
            Category::Papers => &patterns::PAPER_PATTERNS,
            Category::LongFormPosts => &patterns::LONG_FORM_PATTERNS,
            Category::Articles => &patterns::ARTICLE_PATTERNS,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.payload_key())
    }
}

/// One recognized resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedEntity {
    /// Fully-qualified URL, `https://` prepended when the text had a bare domain.
    pub url: String,
    /// Namespaced dedup key, e.g. `arxiv:2401.01234`.
    pub canonical_id: String,
    pub source_tag: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// Per-category extraction result for one text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub papers: Vec<ExtractedEntity>,
    pub long_form_posts: Vec<ExtractedEntity>,
    pub articles: Vec<ExtractedEntity>,
}

impl Extraction {
    pub fn get(&self, category: Category) -> &[ExtractedEntity] {
        match category {
            Category::Papers => &self.papers,
            Category::LongFormPosts => &self.long_form_posts,
            Category::Articles => &self.articles,
        }
    }

    fn slot(&mut self, category: Category) -> &mut Vec<ExtractedEntity> {
        match category {
            Category::Papers => &mut self.papers,
            Category::LongFormPosts => &mut self.long_form_posts,
            Category::Articles => &mut self.articles,
        }
    }

    /// True when no category found anything.
    pub fn is_empty(&self) -> bool {
        Category::ALL.iter().all(|c| self.get(*c).is_empty())
    }

    pub fn total(&self) -> usize {
        Category::ALL.iter().map(|c| self.get(*c).len()).sum()
    }
}

/// Runs every family over `text` and returns the distinct entities per category,
/// in order of first appearance.
pub fn extract_all(text: &str) -> Extraction {
    let mut extraction = Extraction::default();
    if text.is_empty() {
        return extraction;
    }

    // Namespaces never collide across families, so one seen-set is enough.
    let mut seen = HashSet::new();
    for category in Category::ALL {
        *extraction.slot(category) = scan::scan_family(text, category.patterns(), &mut seen);
    }
    extraction
}

/// Extracts a single category.
pub fn extract_category(text: &str, category: Category) -> Vec<ExtractedEntity> {
    scan::scan_family(text, category.patterns(), &mut HashSet::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(entities: &[ExtractedEntity]) -> Vec<&str> {
        entities.iter().map(|e| e.canonical_id.as_str()).collect()
    }

    #[test]
    fn repeated_arxiv_link_yields_one_paper() {
        let text = "see https://arxiv.org/abs/2401.01234 and https://arxiv.org/abs/2401.01234 again";
        let found = extract_all(text);
        assert_eq!(ids(&found.papers), vec!["arxiv:2401.01234"]);
        assert!(found.long_form_posts.is_empty());
        assert!(found.articles.is_empty());
    }

    #[test]
    fn substack_post_is_a_long_form_entity() {
        let found = extract_all("new post: https://eugenewei.substack.com/p/status-as-a-service");
        assert_eq!(ids(&found.long_form_posts), vec!["substack:eugenewei/status-as-a-service"]);
        assert_eq!(found.long_form_posts[0].source_tag, "substack");
        assert_eq!(found.long_form_posts[0].slug.as_deref(), Some("status-as-a-service"));
        assert!(found.papers.is_empty());
    }

    #[test]
    fn truncated_test_doi_yields_nothing() {
        let found = extract_all("see https://doi.org/10.1234/test...");
        assert!(found.is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let text = "https://arxiv.org/abs/2312.00001v2 nature.com/articles/s41586-024-07123-4 \
                    https://www.quantamagazine.org/why-the-universe-is-flat-20240115/ \
                    https://open.substack.com/pub/astralcodexten/p/my-bet";
        assert_eq!(extract_all(text), extract_all(text));
    }

    #[test]
    fn families_are_filled_independently() {
        let text = "paper https://arxiv.org/abs/2401.01234v3, essay https://noahpinion.substack.com/p/the-case \
                    and story https://www.nytimes.com/2024/03/05/science/black-hole-image.html";
        let found = extract_all(text);
        assert_eq!(ids(&found.papers), vec!["arxiv:2401.01234v3"]);
        assert_eq!(ids(&found.long_form_posts), vec!["substack:noahpinion/the-case"]);
        assert_eq!(ids(&found.articles), vec!["nytimes:2024/03/05/black-hole-image"]);
        assert_eq!(found.total(), 3);
    }

    #[test]
    fn publisher_page_and_doi_link_collapse_to_one_paper() {
        let text = "https://www.nature.com/articles/s41586-024-07123-4 (doi: https://doi.org/10.1038/s41586-024-07123-4)";
        let found = extract_all(text);
        assert_eq!(ids(&found.papers), vec!["doi:10.1038/s41586-024-07123-4"]);
        assert_eq!(found.papers[0].source_tag, "nature");
    }

    #[test]
    fn empty_text_is_empty() {
        assert!(extract_all("").is_empty());
        assert!(extract_all("just vibes, no links").is_empty());
    }

    #[test]
    fn extract_category_only_runs_one_family() {
        let text = "https://arxiv.org/abs/2401.01234 https://eugenewei.substack.com/p/status-as-a-service";
        let papers = extract_category(text, Category::Papers);
        assert_eq!(ids(&papers), vec!["arxiv:2401.01234"]);
    }

    #[test]
    fn category_wire_names() {
        assert_eq!(Category::LongFormPosts.payload_key(), "longFormPosts");
        assert_eq!(serde_json::to_string(&Category::LongFormPosts).unwrap(), "\"longFormPosts\"");
        assert!(Category::Papers.forwards_quotes());
        assert!(!Category::Articles.forwards_quotes());
    }

    #[test]
    fn entity_serializes_camel_case_without_empty_slug() {
        let entity = ExtractedEntity {
            url: "https://arxiv.org/abs/2401.01234".to_string(),
            canonical_id: "arxiv:2401.01234".to_string(),
            source_tag: "arxiv",
            slug: None,
        };
        let json = serde_json::to_value(&entity).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "url": "https://arxiv.org/abs/2401.01234",
                "canonicalId": "arxiv:2401.01234",
                "sourceTag": "arxiv"
            })
        );
    }
}
