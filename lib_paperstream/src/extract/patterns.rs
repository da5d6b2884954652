use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::scan::{is_truncated, trim_trailing_punctuation};

/// Maps a match to its canonical id. `None` means the match is not a resource.
pub type Normalizer = fn(&Captures<'_>) -> Option<String>;
/// Builds the human-readable slug for a match.
pub type SlugBuilder = fn(&Captures<'_>) -> String;
/// Decides whether a match was cut off by client-side truncation.
/// Receives the full source text and the match captures.
pub type TruncationCheck = fn(&str, &Captures<'_>) -> bool;

/// One row of the pattern table.
pub struct ExtractionPattern {
    pub matcher: Regex,
    pub source_tag: &'static str,
    pub normalize: Normalizer,
    pub slug_builder: Option<SlugBuilder>,
    pub truncation_check: TruncationCheck,
}

impl ExtractionPattern {
    fn new(pattern: impl AsRef<str>, source_tag: &'static str, normalize: Normalizer) -> Self {
        Self {
            matcher: Regex::new(pattern.as_ref()).expect("valid regex"),
            source_tag,
            normalize,
            slug_builder: None,
            truncation_check: is_truncated,
        }
    }

    fn with_slug(mut self, slug_builder: SlugBuilder) -> Self {
        self.slug_builder = Some(slug_builder);
        self
    }
}

// Host prefix shared by every row: optional scheme, optional www, and a word
// boundary so `notarxiv.org` never reads as `arxiv.org`.
fn host(host: &str, path: &str) -> String {
    format!(r"\b(?i:https?://)?(?i:www\.)?(?i:{}){}", host, path)
}

/// DOI test/example prefixes. Never real, always dropped.
pub const RESERVED_ID_PREFIXES: &[&str] = &["doi:10.1234/", "doi:10.5555/"];

/// Substack subdomains that belong to the platform, not a publication.
const RESERVED_SUBSTACK_SUBDOMAINS: &[&str] = &["www", "open", "on", "support"];

fn group<'t>(caps: &Captures<'t>, i: usize) -> Option<&'t str> {
    caps.get(i).map(|m| m.as_str())
}

// --- Papers ---

fn normalize_arxiv(caps: &Captures<'_>) -> Option<String> {
    Some(format!("arxiv:{}", group(caps, 1)?))
}

fn normalize_doi(caps: &Captures<'_>) -> Option<String> {
    let doi = trim_trailing_punctuation(group(caps, 1)?);
    // A bare prefix with nothing after the slash is not a DOI.
    let (_, suffix) = doi.split_once('/')?;
    if suffix.is_empty() {
        return None;
    }
    Some(format!("doi:{}", doi.to_lowercase()))
}

fn normalize_preprint(caps: &Captures<'_>) -> Option<String> {
    Some(format!("doi:{}", group(caps, 1)?.to_lowercase()))
}

fn normalize_pubmed(caps: &Captures<'_>) -> Option<String> {
    Some(format!("pubmed:{}", group(caps, 1)?))
}

fn normalize_nature(caps: &Captures<'_>) -> Option<String> {
    Some(format!("doi:10.1038/{}", group(caps, 1)?.to_lowercase()))
}

fn normalize_semantic_scholar(caps: &Captures<'_>) -> Option<String> {
    Some(format!("semanticscholar:{}", group(caps, 1)?.to_lowercase()))
}

fn normalize_openreview(caps: &Captures<'_>) -> Option<String> {
    Some(format!("openreview:{}", group(caps, 1)?))
}

/// Papers: one row per publisher URL shape.
pub static PAPER_PATTERNS: LazyLock<Vec<ExtractionPattern>> = LazyLock::new(|| {
    vec![
        ExtractionPattern::new(
            host(
                r"arxiv\.org",
                r"/(?:abs|pdf)/(\d{4}\.\d{4,5}(?:v\d+)?|[a-z][a-z-]*(?:\.[A-Z]{2})?/\d{7}(?:v\d+)?)\b"
            ),
            "arxiv",
            normalize_arxiv,
        ),
        ExtractionPattern::new(
            host(r"(?:dx\.)?doi\.org", r#"/(10\.\d{4,9}/[^\s"'<>]+)"#),
            "doi",
            normalize_doi,
        ),
        ExtractionPattern::new(
            host(r"biorxiv\.org", r"/content/(10\.1101/\d{4}\.\d{2}\.\d{2}\.\d+)(?:v\d+)?"),
            "biorxiv",
            normalize_preprint,
        ),
        ExtractionPattern::new(
            host(r"medrxiv\.org", r"/content/(10\.1101/\d{4}\.\d{2}\.\d{2}\.\d+)(?:v\d+)?"),
            "medrxiv",
            normalize_preprint,
        ),
        ExtractionPattern::new(
            host(r"(?:pubmed\.ncbi\.nlm\.nih\.gov|ncbi\.nlm\.nih\.gov/pubmed)", r"/(\d+)"),
            "pubmed",
            normalize_pubmed,
        ),
        ExtractionPattern::new(
            host(r"nature\.com", r"/articles/([A-Za-z0-9-]+)"),
            "nature",
            normalize_nature,
        ),
        ExtractionPattern::new(
            host(r"science\.org", r"/doi/(?:abs/|full/|pdf/)?(10\.1126/[A-Za-z0-9.]+)"),
            "science",
            normalize_doi,
        ),
        ExtractionPattern::new(
            host(r"pnas\.org", r"/doi/(?:abs/|full/|pdf/|epdf/)?(10\.1073/[A-Za-z0-9.]+)"),
            "pnas",
            normalize_doi,
        ),
        ExtractionPattern::new(
            host(r"semanticscholar\.org", r"/paper/(?:[^\s/]+/)?([0-9a-fA-F]{40})"),
            "semanticscholar",
            normalize_semantic_scholar,
        ),
        ExtractionPattern::new(
            host(r"openreview\.net", r"/(?:forum|pdf)\?id=([A-Za-z0-9_-]+)"),
            "openreview",
            normalize_openreview,
        ),
    ]
});

// --- Long-form posts ---

fn substack_id(publication: &str, slug: &str) -> Option<String> {
    let publication = publication.to_lowercase();
    if RESERVED_SUBSTACK_SUBDOMAINS.contains(&publication.as_str()) {
        return None;
    }
    Some(format!("substack:{}/{}", publication, slug.to_lowercase()))
}

fn normalize_substack(caps: &Captures<'_>) -> Option<String> {
    substack_id(group(caps, 1)?, group(caps, 2)?)
}

fn substack_slug(caps: &Captures<'_>) -> String {
    group(caps, 2).unwrap_or_default().to_lowercase()
}

/// Long-form posts: every newsletter URL shape lands in `substack:<publication>/<slug>`.
pub static LONG_FORM_PATTERNS: LazyLock<Vec<ExtractionPattern>> = LazyLock::new(|| {
    vec![
        ExtractionPattern::new(
            r"\b(?i:https?://)?([A-Za-z0-9-]+)(?i:\.substack\.com)/p/([A-Za-z0-9-]+)",
            "substack",
            normalize_substack,
        )
        .with_slug(substack_slug),
        ExtractionPattern::new(
            host(r"substack\.com", r"/@([A-Za-z0-9_-]+)/p/([A-Za-z0-9-]+)"),
            "substack",
            normalize_substack,
        )
        .with_slug(substack_slug),
        ExtractionPattern::new(
            r"\b(?i:https?://)?(?i:open\.substack\.com)/pub/([A-Za-z0-9-]+)/p/([A-Za-z0-9-]+)",
            "substack",
            normalize_substack,
        )
        .with_slug(substack_slug),
    ]
});

// --- Articles ---

fn normalize_quanta(caps: &Captures<'_>) -> Option<String> {
    Some(format!("quanta:{}-{}", group(caps, 1)?.to_lowercase(), group(caps, 2)?))
}

fn normalize_nautilus(caps: &Captures<'_>) -> Option<String> {
    Some(format!("nautilus:{}-{}", group(caps, 1)?.to_lowercase(), group(caps, 2)?))
}

fn magazine_slug(caps: &Captures<'_>) -> String {
    group(caps, 1).unwrap_or_default().to_lowercase()
}

fn dated_id(tag: &str, caps: &Captures<'_>) -> Option<String> {
    Some(format!(
        "{}:{}/{}/{}/{}",
        tag,
        caps.name("year")?.as_str(),
        caps.name("month")?.as_str(),
        caps.name("day")?.as_str(),
        caps.name("slug")?.as_str().to_lowercase()
    ))
}

fn normalize_nytimes(caps: &Captures<'_>) -> Option<String> {
    dated_id("nytimes", caps)
}

fn normalize_washingtonpost(caps: &Captures<'_>) -> Option<String> {
    dated_id("washingtonpost", caps)
}

fn dated_slug(caps: &Captures<'_>) -> String {
    caps.name("slug").map(|m| m.as_str().to_lowercase()).unwrap_or_default()
}

/// Articles: magazine `slug-numericId` shapes and dated `yyyy/mm/dd/slug` shapes,
/// one source tag per publication.
pub static ARTICLE_PATTERNS: LazyLock<Vec<ExtractionPattern>> = LazyLock::new(|| {
    vec![
        ExtractionPattern::new(
            host(r"quantamagazine\.org", r"/([A-Za-z0-9-]+)-(\d{8})\b"),
            "quanta",
            normalize_quanta,
        )
        .with_slug(magazine_slug),
        ExtractionPattern::new(
            host(r"nautil\.us", r"/([A-Za-z0-9-]+)-(\d{5,})\b"),
            "nautilus",
            normalize_nautilus,
        )
        .with_slug(magazine_slug),
        ExtractionPattern::new(
            host(
                r"nytimes\.com",
                r"/(?P<year>\d{4})/(?P<month>\d{2})/(?P<day>\d{2})/(?:[A-Za-z0-9-]+/)*(?P<slug>[A-Za-z0-9-]+)(?:\.html)?"
            ),
            "nytimes",
            normalize_nytimes,
        )
        .with_slug(dated_slug),
        ExtractionPattern::new(
            host(
                r"washingtonpost\.com",
                r"/(?:[A-Za-z0-9-]+/)*?(?P<year>\d{4})/(?P<month>\d{2})/(?P<day>\d{2})/(?P<slug>[A-Za-z0-9-]+)"
            ),
            "washingtonpost",
            normalize_washingtonpost,
        )
        .with_slug(dated_slug),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{extract_category, Category};

    fn first_id(text: &str, category: Category) -> Option<String> {
        extract_category(text, category).into_iter().next().map(|e| e.canonical_id)
    }

    #[test]
    fn every_table_compiles() {
        assert_eq!(PAPER_PATTERNS.len(), 10);
        assert_eq!(LONG_FORM_PATTERNS.len(), 3);
        assert_eq!(ARTICLE_PATTERNS.len(), 4);
    }

    #[test]
    fn arxiv_shapes() {
        assert_eq!(first_id("https://arxiv.org/abs/2401.01234v2", Category::Papers).as_deref(), Some("arxiv:2401.01234v2"));
        assert_eq!(first_id("arxiv.org/pdf/2312.12345", Category::Papers).as_deref(), Some("arxiv:2312.12345"));
        assert_eq!(first_id("https://arxiv.org/abs/hep-th/9901001", Category::Papers).as_deref(), Some("arxiv:hep-th/9901001"));
        assert_eq!(first_id("https://notarxiv.org/abs/2401.01234", Category::Papers), None);
    }

    #[test]
    fn overlong_arxiv_ids_are_not_cut_down() {
        assert_eq!(first_id("https://arxiv.org/abs/2401.012345", Category::Papers), None);
        assert_eq!(first_id("https://arxiv.org/abs/hep-th/99010012", Category::Papers), None);
        assert_eq!(first_id("https://arxiv.org/abs/2401.01234v2x", Category::Papers), None);
        assert_eq!(first_id("https://arxiv.org/pdf/2401.01234.pdf", Category::Papers).as_deref(), Some("arxiv:2401.01234"));
    }

    #[test]
    fn doi_is_lowercased_and_trimmed() {
        let text = "Read this (https://doi.org/10.1016/J.CELL.2024.01.002).";
        assert_eq!(first_id(text, Category::Papers).as_deref(), Some("doi:10.1016/j.cell.2024.01.002"));
    }

    #[test]
    fn doi_keeps_balanced_parentheses() {
        let text = "https://doi.org/10.1016/S0140-6736(20)30183-5";
        assert_eq!(first_id(text, Category::Papers).as_deref(), Some("doi:10.1016/s0140-6736(20)30183-5"));
    }

    #[test]
    fn preprint_servers_drop_the_version() {
        let text = "https://www.biorxiv.org/content/10.1101/2024.01.15.575123v1";
        let found = extract_category(text, Category::Papers);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_id, "doi:10.1101/2024.01.15.575123");
        assert_eq!(found[0].source_tag, "biorxiv");

        let text = "https://www.medrxiv.org/content/10.1101/2023.11.02.23297123v2";
        assert_eq!(first_id(text, Category::Papers).as_deref(), Some("doi:10.1101/2023.11.02.23297123"));
    }

    #[test]
    fn remaining_publishers() {
        assert_eq!(first_id("https://pubmed.ncbi.nlm.nih.gov/38012345/", Category::Papers).as_deref(), Some("pubmed:38012345"));
        assert_eq!(first_id("https://www.ncbi.nlm.nih.gov/pubmed/12345678", Category::Papers).as_deref(), Some("pubmed:12345678"));
        assert_eq!(first_id("https://www.science.org/doi/10.1126/science.adk1234", Category::Papers).as_deref(), Some("doi:10.1126/science.adk1234"));
        assert_eq!(first_id("https://www.pnas.org/doi/full/10.1073/pnas.2312345121", Category::Papers).as_deref(), Some("doi:10.1073/pnas.2312345121"));
        assert_eq!(
            first_id(
                "https://www.semanticscholar.org/paper/Attention-Is-All-You-Need/204e3073870fae3d05bcbc2f6a8e263d9b72e776",
                Category::Papers
            )
            .as_deref(),
            Some("semanticscholar:204e3073870fae3d05bcbc2f6a8e263d9b72e776")
        );
        assert_eq!(first_id("https://openreview.net/forum?id=rJ4km2R5t7", Category::Papers).as_deref(), Some("openreview:rJ4km2R5t7"));
    }

    #[test]
    fn substack_shapes_share_one_namespace() {
        let expected = Some("substack:eugenewei/status-as-a-service");
        assert_eq!(first_id("https://eugenewei.substack.com/p/status-as-a-service", Category::LongFormPosts).as_deref(), expected);
        assert_eq!(first_id("https://substack.com/@eugenewei/p/status-as-a-service", Category::LongFormPosts).as_deref(), expected);
        assert_eq!(first_id("https://open.substack.com/pub/eugenewei/p/status-as-a-service?r=abc", Category::LongFormPosts).as_deref(), expected);
    }

    #[test]
    fn all_substack_shapes_in_one_text_dedupe() {
        let text = "https://eugenewei.substack.com/p/status-as-a-service \
                    https://open.substack.com/pub/eugenewei/p/status-as-a-service";
        assert_eq!(extract_category(text, Category::LongFormPosts).len(), 1);
    }

    #[test]
    fn platform_subdomains_are_not_publications() {
        assert_eq!(first_id("https://www.substack.com/p/pricing", Category::LongFormPosts), None);
    }

    #[test]
    fn magazine_articles() {
        let found = extract_category(
            "https://www.quantamagazine.org/how-the-physics-of-nothing-underlies-everything-20220809/",
            Category::Articles,
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].canonical_id, "quanta:how-the-physics-of-nothing-underlies-everything-20220809");
        assert_eq!(found[0].source_tag, "quanta");
        assert_eq!(found[0].slug.as_deref(), Some("how-the-physics-of-nothing-underlies-everything"));

        assert_eq!(
            first_id("https://nautil.us/the-strange-math-of-crowds-1234567/", Category::Articles).as_deref(),
            Some("nautilus:the-strange-math-of-crowds-1234567")
        );
    }

    #[test]
    fn dated_articles() {
        let found = extract_category(
            "https://www.nytimes.com/2024/03/05/science/space/black-hole-image.html",
            Category::Articles,
        );
        assert_eq!(found[0].canonical_id, "nytimes:2024/03/05/black-hole-image");
        assert_eq!(found[0].slug.as_deref(), Some("black-hole-image"));

        assert_eq!(
            first_id("https://www.washingtonpost.com/science/2024/02/10/octopus-dreams/", Category::Articles).as_deref(),
            Some("washingtonpost:2024/02/10/octopus-dreams")
        );
    }
}
