use std::collections::HashSet;

use regex::Captures;

use super::patterns::{ExtractionPattern, RESERVED_ID_PREFIXES};
use super::ExtractedEntity;

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

/// Runs one family of patterns over `text`.
///
/// Candidates from every row are ordered by where they start in the text, so
/// the output follows first appearance regardless of table order. A candidate
/// is kept only if it is not truncated, normalizes to an id, is not a reserved
/// test id, and its id has not been seen yet in `seen`.
pub fn scan_family(
    text: &str,
    patterns: &[ExtractionPattern],
    seen: &mut HashSet<String>,
) -> Vec<ExtractedEntity> {
    let mut candidates: Vec<(usize, ExtractedEntity)> = Vec::new();

    for pattern in patterns {
        for caps in pattern.matcher.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };

            if (pattern.truncation_check)(text, &caps) {
                continue;
            }
            let Some(canonical_id) = (pattern.normalize)(&caps) else {
                continue;
            };
            if is_reserved(&canonical_id) {
                continue;
            }

            candidates.push((
                whole.start(),
                ExtractedEntity {
                    url: with_scheme(trim_trailing_punctuation(whole.as_str())),
                    canonical_id,
                    source_tag: pattern.source_tag,
                    slug: pattern.slug_builder.map(|build| build(&caps)),
                },
            ));
        }
    }

    // Stable: rows earlier in the table win ties at the same offset.
    candidates.sort_by_key(|(start, _)| *start);

    candidates
        .into_iter()
        .filter_map(|(_, entity)| seen.insert(entity.canonical_id.clone()).then_some(entity))
        .collect()
}

/// Default truncation check.
///
/// Clients shorten long links with an ellipsis, so a match is dropped when the
/// match (or its first capture) ends in `..`/`…`, optionally followed by a
/// closing bracket, or when the text right after the match starts with one.
/// Rows whose ids cannot hold a dot stop right before a `..`, so the
/// following-text check covers them.
pub fn is_truncated(text: &str, caps: &Captures<'_>) -> bool {
    let Some(whole) = caps.get(0) else {
        return false;
    };
    let capture_truncated = caps.get(1).is_some_and(|m| ends_with_ellipsis(m.as_str()));
    ends_with_ellipsis(whole.as_str()) || capture_truncated || followed_by_ellipsis(&text[whole.end()..])
}

fn ends_with_ellipsis(s: &str) -> bool {
    let s = s.strip_suffix([')', ']']).unwrap_or(s);
    s.ends_with("..") || s.ends_with('…')
}

fn followed_by_ellipsis(rest: &str) -> bool {
    rest.starts_with("..") || rest.starts_with('…')
}

/// Strips sentence punctuation and unbalanced closing brackets off the end of a
/// matched URL or identifier. Balanced brackets are part of the id.
pub fn trim_trailing_punctuation(s: &str) -> &str {
    let mut end = s;
    loop {
        let Some(last) = end.chars().last() else {
            return end;
        };
        let cut = if TRAILING_PUNCTUATION.contains(&last) {
            true
        } else if last == ')' {
            end.matches('(').count() < end.matches(')').count()
        } else if last == ']' {
            end.matches('[').count() < end.matches(']').count()
        } else {
            false
        };
        if !cut {
            return end;
        }
        end = &end[..end.len() - last.len_utf8()];
    }
}

/// Prepends `https://` when the text carried a bare domain.
pub fn with_scheme(url: &str) -> String {
    let lower = url.get(..8).map(str::to_ascii_lowercase).unwrap_or_default();
    if lower.starts_with("https://") || lower.starts_with("http://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Test/example DOI prefixes never reach downstream.
pub fn is_reserved(canonical_id: &str) -> bool {
    RESERVED_ID_PREFIXES.iter().any(|prefix| canonical_id.starts_with(prefix))
}
