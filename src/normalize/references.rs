// src/normalize/references.rs

//! Reference list and acknowledgment extraction.
//!
//! Both work on a slice of the post body that starts after a matching
//! heading and ends at the next heading or horizontal rule.

use std::sync::LazyLock;

use futures::stream::{self, StreamExt};
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Reference, Relationship, RelationshipKeywords, RelationshipType};
use crate::services::{Fetch, MetadataResolver};
use crate::utils::doi::{is_doi_url, validate_doi};

static SECTION_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(?:hr|h2|h3|h4)\b").expect("valid section regex"));

static SENTENCE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+|</p>|</li>").expect("valid split regex"));

static LINKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid link selector"));

/// Inline markup allowed around a heading keyword.
const INLINE_TAG: &str = r"</?(?:a|b|code|em|font|i|mark|small|span|strong|sub|sup|u)\b[^>]*>";

/// Build a regex matching a whole `<h1>`..`<h4>` element whose text is one
/// of `names`, optionally followed by a colon.
///
/// The keyword may be wrapped in inline markup such as `<strong>`.
pub fn heading_pattern(names: &[String]) -> Result<Regex> {
    if names.is_empty() {
        return Err(AppError::config("heading keyword list is empty"));
    }
    let alternatives = names
        .iter()
        .map(|n| regex::escape(n.trim()))
        .collect::<Vec<_>>()
        .join("|");
    let pad = format!(r"(?:\s|&nbsp;|{INLINE_TAG})*");
    Regex::new(&format!(
        r"(?i)<h[1-4]\b[^>]*>{pad}(?:{alternatives}){pad}:?{pad}</h[1-4]\s*>"
    ))
    .map_err(|e| AppError::config(format!("invalid heading keywords: {e}")))
}

/// Slice of `html` between a matching heading and the next section break.
pub fn section_after<'a>(html: &'a str, heading: &Regex) -> Option<&'a str> {
    let start = heading.find(html)?.end();
    let rest = &html[start..];
    let end = SECTION_END.find(rest).map_or(rest.len(), |m| m.start());
    Some(&rest[..end])
}

/// Link found in a reference list, before any network lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceTarget {
    Doi(String),
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceCandidate {
    pub key: String,
    pub target: ReferenceTarget,
}

/// Outbound links of the reference section in document order.
///
/// Keys follow link position, so a dropped link leaves a gap.
pub fn reference_candidates(html: &str, heading: &Regex) -> Vec<ReferenceCandidate> {
    let Some(section) = section_after(html, heading) else {
        return Vec::new();
    };

    let fragment = Html::parse_fragment(section);
    fragment
        .select(&LINKS)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| href.starts_with("http://") || href.starts_with("https://"))
        .enumerate()
        .map(|(index, href)| {
            let target = match validate_doi(href).filter(|_| is_doi_url(href)) {
                Some(doi) => ReferenceTarget::Doi(doi),
                None => ReferenceTarget::Url(href.to_string()),
            };
            ReferenceCandidate {
                key: format!("ref{}", index + 1),
                target,
            }
        })
        .collect()
}

/// Look up reference metadata, dropping links that do not resolve.
pub async fn resolve_references(
    candidates: Vec<ReferenceCandidate>,
    resolver: &dyn MetadataResolver,
    fetcher: &dyn Fetch,
    concurrency: usize,
) -> Vec<Reference> {
    stream::iter(candidates)
        .map(|candidate| async move { resolve_one(candidate, resolver, fetcher).await })
        .buffered(concurrency.max(1))
        .filter_map(|r| async move { r })
        .collect()
        .await
}

async fn resolve_one(
    candidate: ReferenceCandidate,
    resolver: &dyn MetadataResolver,
    fetcher: &dyn Fetch,
) -> Option<Reference> {
    match candidate.target {
        ReferenceTarget::Doi(doi) => match resolver.csl(&doi).await {
            Ok(csl) => Some(Reference {
                key: candidate.key,
                doi: Some(crate::utils::doi::doi_as_url(&doi.to_lowercase())),
                url: None,
                title: csl_title(&csl),
                publication_year: csl_year(&csl),
            }),
            Err(e) => {
                log::debug!("Dropping reference {}: {}", doi, e);
                None
            }
        },
        ReferenceTarget::Url(url) => match fetcher.url_exists(&url).await {
            Ok(true) => Some(Reference {
                key: candidate.key,
                doi: None,
                url: Some(url),
                title: None,
                publication_year: None,
            }),
            Ok(false) => None,
            Err(e) => {
                log::debug!("Dropping reference {}: {}", url, e);
                None
            }
        },
    }
}

/// CSL `title`, which registries emit as a string or a one-element array.
pub fn csl_title(csl: &serde_json::Value) -> Option<String> {
    match &csl["title"] {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Array(items) => items.first()?.as_str().map(String::from),
        _ => None,
    }
}

/// Year of the CSL `issued` date.
pub fn csl_year(csl: &serde_json::Value) -> Option<String> {
    csl["issued"]["date-parts"][0][0]
        .as_i64()
        .map(|y| y.to_string())
}

/// Classify acknowledgment sentences that carry a link.
pub fn extract_relationships(
    html: &str,
    heading: &Regex,
    keywords: &RelationshipKeywords,
) -> Vec<Relationship> {
    let Some(section) = section_after(html, heading) else {
        return Vec::new();
    };

    let mut relationships = Vec::new();
    for sentence in SENTENCE_SPLIT.split(section) {
        let fragment = Html::parse_fragment(sentence);
        let text = fragment.root_element().text().collect::<String>().to_lowercase();
        let Some(kind) = classify_sentence(&text, keywords) else {
            continue;
        };

        for href in fragment.select(&LINKS).filter_map(|a| a.value().attr("href")) {
            let href = href.trim();
            if href.starts_with("http") && !relationships.iter().any(|r: &Relationship| r.url == href) {
                relationships.push(Relationship {
                    kind,
                    url: href.to_string(),
                });
            }
        }
    }
    relationships
}

fn classify_sentence(text: &str, keywords: &RelationshipKeywords) -> Option<RelationshipType> {
    let matches = |set: &[String]| set.iter().any(|k| text.contains(&k.to_lowercase()));

    if matches(&keywords.is_identical_to) {
        Some(RelationshipType::IsIdenticalTo)
    } else if matches(&keywords.is_preprint_of) {
        Some(RelationshipType::IsPreprintOf)
    } else if matches(&keywords.has_award) {
        Some(RelationshipType::HasAward)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{StubFetcher, StubResolver};

    fn references_heading() -> Regex {
        heading_pattern(&["References".into(), "Referenzen".into()]).unwrap()
    }

    const BODY: &str = r#"<p>Intro text.</p>
<h2>References</h2>
<p>Smith J. <a href="https://doi.org/10.5555/AAA">https://doi.org/10.5555/AAA</a></p>
<p>Blog <a href="https://example.org/page">link</a></p>
<p>Jones K. <a href="https://doi.org/10.5555/bbb">doi</a></p>
<h2>Comments</h2>
<p><a href="https://doi.org/10.5555/ccc">not a reference</a></p>"#;

    #[test]
    fn section_stops_at_next_heading() {
        let section = section_after(BODY, &references_heading()).unwrap();
        assert!(section.contains("10.5555/bbb"));
        assert!(!section.contains("10.5555/ccc"));
    }

    #[test]
    fn candidates_keyed_by_position() {
        let candidates = reference_candidates(BODY, &references_heading());
        assert_eq!(candidates.len(), 3);
        assert_eq!(candidates[0].key, "ref1");
        assert_eq!(
            candidates[0].target,
            ReferenceTarget::Doi("10.5555/AAA".into())
        );
        assert_eq!(
            candidates[1].target,
            ReferenceTarget::Url("https://example.org/page".into())
        );
        assert_eq!(candidates[2].key, "ref3");
    }

    #[test]
    fn localized_heading_matches() {
        let html = "<h3>Referenzen:</h3><a href=\"https://doi.org/10.5555/x\">x</a>";
        assert_eq!(reference_candidates(html, &references_heading()).len(), 1);
    }

    #[test]
    fn wrapped_heading_matches() {
        let html = r#"<p>Body.</p><h2 id="refs"><strong>References</strong></h2>
<p><a href="https://doi.org/10.5555/one">one</a></p>"#;
        let candidates = reference_candidates(html, &references_heading());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].target, ReferenceTarget::Doi("10.5555/one".into()));
    }

    #[test]
    fn heading_must_be_the_whole_element() {
        let html = r#"<h2>Further References</h2><a href="https://doi.org/10.5555/x">x</a>
<p>See the References</h2> below <a href="https://doi.org/10.5555/y">y</a></p>"#;
        assert!(reference_candidates(html, &references_heading()).is_empty());
    }

    #[test]
    fn no_heading_no_references() {
        assert!(reference_candidates("<p>nothing</p>", &references_heading()).is_empty());
    }

    #[tokio::test]
    async fn unresolvable_references_are_dropped() {
        let resolver = StubResolver::with_title("10.5555/aaa", "First paper", 2021);
        let fetcher = StubFetcher::default();
        let candidates = reference_candidates(BODY, &references_heading());

        let refs = resolve_references(candidates, &resolver, &fetcher, 4).await;

        // bbb has no metadata and the plain URL answers 404.
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].key, "ref1");
        assert_eq!(refs[0].doi.as_deref(), Some("https://doi.org/10.5555/aaa"));
        assert_eq!(refs[0].title.as_deref(), Some("First paper"));
        assert_eq!(refs[0].publication_year.as_deref(), Some("2021"));
    }

    #[tokio::test]
    async fn live_links_kept_without_metadata() {
        let resolver = StubResolver::default();
        let fetcher = StubFetcher::default().with_existing("https://example.org/page");
        let candidates = reference_candidates(BODY, &references_heading());

        let refs = resolve_references(candidates, &resolver, &fetcher, 2).await;

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].key, "ref2");
        assert_eq!(refs[0].url.as_deref(), Some("https://example.org/page"));
        assert!(refs[0].doi.is_none());
    }

    #[test]
    fn relationships_classified_by_keyword() {
        let heading = heading_pattern(&["Acknowledgments".into()]).unwrap();
        let html = r#"<h2>Acknowledgments</h2>
<p>This post was originally published on <a href="https://other.example/post">Other Blog</a>. This work was funded by <a href="https://grant.example/42">grant 42</a>. Thanks to <a href="https://friend.example">a friend</a>.</p>"#;

        let rels = extract_relationships(html, &heading, &RelationshipKeywords::default());

        assert_eq!(
            rels,
            vec![
                Relationship {
                    kind: RelationshipType::IsIdenticalTo,
                    url: "https://other.example/post".into(),
                },
                Relationship {
                    kind: RelationshipType::HasAward,
                    url: "https://grant.example/42".into(),
                },
            ]
        );
    }

    #[test]
    fn wrapped_acknowledgment_heading_matches() {
        let heading = heading_pattern(&["Acknowledgments".into()]).unwrap();
        let html = r#"<h3><span class="x">Acknowledgments</span>:</h3>
<p>This work was funded by <a href="https://grant.example/7">grant 7</a>.</p>"#;

        let rels = extract_relationships(html, &heading, &RelationshipKeywords::default());

        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].kind, RelationshipType::HasAward);
        assert_eq!(rels[0].url, "https://grant.example/7");
    }

    #[test]
    fn csl_helpers_read_registry_shapes() {
        let csl = serde_json::json!({
            "title": ["Array title"],
            "issued": {"date-parts": [[2019, 5]]}
        });
        assert_eq!(csl_title(&csl).as_deref(), Some("Array title"));
        assert_eq!(csl_year(&csl).as_deref(), Some("2019"));
    }
}
