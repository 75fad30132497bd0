//! Platform extractors.
//!
//! One typed raw shape per source format, each mapped into a
//! [`CanonicalPost`] through the shared normalizers in [`build_post`].

pub mod atom;
pub mod ghost;
pub mod json_feed;
pub mod rss;
pub mod substack;
pub mod wordpress;
pub mod wordpress_com;
mod xml;

use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::models::{BlogConfig, CanonicalPost, FeedMeta, PlatformKind, guid_from_url};
use crate::normalize::{Normalizer, ReferenceCandidate};
use crate::utils::doi::{is_doi_url, normalize_doi, validate_doi};
use crate::utils::secure_url;
use crate::utils::time::parse_timestamp;

/// A platform-native record.
#[derive(Debug, Clone)]
pub enum RawPost {
    WordPress(wordpress::WpPost),
    WordPressCom(wordpress_com::WpComPost),
    Ghost(ghost::GhostPost),
    Substack(substack::SubstackPost),
    JsonFeed(json_feed::JsonFeedItem),
    Atom(atom::AtomEntry),
    Rss(rss::RssItem),
}

impl RawPost {
    /// Platform-native modification time in unix seconds.
    ///
    /// WordPress reports `modified_gmt`, RSS only `pubDate`, the rest an
    /// `updated_at`-style field.
    pub fn modified_at(&self) -> Option<i64> {
        match self {
            Self::WordPress(p) => p.modified_gmt.as_deref().and_then(parse_timestamp),
            Self::WordPressCom(p) => p.modified.as_deref().and_then(parse_timestamp),
            Self::Ghost(p) => p.updated_at.as_deref().and_then(parse_timestamp),
            Self::Substack(p) => p
                .updated_at
                .as_deref()
                .or(p.post_date.as_deref())
                .and_then(parse_timestamp),
            Self::JsonFeed(p) => p
                .date_modified
                .as_deref()
                .or(p.date_published.as_deref())
                .and_then(parse_timestamp),
            Self::Atom(p) => p
                .updated
                .as_deref()
                .or(p.published.as_deref())
                .and_then(parse_timestamp),
            Self::Rss(p) => p.pub_date.as_deref().and_then(parse_timestamp),
        }
    }

    /// Map into a canonical post draft.
    pub fn extract(&self, blog: &BlogConfig, normalizer: &Normalizer) -> Result<PostDraft> {
        let parts = match self {
            Self::WordPress(p) => p.parts(),
            Self::WordPressCom(p) => p.parts(),
            Self::Ghost(p) => p.parts(),
            Self::Substack(p) => p.parts(),
            Self::JsonFeed(p) => p.parts(),
            Self::Atom(p) => p.parts(),
            Self::Rss(p) => p.parts(),
        };
        build_post(parts, blog, normalizer)
    }
}

/// One fetched page of a source.
#[derive(Debug, Default)]
pub struct FeedPage {
    pub items: Vec<RawPost>,
    /// Feed-level attributes; empty for API sources
    pub meta: FeedMeta,
    /// Records that could not be read, one message each
    pub skipped: Vec<String>,
}

impl FeedPage {
    /// Map JSON records one at a time; a malformed record is skipped and noted.
    pub fn from_records<T, F>(records: Vec<serde_json::Value>, wrap: F) -> Self
    where
        T: DeserializeOwned,
        F: Fn(T) -> RawPost,
    {
        let mut page = Self::default();
        for (index, record) in records.into_iter().enumerate() {
            let id = match record.get("id").or_else(|| record.get("ID")) {
                Some(serde_json::Value::String(id)) => id.clone(),
                Some(id) => id.to_string(),
                None => format!("#{index}"),
            };
            match serde_json::from_value::<T>(record) {
                Ok(item) => page.items.push(wrap(item)),
                Err(e) => page.skipped.push(format!("record {id}: {e}")),
            }
        }
        page
    }
}

/// Parse a fetched document according to the blog's platform.
pub fn parse_page(kind: PlatformKind, body: &str) -> Result<FeedPage> {
    match kind {
        PlatformKind::WordPress => wordpress::parse(body),
        PlatformKind::WordPressCom => wordpress_com::parse(body),
        PlatformKind::Ghost => ghost::parse(body),
        PlatformKind::Substack => substack::parse(body),
        PlatformKind::JsonFeed => json_feed::parse(body),
        PlatformKind::Atom => atom::parse(body),
        PlatformKind::Rss => rss::parse(body),
    }
}

/// Keep items changed after `since`, unless `force` is set.
///
/// Items without a readable timestamp are kept.
pub fn filter_updated_posts(items: Vec<RawPost>, since: i64, force: bool) -> Vec<RawPost> {
    if force {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item.modified_at().is_none_or(|ts| ts > since))
        .collect()
}

/// Platform fields after format-specific path lookups.
#[derive(Debug, Default, Clone)]
pub struct PostParts {
    pub guid: Option<String>,
    pub url: String,
    pub title: String,
    pub content_html: String,
    /// Platform excerpt; abstract candidate
    pub excerpt: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    /// `(name, url)` pairs
    pub authors: Vec<(String, Option<String>)>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    /// Embedded media supplied by the platform API
    pub media_image: Option<String>,
    /// Feed-supplied thumbnail
    pub thumbnail: Option<String>,
    pub language: Option<String>,
}

/// Canonical post plus the reference links still to be resolved.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub post: CanonicalPost,
    pub references: Vec<ReferenceCandidate>,
}

/// Shared mapping from platform fields to a canonical post.
pub fn build_post(parts: PostParts, blog: &BlogConfig, normalizer: &Normalizer) -> Result<PostDraft> {
    let mut url = parts.url.trim().to_string();
    if url.is_empty() {
        return Err(AppError::extract(&blog.slug, "record has no URL"));
    }
    if blog.secure {
        url = secure_url(&url);
    }

    let guid = parts
        .guid
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| guid_from_url(&url));

    let doi = [guid.as_str(), url.as_str()]
        .into_iter()
        .find(|candidate| is_doi_url(candidate) || candidate.starts_with("10."))
        .and_then(validate_doi)
        .and_then(|doi| normalize_doi(&doi));

    let published_at = parts
        .published
        .as_deref()
        .and_then(parse_timestamp)
        .ok_or_else(|| AppError::extract(&blog.slug, format!("no publication date for {url}")))?;
    let updated_at = parts
        .updated
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(published_at)
        .max(published_at);

    let content_html = parts.content_html;
    let base = blog.relative_base(&url).to_string();

    let summary_source = if content_html.trim().is_empty() {
        parts.excerpt.as_deref().unwrap_or_default()
    } else {
        content_html.as_str()
    };
    let summary = normalizer.summary(summary_source);
    let abstract_ = normalizer.abstract_(parts.excerpt.as_deref(), &summary);

    let images = normalizer.images(&content_html, &base);
    let image = normalizer.feature_image(
        parts.media_image.as_deref(),
        parts.thumbnail.as_deref(),
        &images,
    );

    let mut authors: Vec<_> = parts
        .authors
        .iter()
        .filter_map(|(name, url)| normalizer.author(name, url.as_deref()))
        .collect();
    if authors.is_empty() {
        authors = blog.authors.clone();
    }

    let tags = normalizer.tags(
        parts.categories.iter().map(String::as_str),
        parts.tags.iter().map(String::as_str),
    );

    let post = CanonicalPost {
        guid,
        doi,
        archive_url: blog.archive_prefix.as_ref().map(|prefix| format!("{prefix}{url}")),
        title: normalizer.title(&parts.title),
        summary,
        abstract_,
        tags,
        authors,
        images,
        image,
        published_at,
        updated_at,
        language: normalizer.language(parts.language.as_deref(), &content_html),
        reference: Vec::new(),
        relationships: normalizer.relationships(&content_html),
        blog_slug: blog.slug.clone(),
        blog_name: blog.name().to_string(),
        category: blog.category.clone(),
        url,
        content_html: content_html.clone(),
    };

    Ok(PostDraft {
        references: normalizer.reference_candidates(&content_html),
        post,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{Author, NormalizeConfig};

    pub(crate) fn normalizer() -> Normalizer {
        Normalizer::new(Arc::new(NormalizeConfig::default())).unwrap()
    }

    pub(crate) fn blog() -> BlogConfig {
        BlogConfig {
            slug: "front-matter".into(),
            title: Some("Front Matter".into()),
            home_page_url: Some("https://blog.example".into()),
            category: Some("computerAndInformationSciences".into()),
            ..BlogConfig::default()
        }
    }

    fn parts() -> PostParts {
        PostParts {
            url: "http://blog.example/2024/01/post".into(),
            title: "A <b>bold</b> claim".into(),
            content_html: "<p>We report a finding that matters for science today.</p>".into(),
            published: Some("2024-01-02T00:00:00Z".into()),
            ..PostParts::default()
        }
    }

    #[test]
    fn guid_falls_back_to_url_hash() {
        let draft = build_post(parts(), &blog(), &normalizer()).unwrap();
        assert_eq!(draft.post.guid, guid_from_url("http://blog.example/2024/01/post"));
        assert_eq!(draft.post.updated_at, draft.post.published_at);
        assert_eq!(draft.post.blog_name, "Front Matter");
        assert_eq!(draft.post.title, "A <b>bold</b> claim");
    }

    #[test]
    fn secure_and_archive_urls() {
        let mut b = blog();
        b.secure = true;
        b.archive_prefix = Some("https://wayback.example/".into());
        let draft = build_post(parts(), &b, &normalizer()).unwrap();
        assert_eq!(draft.post.url, "https://blog.example/2024/01/post");
        assert_eq!(
            draft.post.archive_url.as_deref(),
            Some("https://wayback.example/https://blog.example/2024/01/post")
        );
    }

    #[test]
    fn doi_guid_sets_post_doi() {
        let mut p = parts();
        p.guid = Some("https://doi.org/10.59350/ABC-123".into());
        let draft = build_post(p, &blog(), &normalizer()).unwrap();
        assert_eq!(draft.post.doi.as_deref(), Some("https://doi.org/10.59350/abc-123"));
    }

    #[test]
    fn blog_authors_are_the_fallback() {
        let mut b = blog();
        b.authors = vec![Author::named("Gastautor(en)")];
        let draft = build_post(parts(), &b, &normalizer()).unwrap();
        assert_eq!(draft.post.authors, vec![Author::named("Gastautor(en)")]);
    }

    #[test]
    fn missing_date_is_an_extract_error() {
        let mut p = parts();
        p.published = None;
        let err = build_post(p, &blog(), &normalizer()).unwrap_err();
        assert!(matches!(err, AppError::Extract { .. }));
    }
}
