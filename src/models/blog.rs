// src/models/blog.rs

//! Blog configuration snapshot read at the start of every sync.

use serde::{Deserialize, Serialize};

use super::post::Author;

/// Lifecycle state of a blog in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    #[default]
    Active,
    Pending,
    Paused,
    Archived,
}

impl BlogStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Paused => "paused",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "paused" => Self::Paused,
            "archived" => Self::Archived,
            _ => Self::Pending,
        }
    }
}

/// Source format a blog is read through.
///
/// Blogger is served as Atom with offset pagination and needs no variant of
/// its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    WordPress,
    WordPressCom,
    Ghost,
    Substack,
    JsonFeed,
    Atom,
    Rss,
}

/// Immutable per-sync view of a blog row.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlogConfig {
    pub slug: String,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub feed_url: Option<String>,

    #[serde(default)]
    pub home_page_url: Option<String>,

    /// Generator reported by the feed, e.g. `WordPress 6.4`
    #[serde(default)]
    pub generator: Option<String>,

    /// Wire format: `json`, `atom` or `rss`
    #[serde(default)]
    pub feed_format: Option<String>,

    #[serde(default)]
    pub plan: Option<String>,

    /// Read the platform's native API instead of the feed
    #[serde(default)]
    pub use_api: bool,

    /// Content filter, e.g. `category:12` or `category:-12`
    #[serde(default)]
    pub filter: Option<String>,

    /// Unix seconds of the newest stored post; the incremental cutover
    #[serde(default)]
    pub updated_at: i64,

    /// Fallback authors when a record names none
    #[serde(default)]
    pub authors: Vec<Author>,

    #[serde(default)]
    pub language: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    /// Resolve relative URLs against the home page instead of the post URL
    #[serde(default)]
    pub relative_url: Option<String>,

    /// Rewrite `http://` links to `https://`
    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub status: BlogStatus,

    #[serde(default)]
    pub favicon: Option<String>,

    /// Ghost content API key
    #[serde(default)]
    pub api_key: Option<String>,

    /// Web archive prefix prepended to post URLs
    #[serde(default)]
    pub archive_prefix: Option<String>,
}

impl BlogConfig {
    /// Display name, falling back to the slug.
    pub fn name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.slug)
    }

    /// Decide which extractor reads this blog.
    pub fn platform(&self) -> PlatformKind {
        let generator = self
            .generator
            .as_deref()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if self.use_api {
            if generator.starts_with("wordpress.com") {
                return PlatformKind::WordPressCom;
            }
            if generator.starts_with("wordpress") {
                return PlatformKind::WordPress;
            }
            if generator.starts_with("ghost") {
                return PlatformKind::Ghost;
            }
            if generator.starts_with("substack") {
                return PlatformKind::Substack;
            }
        }

        match self.feed_format.as_deref() {
            Some("json") | Some("application/feed+json") => PlatformKind::JsonFeed,
            Some("atom") | Some("application/atom+xml") => PlatformKind::Atom,
            _ => PlatformKind::Rss,
        }
    }

    /// Whether the feed is Blogger, which pages by `start-index`.
    pub fn is_blogger(&self) -> bool {
        self.generator
            .as_deref()
            .is_some_and(|g| g.to_ascii_lowercase().starts_with("blogger"))
    }

    pub fn is_active(&self) -> bool {
        self.status == BlogStatus::Active
    }

    /// Parsed WordPress category filter: `(category id, exclude)`.
    pub fn category_filter(&self) -> Option<(u64, bool)> {
        let rule = self.filter.as_deref()?.strip_prefix("category:")?;
        let (exclude, id) = match rule.strip_prefix('-') {
            Some(id) => (true, id),
            None => (false, rule),
        };
        id.trim().parse().ok().map(|id| (id, exclude))
    }

    /// Base for resolving relative links in post content.
    pub fn relative_base<'a>(&'a self, post_url: &'a str) -> &'a str {
        match (self.relative_url.as_deref(), self.home_page_url.as_deref()) {
            (Some("blog"), Some(home)) => home,
            _ => post_url,
        }
    }
}

/// Feed-level attributes refreshed after a full pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedMeta {
    pub title: Option<String>,
    pub description: Option<String>,
    pub favicon: Option<String>,
    pub language: Option<String>,
    pub generator: Option<String>,
    pub home_page_url: Option<String>,
}

impl FeedMeta {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
