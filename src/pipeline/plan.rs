// src/pipeline/plan.rs

//! Where and how to fetch one page of a blog.

use std::ops::Range;

use url::Url;

use crate::error::{AppError, Result};
use crate::models::{BlogConfig, PlatformKind, SyncConfig};

/// A single request for one page of posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Items to keep from a feed that returns everything on every call
    pub slice: Option<Range<usize>>,
}

impl FetchPlan {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            slice: None,
        }
    }

    fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }
}

/// Plan the request for `page` (1-based) of a blog.
///
/// Returns `Ok(None)` when the blog's plan does not allow that page.
pub fn plan_fetch(blog: &BlogConfig, page: u32, sync: &SyncConfig) -> Result<Option<FetchPlan>> {
    let page = page.max(1);
    if blog
        .plan
        .as_deref()
        .is_some_and(|plan| sync.is_constrained(plan))
        && page > sync.constrained_page_cap
    {
        log::info!(
            "{}: page {} beyond the {}-page cap of its plan",
            blog.slug,
            page,
            sync.constrained_page_cap
        );
        return Ok(None);
    }

    let size = sync.page_size.max(1);
    let offset = (page as usize - 1) * size;

    let plan = match blog.platform() {
        PlatformKind::WordPress => {
            let mut plan = FetchPlan::new(api_url(blog, "wp-json/wp/v2/posts")?)
                .param("page", page)
                .param("per_page", size)
                .param("_embed", 1);
            if let Some((id, exclude)) = blog.category_filter() {
                let key = if exclude { "categories_exclude" } else { "categories" };
                plan = plan.param(key, id);
            }
            plan
        }
        PlatformKind::WordPressCom => {
            let site = home(blog)?
                .host_str()
                .map(str::to_string)
                .ok_or_else(|| AppError::config(format!("{}: home page has no host", blog.slug)))?;
            FetchPlan::new(format!(
                "https://public-api.wordpress.com/rest/v1.1/sites/{site}/posts/"
            ))
            .param("page", page)
            .param("number", size)
        }
        PlatformKind::Ghost => {
            let key = blog
                .api_key
                .as_deref()
                .ok_or_else(|| AppError::config(format!("{}: Ghost blog has no API key", blog.slug)))?;
            FetchPlan::new(api_url(blog, "ghost/api/content/posts/")?)
                .param("key", key)
                .param("page", page)
                .param("limit", size)
                .param("include", "tags,authors")
        }
        PlatformKind::Substack => FetchPlan::new(api_url(blog, "api/v1/posts")?)
            .param("offset", offset)
            .param("limit", size),
        PlatformKind::Atom if blog.is_blogger() => FetchPlan::new(feed_url(blog)?)
            .param("start-index", offset + 1)
            .param("max-results", size),
        PlatformKind::JsonFeed | PlatformKind::Atom | PlatformKind::Rss => FetchPlan {
            slice: Some(offset..offset + size),
            ..FetchPlan::new(feed_url(blog)?)
        },
    };
    Ok(Some(plan))
}

fn home(blog: &BlogConfig) -> Result<Url> {
    let home = blog
        .home_page_url
        .as_deref()
        .ok_or_else(|| AppError::config(format!("{}: no home page URL", blog.slug)))?;
    Ok(Url::parse(home)?)
}

fn api_url(blog: &BlogConfig, path: &str) -> Result<String> {
    let mut base = home(blog)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(path)?.to_string())
}

fn feed_url(blog: &BlogConfig) -> Result<String> {
    blog.feed_url
        .clone()
        .ok_or_else(|| AppError::config(format!("{}: no feed URL", blog.slug)))
}

/// Apply a plan's slice to the items of a fetched page.
pub fn slice_items<T>(items: Vec<T>, slice: Option<&Range<usize>>) -> Vec<T> {
    match slice {
        Some(range) => items
            .into_iter()
            .skip(range.start)
            .take(range.end.saturating_sub(range.start))
            .collect(),
        None => items,
    }
}
