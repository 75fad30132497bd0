// src/storage/memory.rs

//! In-process post repository.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::PostStore;
use crate::error::Result;
use crate::models::{BlogConfig, BlogStatus, CanonicalPost, Citation, FeedMeta, StoredPost};
use crate::utils::doi::normalize_doi;

/// A stored post with its index bookkeeping.
#[derive(Debug, Clone)]
pub struct MemoryPost {
    pub id: String,
    pub post: CanonicalPost,
    pub indexed_at: i64,
    pub indexed: bool,
}

/// [`PostStore`] kept in maps, for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blogs: RwLock<HashMap<String, BlogConfig>>,
    posts: RwLock<HashMap<String, MemoryPost>>,
    citations: RwLock<HashMap<String, Citation>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blog(mut self, blog: BlogConfig) -> Self {
        self.blogs.get_mut().insert(blog.slug.clone(), blog);
        self
    }

    pub async fn post(&self, guid: &str) -> Option<MemoryPost> {
        self.posts.read().await.get(guid).cloned()
    }

    pub async fn post_count(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn citations(&self) -> Vec<Citation> {
        let mut all: Vec<_> = self.citations.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.cid.cmp(&b.cid));
        all
    }

    /// Record that the external indexer has seen `guid` at `at`.
    pub async fn mark_indexed(&self, guid: &str, at: i64) {
        if let Some(stored) = self.posts.write().await.get_mut(guid) {
            stored.indexed_at = at;
        }
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn get_blog(&self, slug: &str) -> Result<Option<BlogConfig>> {
        Ok(self.blogs.read().await.get(slug).cloned())
    }

    async fn list_blogs(&self, status: Option<BlogStatus>) -> Result<Vec<BlogConfig>> {
        let mut blogs: Vec<_> = self
            .blogs
            .read()
            .await
            .values()
            .filter(|b| status.is_none_or(|s| b.status == s))
            .cloned()
            .collect();
        blogs.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(blogs)
    }

    async fn upsert_post(&self, post: &CanonicalPost) -> Result<StoredPost> {
        let mut posts = self.posts.write().await;
        let entry = posts.entry(post.guid.clone()).or_insert_with(|| MemoryPost {
            id: (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string(),
            post: post.clone(),
            indexed_at: 0,
            indexed: false,
        });

        let doi = post.doi.clone().or_else(|| entry.post.doi.clone());
        entry.post = CanonicalPost {
            doi,
            ..post.clone()
        };

        Ok(StoredPost {
            id: entry.id.clone(),
            guid: post.guid.clone(),
            indexed_at: entry.indexed_at,
            updated_at: entry.post.updated_at,
        })
    }

    async fn set_indexed(&self, guid: &str, indexed: bool) -> Result<()> {
        if let Some(stored) = self.posts.write().await.get_mut(guid) {
            stored.indexed = indexed;
        }
        Ok(())
    }

    async fn refresh_blog_updated_at(&self, slug: &str) -> Result<Option<i64>> {
        let newest = self
            .posts
            .read()
            .await
            .values()
            .filter(|p| p.post.blog_slug == slug)
            .map(|p| p.post.updated_at)
            .max();

        let mut blogs = self.blogs.write().await;
        let Some(blog) = blogs.get_mut(slug) else {
            return Ok(None);
        };
        if let Some(newest) = newest {
            blog.updated_at = newest;
        }
        Ok(Some(blog.updated_at))
    }

    async fn update_blog_metadata(&self, slug: &str, meta: &FeedMeta) -> Result<()> {
        if let Some(blog) = self.blogs.write().await.get_mut(slug) {
            let keep = |new: &Option<String>, old: &mut Option<String>| {
                if new.is_some() {
                    old.clone_from(new);
                }
            };
            keep(&meta.title, &mut blog.title);
            keep(&meta.description, &mut blog.description);
            keep(&meta.favicon, &mut blog.favicon);
            keep(&meta.language, &mut blog.language);
            keep(&meta.generator, &mut blog.generator);
            keep(&meta.home_page_url, &mut blog.home_page_url);
        }
        Ok(())
    }

    async fn update_blog_feed(&self, slug: &str, feed_url: &str, feed_format: &str) -> Result<()> {
        if let Some(blog) = self.blogs.write().await.get_mut(slug) {
            blog.feed_url = Some(feed_url.to_string());
            blog.feed_format = Some(feed_format.to_string());
        }
        Ok(())
    }

    async fn find_blog_slug_by_doi(&self, doi: &str) -> Result<Option<String>> {
        let Some(doi) = normalize_doi(doi) else {
            return Ok(None);
        };
        Ok(self
            .posts
            .read()
            .await
            .values()
            .find(|p| p.post.doi.as_deref().is_some_and(|d| d.eq_ignore_ascii_case(&doi)))
            .map(|p| p.post.blog_slug.clone()))
    }

    async fn upsert_citation(&self, citation: &Citation) -> Result<()> {
        self.citations
            .write()
            .await
            .insert(citation.cid.clone(), citation.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::index_is_current;

    fn post(guid: &str, title: &str, updated_at: i64) -> CanonicalPost {
        CanonicalPost {
            guid: guid.into(),
            url: format!("https://blog.example/{guid}"),
            title: title.into(),
            blog_slug: "front-matter".into(),
            published_at: 1,
            updated_at,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn upsert_is_keyed_on_guid_and_last_write_wins() {
        let store = MemoryStore::new();
        let first = store.upsert_post(&post("g", "First", 10)).await.unwrap();
        let second = store.upsert_post(&post("g", "Second", 20)).await.unwrap();

        assert_eq!(store.post_count().await, 1);
        assert_eq!(first.id, second.id);
        assert_eq!(store.post("g").await.unwrap().post.title, "Second");
        assert_eq!(second.updated_at, 20);
    }

    #[tokio::test]
    async fn upsert_keeps_existing_doi() {
        let store = MemoryStore::new();
        let mut with_doi = post("g", "T", 1);
        with_doi.doi = Some("https://doi.org/10.59350/a".into());
        store.upsert_post(&with_doi).await.unwrap();
        store.upsert_post(&post("g", "T", 2)).await.unwrap();
        assert_eq!(
            store.post("g").await.unwrap().post.doi.as_deref(),
            Some("https://doi.org/10.59350/a")
        );
    }

    #[tokio::test]
    async fn indexed_at_survives_upsert() {
        let store = MemoryStore::new();
        store.upsert_post(&post("g", "T", 10)).await.unwrap();
        store.mark_indexed("g", 15).await;

        let unchanged = store.upsert_post(&post("g", "T", 10)).await.unwrap();
        assert!(index_is_current(&unchanged));
        let edited = store.upsert_post(&post("g", "T", 30)).await.unwrap();
        assert!(!index_is_current(&edited));
    }

    #[tokio::test]
    async fn blog_updated_at_is_max_of_posts() {
        let store = MemoryStore::new().with_blog(BlogConfig {
            slug: "front-matter".into(),
            updated_at: 5,
            ..Default::default()
        });
        store.upsert_post(&post("a", "A", 40)).await.unwrap();
        store.upsert_post(&post("b", "B", 70)).await.unwrap();

        assert_eq!(store.refresh_blog_updated_at("front-matter").await.unwrap(), Some(70));
        assert_eq!(store.refresh_blog_updated_at("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn finds_blog_by_any_doi_spelling() {
        let store = MemoryStore::new();
        let mut p = post("g", "T", 1);
        p.doi = Some("https://doi.org/10.59350/abc".into());
        store.upsert_post(&p).await.unwrap();

        let slug = store
            .find_blog_slug_by_doi("http://dx.doi.org/10.59350/ABC")
            .await
            .unwrap();
        assert_eq!(slug.as_deref(), Some("front-matter"));
        assert_eq!(store.find_blog_slug_by_doi("10.1000/none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn metadata_update_keeps_missing_fields() {
        let store = MemoryStore::new().with_blog(BlogConfig {
            slug: "s".into(),
            title: Some("Old".into()),
            description: Some("Kept".into()),
            ..Default::default()
        });
        let meta = FeedMeta {
            title: Some("New".into()),
            ..Default::default()
        };
        store.update_blog_metadata("s", &meta).await.unwrap();
        let blog = store.get_blog("s").await.unwrap().unwrap();
        assert_eq!(blog.title.as_deref(), Some("New"));
        assert_eq!(blog.description.as_deref(), Some("Kept"));
    }
}
