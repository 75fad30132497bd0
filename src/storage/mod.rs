//! Persistence for blogs, posts and citations.
//!
//! - `database`: pooled PostgreSQL access with health checks and retries
//! - `postgres`: the SQL-backed [`PostStore`]
//! - `memory`: an in-process [`PostStore`] for tests

pub mod convert;
pub mod database;
pub mod memory;
pub mod postgres;
pub mod retry;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BlogConfig, BlogStatus, CanonicalPost, Citation, FeedMeta, StoredPost};

pub use database::Database;
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use retry::{RetryPolicy, retry_with_backoff};

/// Repository used by the sync and harvest pipelines.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_blog(&self, slug: &str) -> Result<Option<BlogConfig>>;

    /// All blogs, or only those in `status`.
    async fn list_blogs(&self, status: Option<BlogStatus>) -> Result<Vec<BlogConfig>>;

    /// Insert or overwrite the post keyed by its guid.
    async fn upsert_post(&self, post: &CanonicalPost) -> Result<StoredPost>;

    /// Set the search index flag of one post.
    async fn set_indexed(&self, guid: &str, indexed: bool) -> Result<()>;

    /// Recompute a blog's `updated_at` from its stored posts.
    async fn refresh_blog_updated_at(&self, slug: &str) -> Result<Option<i64>>;

    /// Refresh feed-level attributes; absent values keep the stored ones.
    async fn update_blog_metadata(&self, slug: &str, meta: &FeedMeta) -> Result<()>;

    /// Persist a discovered feed location.
    async fn update_blog_feed(&self, slug: &str, feed_url: &str, feed_format: &str) -> Result<()>;

    /// Owning blog of a post DOI, compared in normalized form.
    async fn find_blog_slug_by_doi(&self, doi: &str) -> Result<Option<String>>;

    async fn upsert_citation(&self, citation: &Citation) -> Result<()>;
}

/// Whether the search index already reflects the stored row.
///
/// The external indexer stamps `indexed_at` after it has read a row, so a
/// post counts as indexed only when `indexed_at > updated_at`. Equal stamps
/// or an `indexed_at` at or before `updated_at` mean the row is stale and
/// the stored `indexed` flag is written as `false`.
pub fn index_is_current(stored: &StoredPost) -> bool {
    stored.indexed_at > stored.updated_at
}
