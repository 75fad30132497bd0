// src/storage/postgres.rs

//! SQL-backed post repository.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};

use super::convert::JsonRow;
use super::{Database, PostStore};
use crate::error::{AppError, Result};
use crate::models::{BlogConfig, BlogStatus, CanonicalPost, Citation, FeedMeta, StoredPost};
use crate::utils::doi::normalize_doi;

const SELECT_BLOG: &str = "SELECT slug, title, description, feed_url, home_page_url, generator, \
     feed_format, plan, COALESCE(use_api, false) AS use_api, filter, \
     COALESCE(updated_at, 0) AS updated_at, COALESCE(authors, '[]'::jsonb) AS authors, \
     language, category, relative_url, COALESCE(secure, false) AS secure, \
     COALESCE(status, 'pending') AS status, favicon, api_key, archive_prefix \
     FROM blogs";

const UPSERT_POST: &str = "INSERT INTO posts (guid, doi, url, archive_url, title, summary, \
     abstract, content_html, tags, authors, images, image, published_at, updated_at, language, \
     reference, relationships, blog_slug, blog_name, category) \
     VALUES ($1::text, $2::text, $3::text, $4::text, $5::text, $6::text, $7::text, $8::text, \
     $9::jsonb, $10::jsonb, $11::jsonb, $12::text, $13::bigint, $14::bigint, $15::text, \
     $16::jsonb, $17::jsonb, $18::text, $19::text, $20::text) \
     ON CONFLICT (guid) DO UPDATE SET \
     doi = COALESCE(EXCLUDED.doi, posts.doi), url = EXCLUDED.url, \
     archive_url = EXCLUDED.archive_url, title = EXCLUDED.title, summary = EXCLUDED.summary, \
     abstract = EXCLUDED.abstract, content_html = EXCLUDED.content_html, tags = EXCLUDED.tags, \
     authors = EXCLUDED.authors, images = EXCLUDED.images, image = EXCLUDED.image, \
     published_at = EXCLUDED.published_at, updated_at = EXCLUDED.updated_at, \
     language = EXCLUDED.language, reference = EXCLUDED.reference, \
     relationships = EXCLUDED.relationships, blog_slug = EXCLUDED.blog_slug, \
     blog_name = EXCLUDED.blog_name, category = EXCLUDED.category \
     RETURNING id::text AS id, guid, COALESCE(indexed_at, 0) AS indexed_at, updated_at";

const SET_INDEXED: &str = "UPDATE posts SET indexed = $2 WHERE guid = $1::text";

const REFRESH_BLOG_UPDATED_AT: &str = "UPDATE blogs SET updated_at = COALESCE( \
     (SELECT MAX(updated_at) FROM posts WHERE blog_slug = $1::text), blogs.updated_at) \
     WHERE slug = $1::text RETURNING updated_at";

const UPDATE_BLOG_METADATA: &str = "UPDATE blogs SET \
     title = COALESCE($2::text, title), description = COALESCE($3::text, description), \
     favicon = COALESCE($4::text, favicon), language = COALESCE($5::text, language), \
     generator = COALESCE($6::text, generator), \
     home_page_url = COALESCE($7::text, home_page_url) \
     WHERE slug = $1::text";

const UPDATE_BLOG_FEED: &str =
    "UPDATE blogs SET feed_url = $2::text, feed_format = $3::text WHERE slug = $1::text";

const FIND_BLOG_BY_DOI: &str =
    "SELECT blog_slug FROM posts WHERE lower(doi) = $1::text AND blog_slug IS NOT NULL LIMIT 1";

const UPSERT_CITATION: &str = "INSERT INTO citations (cid, doi, citation, unstructured, \
     published_at, type, blog_slug, updated_at) \
     VALUES ($1::text, $2::text, $3::text, $4::text, $5::text, $6::text, $7::text, $8::bigint) \
     ON CONFLICT (cid) DO UPDATE SET \
     unstructured = EXCLUDED.unstructured, published_at = EXCLUDED.published_at, \
     type = EXCLUDED.type, blog_slug = EXCLUDED.blog_slug, updated_at = EXCLUDED.updated_at";

/// [`PostStore`] over the pooled database; every statement is retried on
/// connection failures.
#[derive(Clone)]
pub struct PgStore {
    db: Arc<Database>,
}

impl PgStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn fetch_one(&self, sql: &str, params: Vec<Value>) -> Result<Option<JsonRow>> {
        self.db
            .execute_with_retry(|| self.db.fetch_one(sql, &params))
            .await
    }

    async fn execute(&self, sql: &str, params: Vec<Value>) -> Result<u64> {
        self.db
            .execute_with_retry(|| self.db.execute(sql, &params))
            .await
    }
}

fn blog_from_row(mut row: JsonRow) -> Result<BlogConfig> {
    let status = row
        .remove("status")
        .and_then(|s| s.as_str().map(BlogStatus::parse))
        .unwrap_or(BlogStatus::Pending);
    let mut blog: BlogConfig = serde_json::from_value(Value::Object(row))?;
    blog.status = status;
    Ok(blog)
}

fn stored_from_row(row: &JsonRow) -> Result<StoredPost> {
    let text = |key: &str| {
        row.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::validation(format!("upsert returned no {key}")))
    };
    let int = |key: &str| row.get(key).and_then(Value::as_i64).unwrap_or_default();
    Ok(StoredPost {
        id: text("id")?,
        guid: text("guid")?,
        indexed_at: int("indexed_at"),
        updated_at: int("updated_at"),
    })
}

fn post_params(post: &CanonicalPost) -> Result<Vec<Value>> {
    Ok(vec![
        json!(post.guid),
        json!(post.doi),
        json!(post.url),
        json!(post.archive_url),
        json!(post.title),
        json!(post.summary),
        json!(post.abstract_),
        json!(post.content_html),
        serde_json::to_value(&post.tags)?,
        serde_json::to_value(&post.authors)?,
        serde_json::to_value(&post.images)?,
        json!(post.image),
        json!(post.published_at),
        json!(post.updated_at),
        json!(post.language),
        serde_json::to_value(&post.reference)?,
        serde_json::to_value(&post.relationships)?,
        json!(post.blog_slug),
        json!(post.blog_name),
        json!(post.category),
    ])
}

#[async_trait]
impl PostStore for PgStore {
    async fn get_blog(&self, slug: &str) -> Result<Option<BlogConfig>> {
        let sql = format!("{SELECT_BLOG} WHERE slug = $1::text");
        self.fetch_one(&sql, vec![json!(slug)])
            .await?
            .map(blog_from_row)
            .transpose()
    }

    async fn list_blogs(&self, status: Option<BlogStatus>) -> Result<Vec<BlogConfig>> {
        let (sql, params) = match status {
            Some(status) => (
                format!("{SELECT_BLOG} WHERE status = $1::text ORDER BY slug"),
                vec![json!(status.as_str())],
            ),
            None => (format!("{SELECT_BLOG} ORDER BY slug"), Vec::new()),
        };
        let rows = self
            .db
            .execute_with_retry(|| self.db.fetch_all(&sql, &params))
            .await?;
        rows.into_iter().map(blog_from_row).collect()
    }

    async fn upsert_post(&self, post: &CanonicalPost) -> Result<StoredPost> {
        let row = self
            .fetch_one(UPSERT_POST, post_params(post)?)
            .await?
            .ok_or_else(|| AppError::validation(format!("upsert of {} returned no row", post.guid)))?;
        stored_from_row(&row)
    }

    async fn set_indexed(&self, guid: &str, indexed: bool) -> Result<()> {
        self.execute(SET_INDEXED, vec![json!(guid), json!(indexed)])
            .await?;
        Ok(())
    }

    async fn refresh_blog_updated_at(&self, slug: &str) -> Result<Option<i64>> {
        let row = self
            .fetch_one(REFRESH_BLOG_UPDATED_AT, vec![json!(slug)])
            .await?;
        Ok(row.and_then(|r| r.get("updated_at").and_then(Value::as_i64)))
    }

    async fn update_blog_metadata(&self, slug: &str, meta: &FeedMeta) -> Result<()> {
        let params = vec![
            json!(slug),
            json!(meta.title),
            json!(meta.description),
            json!(meta.favicon),
            json!(meta.language),
            json!(meta.generator),
            json!(meta.home_page_url),
        ];
        self.execute(UPDATE_BLOG_METADATA, params).await?;
        Ok(())
    }

    async fn update_blog_feed(&self, slug: &str, feed_url: &str, feed_format: &str) -> Result<()> {
        self.execute(
            UPDATE_BLOG_FEED,
            vec![json!(slug), json!(feed_url), json!(feed_format)],
        )
        .await?;
        Ok(())
    }

    async fn find_blog_slug_by_doi(&self, doi: &str) -> Result<Option<String>> {
        let Some(doi) = normalize_doi(doi) else {
            return Ok(None);
        };
        let row = self.fetch_one(FIND_BLOG_BY_DOI, vec![json!(doi)]).await?;
        Ok(row.and_then(|r| r.get("blog_slug").and_then(Value::as_str).map(str::to_string)))
    }

    async fn upsert_citation(&self, citation: &Citation) -> Result<()> {
        let params = vec![
            json!(citation.cid),
            json!(citation.doi),
            json!(citation.citation),
            json!(citation.unstructured),
            json!(citation.published_at),
            json!(citation.kind),
            json!(citation.blog_slug),
            json!(citation.updated_at),
        ];
        self.execute(UPSERT_CITATION, params).await?;
        Ok(())
    }
}
