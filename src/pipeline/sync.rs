// src/pipeline/sync.rs

//! Blog ingestion: resolve, plan, fetch, filter, extract, write.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt};

use super::plan::{plan_fetch, slice_items};
use crate::context::AppContext;
use crate::error::{AppError, Result};
use crate::models::{BlogConfig, BlogStatus, CanonicalPost, Config, SyncReport};
use crate::normalize::{Normalizer, resolve_references};
use crate::platforms::{FeedPage, RawPost, filter_updated_posts, parse_page};
use crate::services::{Fetch, MetadataResolver, discover_feed};
use crate::storage::{PostStore, index_is_current};
use crate::utils::time::now;

/// Posts and counters of one blog sync.
#[derive(Debug, Default)]
pub struct BlogSync {
    pub posts: Vec<CanonicalPost>,
    pub report: SyncReport,
}

/// Runs the per-blog ingestion pipeline.
pub struct BlogSyncer {
    config: Arc<Config>,
    normalizer: Arc<Normalizer>,
    store: Arc<dyn PostStore>,
    fetcher: Arc<dyn Fetch>,
    resolver: Arc<dyn MetadataResolver>,
}

impl BlogSyncer {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn PostStore>,
        fetcher: Arc<dyn Fetch>,
        resolver: Arc<dyn MetadataResolver>,
    ) -> Result<Self> {
        let normalizer = Normalizer::new(Arc::new(config.normalize.clone()))?;
        Ok(Self {
            config,
            normalizer: Arc::new(normalizer),
            store,
            fetcher,
            resolver,
        })
    }

    pub fn from_context(ctx: &AppContext) -> Result<Self> {
        Self::new(
            Arc::clone(&ctx.config),
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.fetcher),
            Arc::clone(&ctx.resolver),
        )
    }

    /// Sync the first page of every active blog concurrently.
    ///
    /// Fetch and parse failures stay inside their blog's report; a storage
    /// failure in any blog fails the run once all blogs have finished.
    pub async fn sync_all_blogs(&self, force: bool) -> Result<Vec<SyncReport>> {
        let blogs = self.store.list_blogs(Some(BlogStatus::Active)).await?;
        log::info!("Syncing {} blogs", blogs.len());

        let results = future::join_all(blogs.into_iter().map(|blog| async move {
            let slug = blog.slug.clone();
            (slug, self.sync_loaded(blog, 1, force).await)
        }))
        .await;

        let mut reports = Vec::with_capacity(results.len());
        let mut fatal = None;
        for (slug, result) in results {
            match result {
                Ok(sync) => reports.push(sync.report),
                Err(e) => {
                    log::error!("{}: sync aborted: {}", slug, e);
                    fatal.get_or_insert(e);
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    /// Sync one page of one blog and return its posts.
    pub async fn sync_blog(&self, slug: &str, page: u32, force: bool) -> Result<Vec<CanonicalPost>> {
        Ok(self.sync_blog_report(slug, page, force).await?.posts)
    }

    /// Like [`Self::sync_blog`], keeping the counters.
    pub async fn sync_blog_report(&self, slug: &str, page: u32, force: bool) -> Result<BlogSync> {
        let blog = self
            .store
            .get_blog(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("blog {slug}")))?;
        self.sync_loaded(blog, page, force).await
    }

    async fn sync_loaded(&self, mut blog: BlogConfig, page: u32, force: bool) -> Result<BlogSync> {
        let mut report = SyncReport::new(&blog.slug);

        let Some(FeedPage {
            items,
            meta,
            skipped,
        }) = self.fetch_page(&mut blog, page, &mut report).await?
        else {
            return Ok(BlogSync {
                posts: Vec::new(),
                report,
            });
        };

        report.fetched = items.len() + skipped.len();
        report.rejected += skipped.len();
        for error in skipped {
            log::warn!("{}: skipping record: {}", blog.slug, error);
            report.record_error(error);
        }

        let readable = items.len();
        let items = filter_updated_posts(items, blog.updated_at, force);
        report.filtered = readable - items.len();

        let posts = self.extract_all(&blog, items, &mut report).await;
        report.extracted = posts.len();

        if !blog.is_active() {
            log::info!(
                "{}: status {}, returning {} posts without storing",
                blog.slug,
                blog.status.as_str(),
                posts.len()
            );
            return Ok(BlogSync { posts, report });
        }

        for post in &posts {
            let stored = self.store.upsert_post(post).await?;
            self.store
                .set_indexed(&stored.guid, index_is_current(&stored))
                .await?;
            report.stored += 1;
        }

        if let Some(updated_at) = self.store.refresh_blog_updated_at(&blog.slug).await? {
            log::debug!("{}: updated_at now {}", blog.slug, updated_at);
        }
        if !meta.is_empty() {
            self.store.update_blog_metadata(&blog.slug, &meta).await?;
        }

        log::info!("{}", report);
        Ok(BlogSync { posts, report })
    }

    /// Fetch and parse one page; `None` when the blog yields nothing.
    ///
    /// Only storage failures are returned as errors.
    async fn fetch_page(
        &self,
        blog: &mut BlogConfig,
        page: u32,
        report: &mut SyncReport,
    ) -> Result<Option<FeedPage>> {
        if blog.feed_url.is_none() && !blog.use_api && !self.discover(blog, report).await? {
            return Ok(None);
        }

        let plan = match plan_fetch(blog, page, &self.config.sync) {
            Ok(Some(plan)) => plan,
            Ok(None) => return Ok(None),
            Err(e) => {
                log::warn!("{}: {}", blog.slug, e);
                report.record_error(e);
                return Ok(None);
            }
        };

        let body = match self
            .fetcher
            .get_text(&plan.url, &plan.query, self.config.http.feed_timeout())
            .await
        {
            Ok(body) => body,
            Err(e) => {
                log::warn!("{}: fetch failed: {}", blog.slug, e);
                report.record_error(e);
                return Ok(None);
            }
        };

        match parse_page(blog.platform(), &body) {
            Ok(mut feed) => {
                feed.items = slice_items(feed.items, plan.slice.as_ref());
                Ok(Some(feed))
            }
            Err(e) => {
                log::warn!("{}: unreadable {:?} page: {}", blog.slug, blog.platform(), e);
                report.record_error(e);
                Ok(None)
            }
        }
    }

    /// Find the feed on the home page; returns whether one was found.
    async fn discover(&self, blog: &mut BlogConfig, report: &mut SyncReport) -> Result<bool> {
        let Some(home) = blog.home_page_url.clone() else {
            log::warn!("{}: no feed URL and no home page", blog.slug);
            report.record_error("no feed URL and no home page");
            return Ok(false);
        };

        match discover_feed(self.fetcher.as_ref(), &home, self.config.http.feed_timeout()).await {
            Ok(Some(feed)) => {
                if blog.is_active() {
                    self.store
                        .update_blog_feed(&blog.slug, &feed.url, &feed.format)
                        .await?;
                }
                blog.feed_url = Some(feed.url);
                blog.feed_format = Some(feed.format);
                Ok(true)
            }
            Ok(None) => {
                report.record_error(format!("no feed link on {home}"));
                Ok(false)
            }
            Err(e) => {
                log::warn!("{}: feed discovery failed: {}", blog.slug, e);
                report.record_error(e);
                Ok(false)
            }
        }
    }

    /// Extract and validate every item; failures are counted, not returned.
    async fn extract_all(
        &self,
        blog: &BlogConfig,
        items: Vec<RawPost>,
        report: &mut SyncReport,
    ) -> Vec<CanonicalPost> {
        let concurrency = self.config.http.max_concurrent.max(1);
        let now = now();

        let results: Vec<Result<CanonicalPost>> = stream::iter(items)
            .map(|item| async move { self.extract_one(blog, item, now).await })
            .buffered(concurrency)
            .collect()
            .await;

        let mut posts = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(post) => posts.push(post),
                Err(e) => {
                    log::warn!("{}: skipping post: {}", blog.slug, e);
                    report.rejected += 1;
                    report.record_error(e);
                }
            }
        }
        posts
    }

    async fn extract_one(&self, blog: &BlogConfig, item: RawPost, now: i64) -> Result<CanonicalPost> {
        let draft = item.extract(blog, &self.normalizer)?;
        draft.post.validate(now)?;

        let mut post = draft.post;
        post.reference = resolve_references(
            draft.references,
            self.resolver.as_ref(),
            self.fetcher.as_ref(),
            self.config.http.max_concurrent,
        )
        .await;
        Ok(post)
    }
}
