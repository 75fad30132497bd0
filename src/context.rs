// src/context.rs

//! Process-wide collaborators, built once at startup.

use std::sync::Arc;

use crate::error::Result;
use crate::models::Config;
use crate::services::{DoiResolver, Fetch, HttpFetcher, MetadataResolver};
use crate::storage::{Database, PgStore, PostStore};

/// Shared handles passed to the sync and harvest pipelines.
pub struct AppContext {
    pub config: Arc<Config>,
    pub db: Arc<Database>,
    pub store: Arc<dyn PostStore>,
    pub fetcher: Arc<dyn Fetch>,
    pub resolver: Arc<dyn MetadataResolver>,
}

impl AppContext {
    /// Open the database pool and build the HTTP collaborators.
    pub async fn connect(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let db = Arc::new(Database::new(config.database.clone()));
        db.initialize().await?;

        let fetcher = HttpFetcher::new(&config.http)?;
        let resolver = DoiResolver::new(fetcher.client().clone(), config.http.metadata_timeout());

        Ok(Self {
            store: Arc::new(PgStore::new(Arc::clone(&db))),
            fetcher: Arc::new(fetcher),
            resolver: Arc::new(resolver),
            db,
            config,
        })
    }

    /// Stop the health check and release the pool.
    pub async fn close(&self) {
        self.db.close().await;
    }
}
