// src/models/mod.rs

//! Domain models for the aggregator.
//!
//! Blogs, canonical posts, citations, configuration and batch reports.

mod blog;
mod citation;
mod config;
mod post;
mod report;

// Re-export all public types
pub use blog::{BlogConfig, BlogStatus, FeedMeta, PlatformKind};
pub use citation::{Citation, cid};
pub use config::{
    Config, CrossrefConfig, DatabaseConfig, HttpConfig, ImageHostFix, NormalizeConfig,
    RelationshipKeywords, SyncConfig,
};
pub use post::{
    Author, CanonicalPost, Image, Reference, Relationship, RelationshipType, StoredPost,
    guid_from_url,
};
pub use report::{HarvestReport, SyncReport};
