//! Pipeline entry points.
//!
//! - `sync`: ingest posts from every blog or from one
//! - `citations`: harvest forward citations per DOI prefix
//! - `plan`: per-platform request and pagination rules

pub mod citations;
pub mod plan;
pub mod sync;

pub use citations::{CitationHarvester, PrefixHarvest};
pub use plan::{FetchPlan, plan_fetch};
pub use sync::{BlogSync, BlogSyncer};
