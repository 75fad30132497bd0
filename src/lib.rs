// src/lib.rs

//! ScholarSync Library
//!
//! Aggregates science blog posts from WordPress, Ghost, Substack and plain
//! feeds into one catalog, and harvests the citations they receive.

pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod platforms;
pub mod services;
pub mod storage;
pub mod utils;
