// src/platforms/substack.rs

//! Substack archive API (`/api/v1/posts/`).

use serde::Deserialize;

use super::{FeedPage, PostParts, RawPost};
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubstackPost {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub canonical_url: String,
    #[serde(default)]
    pub post_date: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default, rename = "postTags")]
    pub post_tags: Vec<Named>,
    #[serde(default, rename = "publishedBylines")]
    pub bylines: Vec<Named>,
}

pub fn parse(body: &str) -> Result<FeedPage> {
    let records: Vec<serde_json::Value> = serde_json::from_str(body)?;
    Ok(FeedPage::from_records(records, RawPost::Substack))
}

impl SubstackPost {
    pub fn parts(&self) -> PostParts {
        PostParts {
            guid: Some(self.id.to_string()),
            url: self.canonical_url.clone(),
            title: self.title.clone(),
            content_html: self.body_html.clone().unwrap_or_default(),
            excerpt: self
                .description
                .clone()
                .or_else(|| self.subtitle.clone())
                .filter(|e| !e.trim().is_empty()),
            published: self.post_date.clone(),
            updated: self.updated_at.clone().or_else(|| self.post_date.clone()),
            authors: self.bylines.iter().map(|b| (b.name.clone(), None)).collect(),
            tags: self.post_tags.iter().map(|t| t.name.clone()).collect(),
            media_image: self.cover_image.clone(),
            ..PostParts::default()
        }
    }
}
