// src/platforms/wordpress.rs

//! Self-hosted WordPress REST API (`/wp-json/wp/v2/posts?_embed`).

use serde::Deserialize;

use super::{FeedPage, PostParts, RawPost};
use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpPost {
    pub id: u64,
    #[serde(default)]
    pub guid: Rendered,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub date_gmt: Option<String>,
    #[serde(default)]
    pub modified_gmt: Option<String>,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default, rename = "_embedded")]
    pub embedded: Option<WpEmbedded>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WpEmbedded {
    #[serde(default)]
    pub author: Vec<WpAuthor>,
    #[serde(default, rename = "wp:featuredmedia")]
    pub featured_media: Vec<WpMedia>,
    #[serde(default, rename = "wp:term")]
    pub terms: Vec<Vec<WpTerm>>,
}

/// Embedded author; access-restricted authors arrive as an error object
/// without a name.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WpAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WpMedia {
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpTerm {
    pub name: String,
    #[serde(default)]
    pub taxonomy: String,
}

pub fn parse(body: &str) -> Result<FeedPage> {
    let records: Vec<serde_json::Value> = serde_json::from_str(body)?;
    Ok(FeedPage::from_records(records, RawPost::WordPress))
}

impl WpPost {
    fn terms(&self, taxonomy: &str) -> Vec<String> {
        self.embedded
            .iter()
            .flat_map(|e| e.terms.iter().flatten())
            .filter(|t| t.taxonomy == taxonomy)
            .map(|t| t.name.clone())
            .collect()
    }

    pub fn parts(&self) -> PostParts {
        let embedded = self.embedded.clone().unwrap_or_default();
        let guid = Some(self.guid.rendered.clone())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| self.id.to_string());

        PostParts {
            guid: Some(guid),
            url: self.link.clone(),
            title: self.title.rendered.clone(),
            content_html: self.content.rendered.clone(),
            excerpt: Some(self.excerpt.rendered.clone()).filter(|e| !e.trim().is_empty()),
            published: self.date_gmt.clone(),
            updated: self.modified_gmt.clone(),
            authors: embedded
                .author
                .iter()
                .map(|a| (a.name.clone(), a.url.clone()))
                .collect(),
            categories: self.terms("category"),
            tags: self.terms("post_tag"),
            media_image: embedded
                .featured_media
                .first()
                .and_then(|m| m.source_url.clone()),
            ..PostParts::default()
        }
    }
}
