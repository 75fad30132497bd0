// src/platforms/wordpress_com.rs

//! WordPress.com public API (`rest/v1.1/sites/{site}/posts`).

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{FeedPage, PostParts, RawPost};
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct WpComPage {
    #[serde(default)]
    pub found: u64,
    #[serde(default)]
    pub posts: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpComPost {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "URL", default)]
    pub url: String,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub author: Option<WpComAuthor>,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub post_thumbnail: Option<WpComThumbnail>,
    /// Keyed by tag name
    #[serde(default)]
    pub tags: Map<String, Value>,
    /// Keyed by category name
    #[serde(default)]
    pub categories: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpComAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpComThumbnail {
    #[serde(rename = "URL", default)]
    pub url: Option<String>,
}

pub fn parse(body: &str) -> Result<FeedPage> {
    let page: WpComPage = serde_json::from_str(body)?;
    log::debug!("WordPress.com page: {} of {} posts", page.posts.len(), page.found);
    Ok(FeedPage::from_records(page.posts, RawPost::WordPressCom))
}

impl WpComPost {
    pub fn parts(&self) -> PostParts {
        PostParts {
            guid: self.guid.clone().or_else(|| Some(self.id.to_string())),
            url: self.url.clone(),
            title: self.title.clone(),
            content_html: self.content.clone(),
            excerpt: Some(self.excerpt.clone()).filter(|e| !e.trim().is_empty()),
            published: self.date.clone(),
            updated: self.modified.clone(),
            authors: self
                .author
                .iter()
                .map(|a| (a.name.clone(), a.url.clone()))
                .collect(),
            categories: self.categories.keys().cloned().collect(),
            tags: self.tags.keys().cloned().collect(),
            media_image: self.featured_image.clone().filter(|i| !i.is_empty()),
            thumbnail: self.post_thumbnail.as_ref().and_then(|t| t.url.clone()),
            ..PostParts::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::tests::{blog, normalizer};

    #[test]
    fn maps_public_api_post() {
        let body = r#"{
          "found": 1,
          "posts": [{
            "ID": 7,
            "URL": "https://site.wordpress.com/2023/05/04/hello/",
            "guid": "http://site.wordpress.com/?p=7",
            "title": "Hello",
            "content": "<p>Hello world from a hosted blog.</p>",
            "excerpt": "",
            "date": "2023-05-04T08:00:00+00:00",
            "modified": "2023-05-05T08:00:00+00:00",
            "author": {"name": "Ana Author", "URL": ""},
            "featured_image": "",
            "post_thumbnail": {"URL": "https://site.files.wordpress.com/thumb.png"},
            "tags": {"rdm": {}},
            "categories": {"News": {}}
          }]
        }"#;

        let page = parse(body).unwrap();
        let post = page.items[0].extract(&blog(), &normalizer()).unwrap().post;

        assert_eq!(post.guid, "http://site.wordpress.com/?p=7");
        assert_eq!(post.authors[0].name, "Ana Author");
        assert_eq!(post.tags, vec!["News", "RDM"]);
        assert_eq!(
            post.image.as_deref(),
            Some("https://site.files.wordpress.com/thumb.png")
        );
        assert_eq!(page.items[0].modified_at(), Some(1_683_273_600));
    }

    #[test]
    fn post_with_string_tags_is_skipped_alone() {
        let body = r#"{"found": 2, "posts": [
          {"ID": 8, "URL": "https://site.wordpress.com/ok/", "title": "Ok"},
          {"ID": 9, "URL": "https://site.wordpress.com/odd/", "title": "Odd", "tags": "rdm"}
        ]}"#;
        let page = parse(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.skipped.len(), 1);
        assert!(page.skipped[0].starts_with("record 9:"));
    }
}
