// src/platforms/json_feed.rs

//! JSON Feed 1.0 and 1.1.

use serde::Deserialize;
use serde_json::Value;

use super::{FeedPage, PostParts, RawPost};
use crate::error::Result;
use crate::models::FeedMeta;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonFeed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub home_page_url: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub items: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonFeedAuthor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonFeedItem {
    /// String in 1.1, sometimes a number in the wild
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content_html: Option<String>,
    #[serde(default)]
    pub content_text: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub banner_image: Option<String>,
    #[serde(default)]
    pub date_published: Option<String>,
    #[serde(default)]
    pub date_modified: Option<String>,
    #[serde(default)]
    pub authors: Vec<JsonFeedAuthor>,
    /// 1.0 single author
    #[serde(default)]
    pub author: Option<JsonFeedAuthor>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub language: Option<String>,
}

pub fn parse(body: &str) -> Result<FeedPage> {
    let feed: JsonFeed = serde_json::from_str(body)?;
    let meta = FeedMeta {
        title: feed.title,
        description: feed.description,
        favicon: feed.favicon.or(feed.icon),
        language: feed.language,
        generator: None,
        home_page_url: feed.home_page_url,
    };
    Ok(FeedPage {
        meta,
        ..FeedPage::from_records(feed.items, RawPost::JsonFeed)
    })
}

impl JsonFeedItem {
    fn id_string(&self) -> Option<String> {
        match self.id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn parts(&self) -> PostParts {
        let content_html = self
            .content_html
            .clone()
            .or_else(|| {
                self.content_text
                    .as_deref()
                    .map(|t| format!("<p>{}</p>", crate::normalize::html::escape_text(t)))
            })
            .unwrap_or_default();

        PostParts {
            guid: self.id_string(),
            url: self.url.clone().unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
            content_html,
            excerpt: self.summary.clone(),
            published: self.date_published.clone(),
            updated: self.date_modified.clone(),
            authors: self
                .authors
                .iter()
                .chain(self.author.iter())
                .filter_map(|a| a.name.clone().map(|n| (n, a.url.clone())))
                .collect(),
            tags: self.tags.clone(),
            thumbnail: self.image.clone().or_else(|| self.banner_image.clone()),
            language: self.language.clone(),
            ..PostParts::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::tests::{blog, normalizer};

    const FEED: &str = r#"{
      "version": "https://jsonfeed.org/version/1.1",
      "title": "Lab Notes",
      "home_page_url": "https://lab.example/",
      "favicon": "https://lab.example/favicon.ico",
      "language": "en",
      "items": [{
        "id": 1001,
        "url": "https://lab.example/posts/1001",
        "title": "Calibration",
        "content_html": "<p>Calibrating the instrument took a week.</p><img src=\"/img/setup.png\" width=\"640\">",
        "date_published": "2024-05-01T09:00:00Z",
        "authors": [{"name": "Lee Lab"}],
        "tags": ["methods"],
        "language": "de-CH"
      }]
    }"#;

    #[test]
    fn reads_feed_meta() {
        let page = parse(FEED).unwrap();
        assert_eq!(page.meta.title.as_deref(), Some("Lab Notes"));
        assert_eq!(page.meta.favicon.as_deref(), Some("https://lab.example/favicon.ico"));
    }

    #[test]
    fn bad_item_is_skipped_alone() {
        let body = r#"{"title": "Lab Notes", "items": [
          {"id": "a", "url": "https://lab.example/a", "date_published": "2024-05-01T09:00:00Z"},
          {"id": "b", "tags": "methods"}
        ]}"#;
        let page = parse(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.skipped.len(), 1);
        assert!(page.skipped[0].starts_with("record b:"));
        assert_eq!(page.meta.title.as_deref(), Some("Lab Notes"));
    }

    #[test]
    fn maps_item() {
        let page = parse(FEED).unwrap();
        let post = page.items[0].extract(&blog(), &normalizer()).unwrap().post;

        assert_eq!(post.guid, "1001");
        assert_eq!(post.language, "de");
        assert_eq!(post.images[0].src, "https://lab.example/img/setup.png");
        assert_eq!(post.image.as_deref(), Some("https://lab.example/img/setup.png"));
        assert_eq!(post.tags, vec!["Methods"]);
    }
}
