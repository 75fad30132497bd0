// src/platforms/ghost.rs

//! Ghost Content API (`/ghost/api/content/posts/`).

use serde::Deserialize;

use super::{FeedPage, PostParts, RawPost};
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct GhostPage {
    #[serde(default)]
    pub posts: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhostPost {
    pub id: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub canonical_url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub custom_excerpt: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub feature_image: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<GhostTag>,
    #[serde(default)]
    pub authors: Vec<GhostAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhostTag {
    pub name: String,
    /// Internal tags start with `#` and are hidden by Ghost
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhostAuthor {
    pub name: String,
    #[serde(default)]
    pub website: Option<String>,
}

pub fn parse(body: &str) -> Result<FeedPage> {
    let page: GhostPage = serde_json::from_str(body)?;
    Ok(FeedPage::from_records(page.posts, RawPost::Ghost))
}

impl GhostPost {
    pub fn parts(&self) -> PostParts {
        let url = self
            .canonical_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.url.clone());

        PostParts {
            guid: self.uuid.clone().or_else(|| Some(self.id.clone())),
            url,
            title: self.title.clone(),
            content_html: self.html.clone().unwrap_or_default(),
            excerpt: self
                .custom_excerpt
                .clone()
                .or_else(|| self.excerpt.clone())
                .filter(|e| !e.trim().is_empty()),
            published: self.published_at.clone(),
            updated: self.updated_at.clone(),
            authors: self
                .authors
                .iter()
                .map(|a| (a.name.clone(), a.website.clone()))
                .collect(),
            tags: self
                .tags
                .iter()
                .filter(|t| t.visibility.as_deref() != Some("internal"))
                .map(|t| t.name.clone())
                .collect(),
            media_image: self.feature_image.clone(),
            ..PostParts::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::tests::{blog, normalizer};

    #[test]
    fn maps_content_api_post() {
        let body = r##"{"posts": [{
          "id": "65a1",
          "uuid": "0b5c6f2e-1111-2222-3333-444455556666",
          "url": "https://ghost.example/first/",
          "title": "First",
          "html": "<p>Ghost body text with enough words to summarize.</p>",
          "custom_excerpt": "A custom excerpt that describes something else entirely.",
          "feature_image": "https://ghost.example/content/images/cover.png",
          "published_at": "2024-02-01T12:00:00.000+00:00",
          "updated_at": "2024-02-03T12:00:00.000+00:00",
          "tags": [{"name": "science"}, {"name": "#hidden", "visibility": "internal"}],
          "authors": [{"name": "Gil Ghost", "website": "https://orcid.org/0000-0002-1825-0097"}]
        }]}"##;

        let page = parse(body).unwrap();
        let post = page.items[0].extract(&blog(), &normalizer()).unwrap().post;

        assert_eq!(post.guid, "0b5c6f2e-1111-2222-3333-444455556666");
        assert_eq!(post.tags, vec!["Science"]);
        assert_eq!(
            post.authors[0].url.as_deref(),
            Some("https://orcid.org/0000-0002-1825-0097")
        );
        assert_eq!(
            post.abstract_.as_deref(),
            Some("A custom excerpt that describes something else entirely.")
        );
        assert_eq!(post.image.as_deref(), Some("https://ghost.example/content/images/cover.png"));
    }

    #[test]
    fn post_with_bad_tags_is_skipped_alone() {
        let body = r#"{"posts": [
          {"id": "a1", "url": "https://ghost.example/a/", "title": "A"},
          {"id": "b2", "url": "https://ghost.example/b/", "title": "B", "tags": "science"}
        ]}"#;
        let page = parse(body).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.skipped.len(), 1);
        assert!(page.skipped[0].starts_with("record b2:"));
    }
}
