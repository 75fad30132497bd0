// src/models/post.rs

//! Canonical post and its nested records.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};

/// Post author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Author {
    pub name: String,

    /// Researcher identifier URL (ORCID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Author {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
        }
    }
}

/// Image found in the post body or supplied by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Image {
    pub src: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub srcset: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// Bibliographic reference from the post's reference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Position in the list, `ref1`, `ref2`, ...
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(rename = "year", default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    IsIdenticalTo,
    IsPreprintOf,
    HasAward,
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::IsIdenticalTo => "IsIdenticalTo",
            Self::IsPreprintOf => "IsPreprintOf",
            Self::HasAward => "HasAward",
        };
        f.write_str(s)
    }
}

/// Link from the acknowledgments to a related work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: RelationshipType,
    pub url: String,
}

/// Platform-independent post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CanonicalPost {
    /// Source identifier; the upsert key
    pub guid: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,

    pub title: String,
    pub summary: String,

    #[serde(default, rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_: Option<String>,

    pub content_html: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub authors: Vec<Author>,

    #[serde(default)]
    pub images: Vec<Image>,

    /// Representative image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Unix seconds
    pub published_at: i64,

    /// Unix seconds
    pub updated_at: i64,

    pub language: String,

    #[serde(default)]
    pub reference: Vec<Reference>,

    #[serde(default)]
    pub relationships: Vec<Relationship>,

    pub blog_slug: String,
    pub blog_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl CanonicalPost {
    /// Reject posts that must never reach storage.
    pub fn validate(&self, now: i64) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::validation(format!(
                "post {} has no title",
                self.url
            )));
        }
        if self.published_at > now {
            return Err(AppError::validation(format!(
                "post {} is published in the future ({})",
                self.url, self.published_at
            )));
        }
        Ok(())
    }
}

/// Stable identifier derived from a URL when the platform supplies none.
pub fn guid_from_url(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Row state returned by an upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPost {
    pub id: String,
    pub guid: String,
    /// Unix seconds, zero when never indexed
    pub indexed_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: &str, published_at: i64) -> CanonicalPost {
        CanonicalPost {
            guid: "g".into(),
            url: "https://blog.example/p".into(),
            title: title.into(),
            published_at,
            ..Default::default()
        }
    }

    #[test]
    fn future_post_is_rejected() {
        assert!(post("Title", 2_000).validate(1_000).is_err());
        assert!(post("Title", 1_000).validate(1_000).is_ok());
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(post("  ", 10).validate(1_000).is_err());
    }

    #[test]
    fn guid_from_url_is_stable_hex() {
        let a = guid_from_url("https://blog.example/p");
        assert_eq!(a, guid_from_url("https://blog.example/p"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, guid_from_url("https://blog.example/q"));
    }

    #[test]
    fn relationship_serializes_type_key() {
        let rel = Relationship {
            kind: RelationshipType::HasAward,
            url: "https://grant.example/1".into(),
        };
        let json = serde_json::to_value(&rel).unwrap();
        assert_eq!(json["type"], "HasAward");
    }

    #[test]
    fn reference_year_key() {
        let reference = Reference {
            key: "ref1".into(),
            doi: Some("https://doi.org/10.5555/a".into()),
            url: None,
            title: None,
            publication_year: Some("2021".into()),
        };
        assert_eq!(
            serde_json::to_value(&reference).unwrap(),
            serde_json::json!({"key": "ref1", "doi": "https://doi.org/10.5555/a", "year": "2021"})
        );
    }
}
