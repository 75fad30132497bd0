//! Content normalizers.
//!
//! Source-agnostic transforms from raw platform HTML into the fields of a
//! canonical post. Everything here is pure except reference resolution,
//! which checks links over the network.

pub mod authors;
pub mod html;
pub mod images;
pub mod language;
pub mod references;
pub mod tags;
pub mod text;

use std::sync::Arc;

use regex::Regex;

use crate::error::Result;
use crate::models::{Author, Image, NormalizeConfig, Relationship};

pub use authors::normalize_author;
pub use html::strip_tags;
pub use images::{extract_images, pick_feature_image};
pub use language::detect_language;
pub use references::{ReferenceCandidate, ReferenceTarget, resolve_references};
pub use tags::{normalize_tag, normalize_tags};
pub use text::{sanitize_title, select_abstract, summarize};

/// Normalization tables plus the heading patterns compiled from them.
#[derive(Debug, Clone)]
pub struct Normalizer {
    config: Arc<NormalizeConfig>,
    reference_heading: Regex,
    acknowledgment_heading: Regex,
}

impl Normalizer {
    pub fn new(config: Arc<NormalizeConfig>) -> Result<Self> {
        let reference_heading = references::heading_pattern(&config.reference_headings)?;
        let acknowledgment_heading = references::heading_pattern(&config.acknowledgment_headings)?;
        Ok(Self {
            config,
            reference_heading,
            acknowledgment_heading,
        })
    }

    pub fn config(&self) -> &NormalizeConfig {
        &self.config
    }

    pub fn title(&self, raw: &str) -> String {
        sanitize_title(raw)
    }

    pub fn summary(&self, html: &str) -> String {
        summarize(html, self.config.summary_length)
    }

    pub fn abstract_(&self, candidate: Option<&str>, summary: &str) -> Option<String> {
        select_abstract(candidate, summary, self.config.abstract_similarity)
    }

    pub fn reference_candidates(&self, html: &str) -> Vec<ReferenceCandidate> {
        references::reference_candidates(html, &self.reference_heading)
    }

    pub fn relationships(&self, html: &str) -> Vec<Relationship> {
        references::extract_relationships(
            html,
            &self.acknowledgment_heading,
            &self.config.relationship_keywords,
        )
    }

    pub fn images(&self, html: &str, base: &str) -> Vec<Image> {
        extract_images(html, base, &self.config.image_host_fixes)
    }

    pub fn feature_image(
        &self,
        media: Option<&str>,
        thumbnail: Option<&str>,
        images: &[Image],
    ) -> Option<String> {
        pick_feature_image(media, thumbnail, images, &self.config.boilerplate_images)
    }

    pub fn author(&self, name: &str, url: Option<&str>) -> Option<Author> {
        normalize_author(
            name,
            url,
            &self.config.author_aliases,
            &self.config.author_identifiers,
        )
    }

    pub fn tags<'a>(
        &self,
        categories: impl IntoIterator<Item = &'a str>,
        tags: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        normalize_tags(
            categories,
            tags,
            &self.config.tag_corrections,
            &self.config.excluded_tags,
        )
    }

    /// Language of the body, preferring a declared code.
    pub fn language(&self, declared: Option<&str>, html: &str) -> String {
        match declared.map(str::trim).filter(|l| !l.is_empty()) {
            Some(lang) => lang
                .split(['-', '_'])
                .next()
                .unwrap_or(lang)
                .to_ascii_lowercase(),
            None => detect_language(&strip_tags(html)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_language_is_trimmed_to_primary_subtag() {
        let n = Normalizer::new(Arc::new(NormalizeConfig::default())).unwrap();
        assert_eq!(n.language(Some("de-DE"), ""), "de");
        assert_eq!(n.language(Some("en_US"), ""), "en");
        assert_eq!(n.language(None, "<p></p>"), "en");
    }

    #[test]
    fn rejects_empty_heading_list() {
        let config = NormalizeConfig {
            reference_headings: Vec::new(),
            ..NormalizeConfig::default()
        };
        assert!(Normalizer::new(Arc::new(config)).is_err());
    }
}
