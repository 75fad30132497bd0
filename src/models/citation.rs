// src/models/citation.rs

//! Forward-citation record keyed by the cited/citing DOI pair.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::utils::doi::normalize_doi;

/// Work X (citing) cites post Y (cited).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// `{cited}::{citing}`, both normalized
    pub cid: String,
    pub doi: String,
    pub citation: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unstructured: Option<String>,

    /// `YYYY-MM-DD`, `YYYY-MM` or `YYYY` of the citing work
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,

    /// CSL type of the citing work, e.g. `journal-article`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blog_slug: Option<String>,

    /// Unix seconds of the last harvest that saw this citation
    pub updated_at: i64,
}

/// Composite identity of a citation.
///
/// Inputs may be bare DOIs or resolver URLs in any case; the result is the
/// same for every spelling of the same pair.
pub fn cid(cited: &str, citing: &str) -> Result<String> {
    let cited = normalize_doi(cited)
        .ok_or_else(|| AppError::validation(format!("invalid cited DOI: {cited}")))?;
    let citing = normalize_doi(citing)
        .ok_or_else(|| AppError::validation(format!("invalid citing DOI: {citing}")))?;
    Ok(format!("{cited}::{citing}"))
}

impl Citation {
    /// Build a citation with normalized DOIs and empty metadata.
    pub fn new(cited: &str, citing: &str, updated_at: i64) -> Result<Self> {
        let cid = cid(cited, citing)?;
        let (doi, citation) = cid
            .split_once("::")
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .ok_or_else(|| AppError::validation(format!("malformed cid {cid}")))?;

        Ok(Self {
            cid,
            doi,
            citation,
            unstructured: None,
            published_at: None,
            kind: None,
            blog_slug: None,
            updated_at,
        })
    }
}
