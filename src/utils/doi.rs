// src/utils/doi.rs

//! DOI parsing and normalization.

use std::sync::LazyLock;

use regex::Regex;

static DOI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(10\.\d{4,9}(?:\.\d+)*/[-._;()/:A-Z0-9]+)").expect("valid DOI regex")
});

/// Extract the bare `10.prefix/suffix` form from any DOI notation.
///
/// Accepts `doi:` and `urn:doi:` prefixes as well as `doi.org` and
/// `dx.doi.org` URLs over either scheme. Returns `None` when no DOI is found.
pub fn validate_doi(input: &str) -> Option<String> {
    let mut s = input.trim();

    for prefix in ["doi:", "DOI:", "urn:doi:", "URN:DOI:"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.trim_start();
        }
    }

    if let Some(idx) = s.find(['?', '#']) {
        s = &s[..idx];
    }

    let doi = DOI_RE.captures(s)?.get(1)?.as_str();
    let doi = doi.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | ')' | ']'));
    Some(doi.to_string())
}

/// Canonical lower-cased `https://doi.org/...` form used as a storage key.
pub fn normalize_doi(input: &str) -> Option<String> {
    validate_doi(input).map(|doi| doi_as_url(&doi.to_lowercase()))
}

/// Resolver URL for a bare DOI.
pub fn doi_as_url(doi: &str) -> String {
    format!("https://doi.org/{doi}")
}

/// Whether a link points at the DOI resolver.
pub fn is_doi_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    ["https://doi.org/", "http://doi.org/", "https://dx.doi.org/", "http://dx.doi.org/"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
        && validate_doi(url).is_some()
}

/// DOI prefix (`10.59350`) of a bare or URL-form DOI.
pub fn doi_prefix(input: &str) -> Option<String> {
    validate_doi(input).and_then(|doi| doi.split_once('/').map(|(p, _)| p.to_string()))
}
