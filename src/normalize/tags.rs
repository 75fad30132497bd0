// src/normalize/tags.rs

//! Tag normalization.

use std::collections::HashMap;

/// Tags kept per post.
pub const MAX_TAGS: usize = 5;

/// Normalize one tag.
///
/// Known acronyms and phrases come from `corrections` (keyed lowercase);
/// anything else has each word's first letter upper-cased while interior
/// letters are kept as written.
pub fn normalize_tag(tag: &str, corrections: &HashMap<String, String>) -> String {
    let tag = tag.trim().trim_start_matches('#').trim();

    if let Some(fixed) = corrections.get(&tag.to_lowercase()) {
        return fixed.clone();
    }

    tag.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalize, filter and cap a post's tags, categories first.
pub fn normalize_tags<'a>(
    categories: impl IntoIterator<Item = &'a str>,
    tags: impl IntoIterator<Item = &'a str>,
    corrections: &HashMap<String, String>,
    excluded: &[String],
) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();

    for raw in categories.into_iter().chain(tags) {
        let tag = normalize_tag(raw, corrections);
        if tag.is_empty() || excluded.iter().any(|e| e.eq_ignore_ascii_case(&tag)) {
            continue;
        }
        if !result.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
            result.push(tag);
        }
        if result.len() == MAX_TAGS {
            break;
        }
    }
    result
}
