// src/normalize/authors.rs

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Author;

static ORCID_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://orcid\.org/\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").expect("valid ORCID regex")
});

const TITLE_SUFFIXES: &[&str] = &[", MD", ", PhD", ", Ph.D.", ", M.D."];

/// Normalize an author's display name and identifier.
///
/// Returns `None` for a blank name.
pub fn normalize_author(
    name: &str,
    url: Option<&str>,
    aliases: &HashMap<String, String>,
    identifiers: &HashMap<String, String>,
) -> Option<Author> {
    let mut name = name.trim();
    for suffix in TITLE_SUFFIXES {
        if let Some(stripped) = name.strip_suffix(suffix) {
            name = stripped.trim_end();
        }
    }
    if name.is_empty() {
        return None;
    }

    let name = aliases
        .get(name)
        .cloned()
        .unwrap_or_else(|| name.to_string());

    let url = url
        .map(str::trim)
        .filter(|u| ORCID_URL.is_match(u))
        .map(|u| u.replacen("http://", "https://", 1))
        .or_else(|| identifiers.get(&name).cloned());

    Some(Author { name, url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_academic_suffix() {
        let author = normalize_author("Jane Doe, PhD", None, &HashMap::new(), &HashMap::new());
        assert_eq!(author, Some(Author::named("Jane Doe")));
    }

    #[test]
    fn alias_and_identifier_lookup() {
        let aliases = HashMap::from([("mfenner".to_string(), "Martin Fenner".to_string())]);
        let ids = HashMap::from([(
            "Martin Fenner".to_string(),
            "https://orcid.org/0000-0003-1419-2405".to_string(),
        )]);
        let author = normalize_author("mfenner", Some("https://blog.example/author"), &aliases, &ids)
            .unwrap();
        assert_eq!(author.name, "Martin Fenner");
        assert_eq!(
            author.url.as_deref(),
            Some("https://orcid.org/0000-0003-1419-2405")
        );
    }

    #[test]
    fn keeps_only_orcid_urls() {
        let kept = normalize_author(
            "A",
            Some("http://orcid.org/0000-0002-1825-009X"),
            &HashMap::new(),
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(
            kept.url.as_deref(),
            Some("https://orcid.org/0000-0002-1825-009X")
        );

        let dropped =
            normalize_author("A", Some("https://twitter.com/a"), &HashMap::new(), &HashMap::new())
                .unwrap();
        assert_eq!(dropped.url, None);
    }

    #[test]
    fn blank_name_is_none() {
        assert_eq!(normalize_author("  ", None, &HashMap::new(), &HashMap::new()), None);
    }
}
