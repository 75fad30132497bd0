// src/normalize/text.rs

//! Title, summary and abstract normalization.

use std::sync::LazyLock;

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use super::html::{sanitize_inline, strip_tags, unescape_markup};

/// A word of three or more letters closing a sentence, followed by whitespace.
static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\w{3,}[.!?;])\s").expect("valid sentence regex"));

/// Shared prefix length compared when selecting an abstract.
const ABSTRACT_PREFIX: usize = 100;

/// Sanitize a post title.
pub fn sanitize_title(raw: &str) -> String {
    let html = unescape_markup(raw);
    let title = sanitize_inline(&html);
    strip_wrapping_strong(&title).to_string()
}

/// Whole-title `<strong>` adds nothing in a heading context.
fn strip_wrapping_strong(title: &str) -> &str {
    match title
        .strip_prefix("<strong>")
        .and_then(|t| t.strip_suffix("</strong>"))
    {
        Some(inner) if !inner.contains("<strong>") => inner.trim(),
        _ => title,
    }
}

/// Build a summary of at most `limit` characters ending at a sentence boundary.
pub fn summarize(html: &str, limit: usize) -> String {
    let text = sanitize_inline(&unescape_markup(html));
    if text.chars().count() <= limit {
        return text;
    }

    let boundaries: Vec<usize> = SENTENCE_END
        .captures_iter(&text)
        .filter_map(|caps| caps.get(1).map(|m| m.end()))
        .take_while(|&end| text[..end].chars().count() <= limit)
        .collect();

    // Re-parsing closes tags left open by the cut, which may add length.
    for &end in boundaries.iter().rev() {
        let candidate = sanitize_inline(&text[..end]);
        if candidate.chars().count() <= limit {
            return candidate;
        }
    }

    truncate_words(&strip_tags(&text), limit)
}

/// Cut plain text at a word boundary and mark the elision.
fn truncate_words(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let mut cut = String::new();
    let mut count = 0;
    for grapheme in text.graphemes(true) {
        let len = grapheme.chars().count();
        if count + len > limit.saturating_sub(1) {
            break;
        }
        cut.push_str(grapheme);
        count += len;
    }

    let cut = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}…", cut.trim_end())
}

/// Keep an abstract only when it differs enough from the summary.
pub fn select_abstract(abstract_: Option<&str>, summary: &str, threshold: f64) -> Option<String> {
    let abstract_ = sanitize_inline(abstract_?);
    if abstract_.is_empty() {
        return None;
    }

    let len = abstract_.chars().count().min(ABSTRACT_PREFIX);
    let a: String = abstract_.chars().take(len).collect();
    let b: String = summary.chars().take(len).collect();

    if strsim::normalized_levenshtein(&a, &b) > threshold {
        None
    } else {
        Some(abstract_)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_decodes_and_unwraps() {
        assert_eq!(
            sanitize_title("&lt;strong&gt;The <i>E. coli</i> genome&lt;/strong&gt;"),
            "The <i>E. coli</i> genome"
        );
        assert_eq!(sanitize_title("<h1>Big news</h1>"), "Big news");
        assert_eq!(
            sanitize_title(r#"<span style="x">CO<sub>2</sub><br/>levels</span>"#),
            "CO<sub>2</sub> levels"
        );
    }

    #[test]
    fn title_with_literal_entities_keeps_markup() {
        assert_eq!(
            sanitize_title("x &lt; y in <i>E. coli</i>"),
            "x &lt; y in <i>E. coli</i>"
        );
        assert_eq!(
            sanitize_title("&lt;em&gt;Mixed&lt;/em&gt; <sup>13</sup>C &amp; <b>more</b>"),
            "<em>Mixed</em> <sup>13</sup>C &amp; <b>more</b>"
        );
    }

    #[test]
    fn title_keeps_partial_strong() {
        assert_eq!(
            sanitize_title("<strong>New</strong> results"),
            "<strong>New</strong> results"
        );
    }

    #[test]
    fn short_summary_is_unchanged() {
        assert_eq!(summarize("<p>Short post.</p>", 450), "Short post.");
    }

    #[test]
    fn summary_ends_at_sentence_boundary() {
        let sentence = "This sentence describes the research findings in detail. ";
        let html = format!("<p>{}</p>", sentence.repeat(20));
        let summary = summarize(&html, 450);
        assert!(summary.chars().count() <= 450);
        assert!(summary.ends_with("detail."));
    }

    #[test]
    fn summary_rebalances_open_tags() {
        let body = format!(
            "<p><em>{}</em></p>",
            "Emphasized words keep going for a while. ".repeat(20)
        );
        let summary = summarize(&body, 450);
        assert!(summary.chars().count() <= 450);
        assert!(summary.starts_with("<em>"));
        assert!(summary.ends_with("while.</em>"));
    }

    #[test]
    fn summary_without_boundary_is_word_truncated() {
        let html = "word ".repeat(200);
        let summary = summarize(&html, 450);
        assert!(summary.chars().count() <= 450);
        assert!(summary.ends_with("word…"));
    }

    #[test]
    fn abstract_similar_to_summary_is_dropped() {
        let summary = "We measured the thermal conductivity of graphene sheets at room temperature.";
        assert_eq!(select_abstract(Some(summary), summary, 0.75), None);
    }

    #[test]
    fn distinct_abstract_is_kept() {
        let summary = "We measured the thermal conductivity of graphene sheets.";
        let abstract_ = "Funding agencies increasingly require open data policies for grantees.";
        assert_eq!(
            select_abstract(Some(abstract_), summary, 0.75).as_deref(),
            Some(abstract_)
        );
        assert_eq!(select_abstract(None, summary, 0.75), None);
    }
}
