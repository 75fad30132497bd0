// src/normalize/html.rs

//! Allow-list HTML sanitizing shared by the title and summary normalizers.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node};

/// Inline tags kept in titles and summaries; everything else is unwrapped.
const ALLOWED_TAGS: &[&str] = &["b", "i", "em", "strong", "sub", "sup"];

/// Block tags that collapse to a single space.
const SPACE_TAGS: &[&str] = &["br", "p", "div", "li", "ul", "ol", "blockquote", "figure"];

/// Elements without an end tag.
const VOID_TAGS: &[&str] = &[
    "area", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

/// A whole tag as it reads after entity decoding, e.g. `</i>` or `<a href="x">`.
static DECODED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").expect("valid decoded tag regex")
});

/// Content that never contributes text.
const DROPPED_TAGS: &[&str] = &["script", "style", "figcaption", "noscript", "iframe"];

/// Sanitize a fragment down to the inline allow-list.
///
/// Headings are promoted to `<strong>`, line-level blocks become spaces and
/// attributes are dropped. Whitespace is collapsed.
pub fn sanitize_inline(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_children(fragment.root_element(), &mut out);
    collapse_whitespace(&out)
}

/// Decode entity-escaped markup (`&lt;b&gt;`) into real markup.
///
/// Elements already present are kept. Only decoded text that forms a whole
/// tag becomes markup; a lone `&lt;` stays escaped.
pub fn unescape_markup(html: &str) -> String {
    if !html.contains("&lt;") {
        return html.to_string();
    }
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len());
    write_markup(fragment.root_element(), &mut out);
    out
}

fn write_markup(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => write_decoded_text(text, out),
            Node::Element(e) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                out.push('<');
                out.push_str(e.name());
                for (name, value) in e.attrs() {
                    out.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
                }
                out.push('>');
                if !VOID_TAGS.contains(&e.name()) {
                    write_markup(child, out);
                    out.push_str("</");
                    out.push_str(e.name());
                    out.push('>');
                }
            }
            _ => {}
        }
    }
}

fn write_decoded_text(text: &str, out: &mut String) {
    let mut last = 0;
    for tag in DECODED_TAG.find_iter(text) {
        out.push_str(&escape_text(&text[last..tag.start()]));
        out.push_str(tag.as_str());
        last = tag.end();
    }
    out.push_str(&escape_text(&text[last..]));
}

/// Plain text of a fragment with whitespace collapsed.
pub fn strip_tags(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::new();
    for node in fragment.root_element().descendants() {
        match node.value() {
            Node::Text(text) => {
                let inside_dropped = node.ancestors().any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| DROPPED_TAGS.contains(&e.name()))
                });
                if !inside_dropped {
                    out.push_str(text);
                }
            }
            Node::Element(e) if SPACE_TAGS.contains(&e.name()) || is_heading(e.name()) => {
                out.push(' ');
            }
            _ => {}
        }
    }
    collapse_whitespace(&out)
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape text for inclusion in HTML.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

fn is_heading(name: &str) -> bool {
    matches!(name, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_text(text)),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();

    if DROPPED_TAGS.contains(&name) {
        return;
    }
    if SPACE_TAGS.contains(&name) {
        out.push(' ');
        write_children(element, out);
        out.push(' ');
        return;
    }

    let tag = if is_heading(name) {
        Some("strong")
    } else {
        ALLOWED_TAGS.iter().copied().find(|t| *t == name)
    };

    match tag {
        Some(tag) => {
            out.push('<');
            out.push_str(tag);
            out.push('>');
            write_children(element, out);
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
        None => write_children(element, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_allowed_inline_tags() {
        assert_eq!(
            sanitize_inline(r#"<span class="x">Gene <i>BRCA1</i> and <a href="/y">H<sub>2</sub>O</a></span>"#),
            "Gene <i>BRCA1</i> and H<sub>2</sub>O"
        );
    }

    #[test]
    fn headings_become_strong_and_blocks_spaces() {
        assert_eq!(
            sanitize_inline("<h2>Intro</h2><p>First</p><p>Second<br>line</p>"),
            "<strong>Intro</strong> First Second line"
        );
    }

    #[test]
    fn scripts_are_dropped() {
        assert_eq!(sanitize_inline("a<script>alert(1)</script>b"), "ab");
    }

    #[test]
    fn unescape_markup_decodes_entities() {
        assert_eq!(unescape_markup("&lt;i&gt;Nature&lt;/i&gt;"), "<i>Nature</i>");
        assert_eq!(unescape_markup("plain"), "plain");
    }

    #[test]
    fn unescape_markup_keeps_existing_elements() {
        assert_eq!(
            unescape_markup("x &lt; y in <i>E. coli</i>"),
            "x &lt; y in <i>E. coli</i>"
        );
        assert_eq!(
            unescape_markup("&lt;b&gt;CO<sub>2</sub>&lt;/b&gt; and a<br>line"),
            "<b>CO<sub>2</sub></b> and a<br>line"
        );
    }

    #[test]
    fn strip_tags_spaces_blocks() {
        assert_eq!(strip_tags("<p>One</p><p>Two <b>three</b></p>"), "One Two three");
    }

    #[test]
    fn text_is_reescaped() {
        assert_eq!(sanitize_inline("a &lt; b &amp; c"), "a &lt; b &amp; c");
    }
}
