// src/platforms/atom.rs

//! Atom feeds, including Blogger.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;

use super::xml::{self, XmlReader};
use super::{FeedPage, PostParts, RawPost};
use crate::error::{AppError, Result};
use crate::models::FeedMeta;

#[derive(Debug, Clone, Default)]
pub struct AtomLink {
    pub rel: Option<String>,
    pub href: String,
}

#[derive(Debug, Clone, Default)]
pub struct AtomAuthor {
    pub name: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AtomEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub links: Vec<AtomLink>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub authors: Vec<AtomAuthor>,
    /// HTML, decoded from `type="html"` or taken verbatim from `type="xhtml"`
    pub content: Option<String>,
    pub summary: Option<String>,
    /// Category terms
    pub categories: Vec<String>,
    /// `media:thumbnail` URLs
    pub thumbnails: Vec<String>,
}

pub fn parse(body: &str) -> Result<FeedPage> {
    let mut reader = Reader::from_str(body);
    let mut buf = Vec::new();
    let mut page = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"feed" => {
                let language = xml::attr(&e, "xml:lang")?;
                let mut feed = parse_feed(&mut reader)?;
                feed.meta.language = language;
                page = Some(feed);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    page.ok_or_else(|| AppError::validation("not an Atom document: no <feed>"))
}

fn parse_feed(reader: &mut XmlReader<'_>) -> Result<FeedPage> {
    let mut meta = FeedMeta::default();
    let mut links = Vec::new();
    let mut items = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if e.name().as_ref() == b"link" => links.push(read_link(&e)?),
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"title" => meta.title = read_html(reader, &e)?,
                    b"subtitle" => meta.description = read_html(reader, &e)?,
                    b"generator" => meta.generator = xml::read_optional(reader, name)?,
                    b"icon" => meta.favicon = xml::read_optional(reader, name)?,
                    b"link" => {
                        links.push(read_link(&e)?);
                        xml::skip(reader, name)?;
                    }
                    b"entry" => items.push(RawPost::Atom(parse_entry(reader)?)),
                    _ => xml::skip(reader, name)?,
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(xml::unexpected_eof(QName(b"feed"))),
            _ => {}
        }
        buf.clear();
    }

    meta.home_page_url = alternate_link(&links);
    Ok(FeedPage {
        items,
        meta,
        ..FeedPage::default()
    })
}

fn parse_entry(reader: &mut XmlReader<'_>) -> Result<AtomEntry> {
    let mut entry = AtomEntry::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) => entry.read_attributes(&e)?,
            Event::Start(e) => {
                entry.read_attributes(&e)?;
                entry.read_element(reader, &e)?;
            }
            Event::End(_) => break,
            Event::Eof => return Err(xml::unexpected_eof(QName(b"entry"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(entry)
}

fn parse_author(reader: &mut XmlReader<'_>) -> Result<AtomAuthor> {
    let mut author = AtomAuthor::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"name" => author.name = xml::read_optional(reader, name)?,
                    b"uri" => author.uri = xml::read_optional(reader, name)?,
                    _ => xml::skip(reader, name)?,
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(xml::unexpected_eof(QName(b"author"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(author)
}

fn read_link(e: &BytesStart<'_>) -> Result<AtomLink> {
    Ok(AtomLink {
        rel: xml::attr(e, "rel")?,
        href: xml::attr(e, "href")?.unwrap_or_default(),
    })
}

/// Text construct: `xhtml` keeps its inline markup, `html` and `text` are
/// decoded text.
fn read_html(reader: &mut XmlReader<'_>, e: &BytesStart<'_>) -> Result<Option<String>> {
    if xml::attr(e, "type")?.as_deref() == Some("xhtml") {
        let markup = xml::read_markup(reader, e.name())?;
        return Ok(Some(markup.trim().to_string()).filter(|m| !m.is_empty()));
    }
    xml::read_optional(reader, e.name())
}

/// `rel="alternate"` link; a link without `rel` is an alternate.
fn alternate_link(links: &[AtomLink]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|r| r == "alternate"))
        .map(|l| l.href.clone())
        .filter(|href| !href.is_empty())
}

impl AtomEntry {
    /// Elements that carry their value in attributes.
    fn read_attributes(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.name().as_ref() {
            b"link" => self.links.push(read_link(e)?),
            b"category" => self.categories.extend(xml::attr(e, "term")?),
            b"media:thumbnail" => self.thumbnails.extend(xml::attr(e, "url")?),
            _ => {}
        }
        Ok(())
    }

    /// Consume one child element up to its end tag.
    fn read_element(&mut self, reader: &mut XmlReader<'_>, e: &BytesStart<'_>) -> Result<()> {
        let name = e.name();
        match name.as_ref() {
            b"id" => self.id = xml::read_optional(reader, name)?,
            b"title" => self.title = read_html(reader, e)?,
            b"published" => self.published = xml::read_optional(reader, name)?,
            b"updated" => self.updated = xml::read_optional(reader, name)?,
            b"author" => self.authors.push(parse_author(reader)?),
            b"content" => self.content = read_html(reader, e)?,
            b"summary" => self.summary = read_html(reader, e)?,
            _ => xml::skip(reader, name)?,
        }
        Ok(())
    }

    pub fn parts(&self) -> PostParts {
        PostParts {
            guid: self.id.clone(),
            url: alternate_link(&self.links).unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
            content_html: self
                .content
                .clone()
                .or_else(|| self.summary.clone())
                .unwrap_or_default(),
            excerpt: self.content.as_ref().and(self.summary.clone()),
            published: self.published.clone().or_else(|| self.updated.clone()),
            updated: self.updated.clone(),
            authors: self
                .authors
                .iter()
                .filter_map(|a| a.name.clone().map(|n| (n, a.uri.clone())))
                .collect(),
            tags: self.categories.clone(),
            thumbnail: self.thumbnails.first().cloned(),
            ..PostParts::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::ReferenceTarget;
    use crate::platforms::tests::{blog, normalizer};

    pub(crate) const FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/" xml:lang="en">
  <title>Atom Blog</title>
  <subtitle>Notes on research</subtitle>
  <generator uri="https://gohugo.io/">Hugo</generator>
  <link rel="self" href="https://atom.example/atom.xml"/>
  <link rel="alternate" href="https://atom.example/"/>
  <entry>
    <id>https://doi.org/10.59350/ATOM-1</id>
    <title type="html">Citations &amp;lt;i&amp;gt;matter&amp;lt;/i&amp;gt;</title>
    <link rel="alternate" href="https://atom.example/posts/citations/"/>
    <published>2024-06-01T08:00:00Z</published>
    <updated>2024-06-02T08:00:00Z</updated>
    <author><name>Ada Atom</name><uri>https://orcid.org/0000-0001-5109-3700</uri></author>
    <category term="citations"/>
    <content type="html">&lt;p&gt;Why citing matters for research.&lt;/p&gt;
&lt;h2&gt;References&lt;/h2&gt;
&lt;p&gt;&lt;a href="https://doi.org/10.5555/first"&gt;First&lt;/a&gt;&lt;/p&gt;
&lt;p&gt;&lt;a href="https://doi.org/10.5555/second"&gt;Second&lt;/a&gt;&lt;/p&gt;</content>
    <media:thumbnail url="https://atom.example/thumb.png"/>
  </entry>
</feed>"#;

    #[test]
    fn reads_feed_meta() {
        let page = parse(FEED).unwrap();
        assert_eq!(page.meta.title.as_deref(), Some("Atom Blog"));
        assert_eq!(page.meta.generator.as_deref(), Some("Hugo"));
        assert_eq!(page.meta.home_page_url.as_deref(), Some("https://atom.example/"));
        assert_eq!(page.meta.language.as_deref(), Some("en"));
    }

    #[test]
    fn escaped_content_yields_two_doi_references() {
        let page = parse(FEED).unwrap();
        let draft = page.items[0].extract(&blog(), &normalizer()).unwrap();

        let keys: Vec<&str> = draft.references.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["ref1", "ref2"]);
        assert_eq!(
            draft.references[1].target,
            ReferenceTarget::Doi("10.5555/second".into())
        );
    }

    #[test]
    fn xhtml_content_keeps_markup() {
        let feed = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>tag:atom.example,2024:2</id>
    <title type="text">Plain &amp; simple</title>
    <link href="https://atom.example/posts/plain/"/>
    <updated>2024-06-03T08:00:00Z</updated>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Inline <em>markup</em> survives.</p></div></content>
    <category term="methods"></category>
  </entry>
</feed>"#;
        let page = parse(feed).unwrap();
        assert!(page.meta.language.is_none());

        let RawPost::Atom(entry) = &page.items[0] else {
            panic!("expected an Atom entry");
        };
        assert_eq!(entry.title.as_deref(), Some("Plain & simple"));
        assert!(entry.content.as_deref().unwrap().contains("<em>markup</em>"));
        assert_eq!(entry.categories, vec!["methods"]);
        assert_eq!(entry.links[0].href, "https://atom.example/posts/plain/");
        assert_eq!(entry.published, None);
        assert_eq!(page.items[0].modified_at(), Some(1_717_401_600));
    }

    #[test]
    fn truncated_feed_is_an_error() {
        assert!(parse("<feed><entry><title>cut").is_err());
        assert!(parse("<html><body>not a feed</body></html>").is_err());
    }

    #[test]
    fn maps_entry_fields() {
        let page = parse(FEED).unwrap();
        let post = page.items[0].extract(&blog(), &normalizer()).unwrap().post;

        assert_eq!(post.url, "https://atom.example/posts/citations/");
        assert_eq!(post.doi.as_deref(), Some("https://doi.org/10.59350/atom-1"));
        assert_eq!(post.title, "Citations <i>matter</i>");
        assert_eq!(post.authors[0].name, "Ada Atom");
        assert_eq!(post.image.as_deref(), Some("https://atom.example/thumb.png"));
        assert_eq!(post.tags, vec!["Citations"]);
        assert_eq!(page.items[0].modified_at(), Some(1_717_315_200));
    }
}
