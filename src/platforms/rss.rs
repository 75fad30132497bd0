// src/platforms/rss.rs

//! RSS 2.0 feeds.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;

use super::xml::{self, XmlReader};
use super::{FeedPage, PostParts, RawPost};
use crate::error::{AppError, Result};
use crate::models::FeedMeta;

#[derive(Debug, Clone, Default)]
pub struct Enclosure {
    pub url: String,
    pub mime: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<String>,
    pub pub_date: Option<String>,
    /// Teaser, or the whole body when there is no `content:encoded`
    pub description: Option<String>,
    /// `content:encoded`
    pub content: Option<String>,
    /// `dc:creator`
    pub creators: Vec<String>,
    pub categories: Vec<String>,
    pub enclosure: Option<Enclosure>,
    /// `media:content` URLs
    pub media: Vec<String>,
    /// `media:thumbnail` URLs
    pub thumbnails: Vec<String>,
}

pub fn parse(body: &str) -> Result<FeedPage> {
    let mut reader = Reader::from_str(body);
    let mut buf = Vec::new();
    let mut page = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"channel" => {
                page = Some(parse_channel(&mut reader)?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    page.ok_or_else(|| AppError::validation("not an RSS document: no <channel>"))
}

fn parse_channel(reader: &mut XmlReader<'_>) -> Result<FeedPage> {
    let mut page = FeedPage::default();
    let meta = &mut page.meta;
    let mut items = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = e.name();
                match name.as_ref() {
                    b"title" => meta.title = xml::read_optional(reader, name)?,
                    b"link" => meta.home_page_url = xml::read_optional(reader, name)?,
                    b"description" => meta.description = xml::read_optional(reader, name)?,
                    b"language" => meta.language = xml::read_optional(reader, name)?,
                    b"generator" => meta.generator = xml::read_optional(reader, name)?,
                    b"image" => meta.favicon = parse_image(reader)?,
                    b"item" => items.push(RawPost::Rss(parse_item(reader)?)),
                    _ => xml::skip(reader, name)?,
                }
            }
            Event::End(_) => break,
            Event::Eof => return Err(xml::unexpected_eof(QName(b"channel"))),
            _ => {}
        }
        buf.clear();
    }

    page.items = items;
    Ok(page)
}

/// `<image><url>` of the channel.
fn parse_image(reader: &mut XmlReader<'_>) -> Result<Option<String>> {
    let mut url = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"url" => {
                url = xml::read_optional(reader, e.name())?;
            }
            Event::Start(e) => xml::skip(reader, e.name())?,
            Event::End(_) => break,
            Event::Eof => return Err(xml::unexpected_eof(QName(b"image"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(url)
}

fn parse_item(reader: &mut XmlReader<'_>) -> Result<RssItem> {
    let mut item = RssItem::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) => item.read_attributes(&e)?,
            Event::Start(e) => {
                item.read_attributes(&e)?;
                item.read_element(reader, e.name())?;
            }
            Event::End(_) => break,
            Event::Eof => return Err(xml::unexpected_eof(QName(b"item"))),
            _ => {}
        }
        buf.clear();
    }

    Ok(item)
}

impl RssItem {
    /// Elements that carry their value in attributes.
    fn read_attributes(&mut self, e: &BytesStart<'_>) -> Result<()> {
        match e.name().as_ref() {
            b"enclosure" => {
                if let Some(url) = xml::attr(e, "url")? {
                    self.enclosure = Some(Enclosure {
                        url,
                        mime: xml::attr(e, "type")?,
                    });
                }
            }
            b"media:content" => self.media.extend(xml::attr(e, "url")?),
            b"media:thumbnail" => self.thumbnails.extend(xml::attr(e, "url")?),
            _ => {}
        }
        Ok(())
    }

    /// Consume one child element up to its end tag.
    fn read_element(&mut self, reader: &mut XmlReader<'_>, name: QName<'_>) -> Result<()> {
        match name.as_ref() {
            b"title" => self.title = xml::read_optional(reader, name)?,
            b"link" => self.link = xml::read_optional(reader, name)?,
            b"guid" => self.guid = xml::read_optional(reader, name)?,
            b"pubDate" => self.pub_date = xml::read_optional(reader, name)?,
            b"dc:date" => {
                let date = xml::read_optional(reader, name)?;
                if self.pub_date.is_none() {
                    self.pub_date = date;
                }
            }
            b"description" => self.description = xml::read_optional(reader, name)?,
            b"content:encoded" => self.content = xml::read_optional(reader, name)?,
            b"dc:creator" => self.creators.extend(xml::read_optional(reader, name)?),
            b"category" => self.categories.extend(xml::read_optional(reader, name)?),
            _ => xml::skip(reader, name)?,
        }
        Ok(())
    }
}

impl RssItem {
    pub fn parts(&self) -> PostParts {
        let enclosure_image = self
            .enclosure
            .as_ref()
            .filter(|e| e.mime.as_deref().is_some_and(|m| m.starts_with("image/")))
            .map(|e| e.url.clone());

        PostParts {
            guid: self.guid.clone(),
            url: self.link.clone().unwrap_or_default(),
            title: self.title.clone().unwrap_or_default(),
            excerpt: self.content.as_ref().and(self.description.clone()),
            content_html: self
                .content
                .clone()
                .or_else(|| self.description.clone())
                .unwrap_or_default(),
            published: self.pub_date.clone(),
            updated: self.pub_date.clone(),
            authors: self.creators.iter().map(|c| (c.clone(), None)).collect(),
            categories: self.categories.clone(),
            media_image: self.media.first().cloned().or(enclosure_image),
            thumbnail: self.thumbnails.first().cloned(),
            ..PostParts::default()
        }
    }
}
