// src/platforms/xml.rs

//! Event-reader helpers shared by the RSS and Atom parsers.
//!
//! Element names are matched on the raw qualified name, so namespaced
//! elements read as `dc:creator` or `media:thumbnail`.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;

use crate::error::{AppError, Result};

pub type XmlReader<'a> = Reader<&'a [u8]>;

/// Text and CDATA up to the end of the element just opened.
///
/// Nested elements contribute their text. The result is trimmed.
pub fn read_text(reader: &mut XmlReader<'_>, name: QName<'_>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(e) => text.push_str(&e.unescape()?),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(&e)),
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => break,
            Event::End(_) => depth -= 1,
            Event::Eof => return Err(unexpected_eof(name)),
            _ => {}
        }
        buf.clear();
    }

    Ok(text.trim().to_string())
}

/// Like [`read_text`], but `None` when the element is empty.
pub fn read_optional(reader: &mut XmlReader<'_>, name: QName<'_>) -> Result<Option<String>> {
    read_text(reader, name).map(|text| Some(text).filter(|t| !t.is_empty()))
}

/// Inner markup of the element just opened, unparsed.
pub fn read_markup<'a>(reader: &mut XmlReader<'a>, name: QName<'_>) -> Result<Cow<'a, str>> {
    Ok(reader.read_text(name)?)
}

/// Skip past the end of the element just opened.
pub fn skip(reader: &mut XmlReader<'_>, name: QName<'_>) -> Result<()> {
    let mut buf = Vec::new();
    reader.read_to_end_into(name, &mut buf)?;
    Ok(())
}

/// Unescaped, trimmed attribute value.
pub fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    let Some(attribute) = e
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
    else {
        return Ok(None);
    };
    let value = attribute.unescape_value()?;
    Ok(Some(value.trim().to_string()).filter(|v| !v.is_empty()))
}

pub fn unexpected_eof(name: QName<'_>) -> AppError {
    AppError::validation(format!(
        "document ended inside <{}>",
        String::from_utf8_lossy(name.as_ref())
    ))
}
