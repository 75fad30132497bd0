// src/services/crossref.rs

//! Forward-citation graph from the registration agency.

use serde::Deserialize;

use super::Fetch;
use crate::error::{AppError, Result};
use crate::models::CrossrefConfig;

/// Element text, ignoring attributes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct XmlText {
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrossrefResult {
    #[serde(default)]
    pub query_result: Option<QueryResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub body: Option<ResultBody>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultBody {
    #[serde(rename = "forward_link", default)]
    pub links: Vec<ForwardLink>,
}

/// One citing work of a DOI under the queried prefix.
#[derive(Debug, Clone, Deserialize)]
pub struct ForwardLink {
    /// The cited DOI
    #[serde(rename = "@doi", default)]
    pub doi: String,
    #[serde(default)]
    pub journal_cite: Option<Cite>,
    #[serde(default)]
    pub book_cite: Option<Cite>,
    #[serde(default)]
    pub postedcontent_cite: Option<Cite>,
    #[serde(default)]
    pub conf_cite: Option<Cite>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Cite {
    #[serde(default)]
    pub doi: Option<XmlText>,
}

impl ForwardLink {
    /// DOI of the citing work, from whichever content type is present.
    pub fn citing_doi(&self) -> Option<String> {
        [
            &self.journal_cite,
            &self.book_cite,
            &self.postedcontent_cite,
            &self.conf_cite,
        ]
        .into_iter()
        .flatten()
        .filter_map(|cite| cite.doi.as_ref())
        .map(|doi| doi.value.trim().to_string())
        .find(|doi| !doi.is_empty())
    }

    /// The cited DOI, if present.
    pub fn cited_doi(&self) -> Option<String> {
        Some(self.doi.trim().to_string()).filter(|doi| !doi.is_empty())
    }
}

/// Parse a `getForwardLinks` response.
pub fn parse_forward_links(body: &str) -> Result<Vec<ForwardLink>> {
    let result: CrossrefResult = quick_xml::de::from_str(body)?;
    Ok(result
        .query_result
        .and_then(|q| q.body)
        .map(|b| b.links)
        .unwrap_or_default())
}

/// Fetch the forward links of every DOI under `prefix`.
pub async fn fetch_forward_links(
    fetcher: &dyn Fetch,
    config: &CrossrefConfig,
    prefix: &str,
    timeout: std::time::Duration,
) -> Result<Vec<ForwardLink>> {
    let (username, password) = config
        .credentials()
        .ok_or_else(|| AppError::config("registry credentials are not configured"))?;
    let query = vec![
        ("usr".to_string(), username.to_string()),
        ("pwd".to_string(), password.to_string()),
        ("doi".to_string(), prefix.to_string()),
    ];
    let body = fetcher.get_text(&config.endpoint, &query, timeout).await?;
    parse_forward_links(&body)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<crossref_result xmlns="http://www.crossref.org/qrschema/2.0" version="2.0">
  <query_result>
    <head><doi_batch_id>none</doi_batch_id></head>
    <body>
      <forward_link doi="10.59350/ABC-1">
        <journal_cite fl_count="0">
          <journal_title>Journal of Examples</journal_title>
          <article_title>Citing the blog</article_title>
          <contributors><contributor first-author="true"><surname>Doe</surname></contributor></contributors>
          <year>2024</year>
          <doi type="journal_article">10.1234/JOURNAL.1</doi>
        </journal_cite>
      </forward_link>
      <forward_link doi="10.59350/abc-2">
        <postedcontent_cite>
          <title>A preprint</title>
          <doi type="posted_content">10.31219/osf.io/xyz</doi>
        </postedcontent_cite>
      </forward_link>
      <forward_link doi="10.59350/abc-3">
        <book_cite><volume_title>No DOI here</volume_title></book_cite>
      </forward_link>
    </body>
  </query_result>
</crossref_result>"#;

    #[test]
    fn reads_citing_doi_from_any_content_type() {
        let links = parse_forward_links(RESPONSE).unwrap();
        assert_eq!(links.len(), 3);
        assert_eq!(links[0].cited_doi().as_deref(), Some("10.59350/ABC-1"));
        assert_eq!(links[0].citing_doi().as_deref(), Some("10.1234/JOURNAL.1"));
        assert_eq!(links[1].citing_doi().as_deref(), Some("10.31219/osf.io/xyz"));
        assert_eq!(links[2].citing_doi(), None);
    }

    #[test]
    fn empty_body_yields_no_links() {
        let body = r#"<crossref_result><query_result><body/></query_result></crossref_result>"#;
        assert!(parse_forward_links(body).unwrap().is_empty());
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_forward_links("<crossref_result><query_result><body><forward_link doi=\"x\">").is_err());
    }
}
