// src/pipeline/citations.rs

//! Citation harvesting per tracked DOI prefix.

use std::sync::Arc;

use futures::future;
use futures::stream::{self, StreamExt};

use crate::context::AppContext;
use crate::error::Result;
use crate::models::{Citation, Config, HarvestReport};
use crate::services::{Fetch, ForwardLink, MetadataResolver, fetch_forward_links};
use crate::storage::PostStore;
use crate::utils::doi::normalize_doi;
use crate::utils::time::now;

const CITATION_STYLE: &str = "apa";
const CITATION_LOCALE: &str = "en-US";

/// Citations and counters of one prefix.
#[derive(Debug, Default)]
pub struct PrefixHarvest {
    pub citations: Vec<Citation>,
    pub report: HarvestReport,
}

/// Pulls forward citations from the registry and stores them.
pub struct CitationHarvester {
    config: Arc<Config>,
    store: Arc<dyn PostStore>,
    fetcher: Arc<dyn Fetch>,
    resolver: Arc<dyn MetadataResolver>,
}

impl CitationHarvester {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn PostStore>,
        fetcher: Arc<dyn Fetch>,
        resolver: Arc<dyn MetadataResolver>,
    ) -> Self {
        Self {
            config,
            store,
            fetcher,
            resolver,
        }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(
            Arc::clone(&ctx.config),
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.fetcher),
            Arc::clone(&ctx.resolver),
        )
    }

    /// Harvest every configured prefix concurrently.
    ///
    /// Without registry credentials nothing is harvested.
    pub async fn harvest_all_citations(&self) -> Result<Vec<HarvestReport>> {
        if self.config.crossref.credentials().is_none() {
            log::info!("Registry credentials not configured; skipping citation harvest");
            return Ok(Vec::new());
        }

        let prefixes = &self.config.crossref.prefixes;
        let results = future::join_all(
            prefixes
                .iter()
                .map(|prefix| async move { (prefix, self.harvest_prefix(prefix).await) }),
        )
        .await;

        let mut reports = Vec::with_capacity(results.len());
        let mut fatal = None;
        for (prefix, result) in results {
            match result {
                Ok(harvest) => reports.push(harvest.report),
                Err(e) => {
                    log::error!("{}: harvest aborted: {}", prefix, e);
                    fatal.get_or_insert(e);
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(reports),
        }
    }

    /// Harvest and store the citations of one prefix.
    pub async fn harvest_citations_for_prefix(&self, prefix: &str) -> Result<Vec<Citation>> {
        if self.config.crossref.credentials().is_none() {
            log::info!("Registry credentials not configured; skipping {}", prefix);
            return Ok(Vec::new());
        }
        Ok(self.harvest_prefix(prefix).await?.citations)
    }

    /// Fetch failures yield an empty harvest; storage failures are errors.
    pub async fn harvest_prefix(&self, prefix: &str) -> Result<PrefixHarvest> {
        let mut report = HarvestReport::new(prefix);

        let links = match fetch_forward_links(
            self.fetcher.as_ref(),
            &self.config.crossref,
            prefix,
            self.config.http.feed_timeout(),
        )
        .await
        {
            Ok(links) => links,
            Err(e) => {
                log::warn!("{}: citation graph unavailable: {}", prefix, e);
                report.record_error(e);
                return Ok(PrefixHarvest {
                    citations: Vec::new(),
                    report,
                });
            }
        };
        report.received = links.len();

        let stamp = now();
        let mut pending = Vec::with_capacity(links.len());
        for link in &links {
            match self.citation_for(link, stamp) {
                Some(citation) => pending.push(citation),
                None => report.dropped += 1,
            }
        }

        let enriched: Vec<Citation> = stream::iter(pending)
            .map(|citation| self.enrich(citation))
            .buffered(self.config.http.max_concurrent.max(1))
            .collect()
            .await;

        let mut citations = Vec::with_capacity(enriched.len());
        for mut citation in enriched {
            citation.blog_slug = self.store.find_blog_slug_by_doi(&citation.doi).await?;
            self.store.upsert_citation(&citation).await?;
            report.stored += 1;
            citations.push(citation);
        }

        log::info!("{}", report);
        Ok(PrefixHarvest { citations, report })
    }

    /// Pair the cited and citing DOI of a link; `None` if either is missing.
    fn citation_for(&self, link: &ForwardLink, stamp: i64) -> Option<Citation> {
        let cited = self.redirect(&link.cited_doi()?);
        let citing = link.citing_doi()?;
        match Citation::new(&cited, &citing, stamp) {
            Ok(citation) => Some(citation),
            Err(e) => {
                log::debug!("Dropping citation {} -> {}: {}", citing, cited, e);
                None
            }
        }
    }

    /// Follow the redirect table for DOIs that have been reassigned.
    fn redirect(&self, doi: &str) -> String {
        let Some(normalized) = normalize_doi(doi) else {
            return doi.to_string();
        };
        self.config
            .crossref
            .doi_redirects
            .iter()
            .find(|(from, _)| normalize_doi(from).as_deref() == Some(normalized.as_str()))
            .map(|(_, to)| to.clone())
            .unwrap_or_else(|| doi.to_string())
    }

    /// Add the formatted citation, date and work type of the citing DOI.
    ///
    /// Metadata failures leave the fields empty.
    async fn enrich(&self, mut citation: Citation) -> Citation {
        match self
            .resolver
            .bibliography(&citation.citation, CITATION_STYLE, CITATION_LOCALE)
            .await
        {
            Ok(text) if !text.is_empty() => citation.unstructured = Some(text),
            Ok(_) => {}
            Err(e) => log::debug!("No bibliography for {}: {}", citation.citation, e),
        }

        match self.resolver.csl(&citation.citation).await {
            Ok(csl) => {
                citation.published_at = csl_date(&csl);
                citation.kind = csl
                    .get("type")
                    .and_then(|t| t.as_str())
                    .map(str::to_string);
            }
            Err(e) => log::debug!("No metadata for {}: {}", citation.citation, e),
        }
        citation
    }
}

/// `YYYY-MM-DD`, `YYYY-MM` or `YYYY` from a CSL `issued` date.
pub fn csl_date(csl: &serde_json::Value) -> Option<String> {
    let parts = csl.pointer("/issued/date-parts/0")?.as_array()?;
    let numbers: Vec<i64> = parts.iter().map_while(|p| p.as_i64()).collect();
    match numbers.as_slice() {
        [year] => Some(format!("{year:04}")),
        [year, month] => Some(format!("{year:04}-{month:02}")),
        [year, month, day, ..] => Some(format!("{year:04}-{month:02}-{day:02}")),
        [] => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlogConfig, CanonicalPost};
    use crate::services::testing::{StubFetcher, StubResolver};
    use crate::storage::MemoryStore;

    const ENDPOINT: &str = "https://doi.crossref.org/servlet/getForwardLinks";

    const RESPONSE: &str = r#"<crossref_result xmlns="http://www.crossref.org/qrschema/2.0">
  <query_result><body>
    <forward_link doi="10.59350/OLD-1">
      <journal_cite><doi type="journal_article">10.1234/JOURNAL.1</doi></journal_cite>
    </forward_link>
    <forward_link doi="10.59350/abc-2">
      <conf_cite><doi type="conference_paper">10.1145/conf.2</doi></conf_cite>
    </forward_link>
    <forward_link doi="10.59350/abc-3">
      <book_cite><volume_title>No DOI</volume_title></book_cite>
    </forward_link>
  </body></query_result>
</crossref_result>"#;

    fn config(with_credentials: bool) -> Arc<Config> {
        let mut config = Config::default();
        config.crossref.prefixes = vec!["10.59350".into(), "10.99999".into()];
        config
            .crossref
            .doi_redirects
            .insert("10.59350/old-1".into(), "10.59350/new-1".into());
        if with_credentials {
            config.crossref.username = Some("user".into());
            config.crossref.password = Some("secret".into());
        }
        Arc::new(config)
    }

    async fn store_with_post() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new().with_blog(BlogConfig {
            slug: "front-matter".into(),
            ..Default::default()
        }));
        let post = CanonicalPost {
            guid: "g".into(),
            doi: Some("https://doi.org/10.59350/new-1".into()),
            blog_slug: "front-matter".into(),
            ..Default::default()
        };
        store.upsert_post(&post).await.unwrap();
        store
    }

    fn harvester(
        config: Arc<Config>,
        store: &Arc<MemoryStore>,
        fetcher: &Arc<StubFetcher>,
        resolver: StubResolver,
    ) -> CitationHarvester {
        CitationHarvester::new(config, store.clone(), fetcher.clone(), Arc::new(resolver))
    }

    #[tokio::test]
    async fn missing_credentials_short_circuit() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = Arc::new(StubFetcher::default().with_page(ENDPOINT, RESPONSE));
        let harvester = harvester(config(false), &store, &fetcher, StubResolver::default());

        assert!(harvester.harvest_all_citations().await.unwrap().is_empty());
        assert!(harvester.harvest_citations_for_prefix("10.59350").await.unwrap().is_empty());
        assert!(fetcher.request_log().is_empty());
    }

    #[tokio::test]
    async fn harvests_redirects_and_enriches() {
        let store = store_with_post().await;
        let fetcher = Arc::new(StubFetcher::default().with_page(ENDPOINT, RESPONSE));
        let resolver = StubResolver::with_title("10.1234/journal.1", "Citing paper", 2024)
            .with_bibliography("10.1234/journal.1", "Doe, J. (2024). Citing paper.");
        let harvester = harvester(config(true), &store, &fetcher, resolver);

        let citations = harvester.harvest_citations_for_prefix("10.59350").await.unwrap();
        assert_eq!(citations.len(), 2);

        let first = &citations[0];
        assert_eq!(
            first.cid,
            "https://doi.org/10.59350/new-1::https://doi.org/10.1234/journal.1"
        );
        assert_eq!(first.blog_slug.as_deref(), Some("front-matter"));
        assert_eq!(first.unstructured.as_deref(), Some("Doe, J. (2024). Citing paper."));
        assert_eq!(first.published_at.as_deref(), Some("2024-03-14"));
        assert_eq!(first.kind.as_deref(), Some("journal-article"));

        let second = &citations[1];
        assert_eq!(second.blog_slug, None);
        assert_eq!(second.unstructured, None);
        assert_eq!(second.kind, None);

        assert_eq!(store.citations().await.len(), 2);
        assert_eq!(
            fetcher.request_log(),
            vec![format!("{ENDPOINT}?usr=user&pwd=secret&doi=10.59350")]
        );
    }

    #[tokio::test]
    async fn failed_prefix_does_not_abort_others() {
        let store = store_with_post().await;
        // every prefix hits an endpoint the stub does not serve
        let mut broken = (*config(true)).clone();
        broken.crossref.endpoint = "https://down.example/getForwardLinks".into();
        let fetcher = Arc::new(StubFetcher::default());
        let harvester = harvester(Arc::new(broken), &store, &fetcher, StubResolver::default());

        let reports = harvester.harvest_all_citations().await.unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.stored == 0 && r.errors.len() == 1));
        assert!(store.citations().await.is_empty());
    }

    #[tokio::test]
    async fn records_without_both_dois_are_dropped() {
        let store = store_with_post().await;
        let fetcher = Arc::new(StubFetcher::default().with_page(ENDPOINT, RESPONSE));
        let harvester = harvester(config(true), &store, &fetcher, StubResolver::default());

        let harvest = harvester.harvest_prefix("10.59350").await.unwrap();
        assert_eq!(harvest.report.received, 3);
        assert_eq!(harvest.report.dropped, 1);
        assert_eq!(harvest.report.stored, 2);
    }

    #[test]
    fn csl_date_precision() {
        let full = serde_json::json!({"issued": {"date-parts": [[2024, 3, 4]]}});
        let month = serde_json::json!({"issued": {"date-parts": [[2024, 3]]}});
        let year = serde_json::json!({"issued": {"date-parts": [[2024]]}});
        assert_eq!(csl_date(&full).as_deref(), Some("2024-03-04"));
        assert_eq!(csl_date(&month).as_deref(), Some("2024-03"));
        assert_eq!(csl_date(&year).as_deref(), Some("2024"));
        assert_eq!(csl_date(&serde_json::json!({})), None);
    }
}
