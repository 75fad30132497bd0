//! Application configuration structures.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Connection pool and retry settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Outbound HTTP behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Pagination and plan limits
    #[serde(default)]
    pub sync: SyncConfig,

    /// Registration agency access for citation harvesting
    #[serde(default)]
    pub crossref: CrossrefConfig,

    /// Content normalization tables
    #[serde(default)]
    pub normalize: NormalizeConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override secrets from the process environment.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.database.url = url;
        }
        if let Ok(user) = std::env::var("CROSSREF_USERNAME") {
            self.crossref.username = Some(user);
        }
        if let Ok(password) = std::env::var("CROSSREF_PASSWORD") {
            self.crossref.password = Some(password);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(AppError::validation("database.url is empty"));
        }
        if self.database.max_connections == 0 {
            return Err(AppError::validation("database.max_connections must be > 0"));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(AppError::validation(
                "database.min_connections exceeds database.max_connections",
            ));
        }
        if self.database.acquire_timeout_secs == 0 {
            return Err(AppError::validation(
                "database.acquire_timeout_secs must be > 0",
            ));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.feed_timeout_secs == 0
            || self.http.reference_timeout_secs == 0
            || self.http.metadata_timeout_secs == 0
        {
            return Err(AppError::validation("http timeouts must be > 0"));
        }
        if self.http.max_concurrent == 0 {
            return Err(AppError::validation("http.max_concurrent must be > 0"));
        }
        if self.sync.page_size == 0 {
            return Err(AppError::validation("sync.page_size must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.normalize.abstract_similarity) {
            return Err(AppError::validation(
                "normalize.abstract_similarity must be within 0..=1",
            ));
        }
        Ok(())
    }
}

/// Connection pool and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    #[serde(default = "defaults::database_url")]
    pub url: String,

    #[serde(default = "defaults::min_connections")]
    pub min_connections: u32,

    #[serde(default = "defaults::max_connections")]
    pub max_connections: u32,

    /// Bounded wait for a free connection
    #[serde(default = "defaults::acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Interval of the background pool probe
    #[serde(default = "defaults::health_check_interval")]
    pub health_check_interval_secs: u64,

    /// Retries for connection-class failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// First retry delay; doubled on every further attempt
    #[serde(default = "defaults::retry_base_delay")]
    pub retry_base_delay_ms: u64,
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: defaults::database_url(),
            min_connections: defaults::min_connections(),
            max_connections: defaults::max_connections(),
            acquire_timeout_secs: defaults::acquire_timeout(),
            health_check_interval_secs: defaults::health_check_interval(),
            max_retries: defaults::max_retries(),
            retry_base_delay_ms: defaults::retry_base_delay(),
        }
    }
}

/// HTTP client behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Timeout for feed and platform API pages
    #[serde(default = "defaults::feed_timeout")]
    pub feed_timeout_secs: u64,

    /// Timeout for reference URL existence checks
    #[serde(default = "defaults::short_timeout")]
    pub reference_timeout_secs: u64,

    /// Timeout for DOI metadata requests
    #[serde(default = "defaults::short_timeout")]
    pub metadata_timeout_secs: u64,

    /// Maximum concurrent item tasks within one blog or prefix
    #[serde(default = "defaults::max_concurrent")]
    pub max_concurrent: usize,
}

impl HttpConfig {
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn reference_timeout(&self) -> Duration {
        Duration::from_secs(self.reference_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            feed_timeout_secs: defaults::feed_timeout(),
            reference_timeout_secs: defaults::short_timeout(),
            metadata_timeout_secs: defaults::short_timeout(),
            max_concurrent: defaults::max_concurrent(),
        }
    }
}

/// Pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Items requested per page
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Highest page synced for a constrained plan
    #[serde(default = "defaults::constrained_page_cap")]
    pub constrained_page_cap: u32,

    /// Plan names subject to the page cap
    #[serde(default = "defaults::constrained_plans")]
    pub constrained_plans: Vec<String>,
}

impl SyncConfig {
    /// Whether `plan` is limited to `constrained_page_cap` pages.
    pub fn is_constrained(&self, plan: &str) -> bool {
        self.constrained_plans
            .iter()
            .any(|p| p.eq_ignore_ascii_case(plan))
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: defaults::page_size(),
            constrained_page_cap: defaults::constrained_page_cap(),
            constrained_plans: defaults::constrained_plans(),
        }
    }
}

/// Registration agency access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossrefConfig {
    /// Forward-citation servlet
    #[serde(default = "defaults::crossref_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// DOI prefixes whose citations are harvested
    #[serde(default)]
    pub prefixes: Vec<String>,

    /// Cited DOIs that were reassigned, old → new
    #[serde(default)]
    pub doi_redirects: HashMap<String, String>,
}

impl CrossrefConfig {
    /// Credential pair, if both halves are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some((user, password))
            }
            _ => None,
        }
    }
}

impl Default for CrossrefConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::crossref_endpoint(),
            username: None,
            password: None,
            prefixes: Vec::new(),
            doi_redirects: HashMap::new(),
        }
    }
}

/// Keyword sets for acknowledgment sentence classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipKeywords {
    #[serde(default = "defaults::identical_keywords")]
    pub is_identical_to: Vec<String>,

    #[serde(default = "defaults::preprint_keywords")]
    pub is_preprint_of: Vec<String>,

    #[serde(default = "defaults::award_keywords")]
    pub has_award: Vec<String>,
}

impl Default for RelationshipKeywords {
    fn default() -> Self {
        Self {
            is_identical_to: defaults::identical_keywords(),
            is_preprint_of: defaults::preprint_keywords(),
            has_award: defaults::award_keywords(),
        }
    }
}

/// Host-specific image path repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageHostFix {
    /// Host whose image paths need the prefix
    pub host: String,

    /// Path prefix the host expects, e.g. `/images/`
    pub path_prefix: String,
}

/// Content normalization tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Heading texts that open a reference list
    #[serde(default = "defaults::reference_headings")]
    pub reference_headings: Vec<String>,

    /// Heading texts that open an acknowledgments section
    #[serde(default = "defaults::acknowledgment_headings")]
    pub acknowledgment_headings: Vec<String>,

    #[serde(default)]
    pub relationship_keywords: RelationshipKeywords,

    /// Lowercase tag → canonical spelling
    #[serde(default = "defaults::tag_corrections")]
    pub tag_corrections: HashMap<String, String>,

    /// Tags dropped entirely (compared case-insensitively)
    #[serde(default = "defaults::excluded_tags")]
    pub excluded_tags: Vec<String>,

    /// Display name → canonical author name
    #[serde(default)]
    pub author_aliases: HashMap<String, String>,

    /// Canonical author name → researcher identifier URL
    #[serde(default)]
    pub author_identifiers: HashMap<String, String>,

    /// Blog images that are platform boilerplate rather than content
    #[serde(default = "defaults::boilerplate_images")]
    pub boilerplate_images: Vec<String>,

    #[serde(default = "defaults::image_host_fixes")]
    pub image_host_fixes: Vec<ImageHostFix>,

    /// Summary length limit in characters
    #[serde(default = "defaults::summary_length")]
    pub summary_length: usize,

    /// Abstracts at least this similar to the summary are dropped
    #[serde(default = "defaults::abstract_similarity")]
    pub abstract_similarity: f64,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            reference_headings: defaults::reference_headings(),
            acknowledgment_headings: defaults::acknowledgment_headings(),
            relationship_keywords: RelationshipKeywords::default(),
            tag_corrections: defaults::tag_corrections(),
            excluded_tags: defaults::excluded_tags(),
            author_aliases: HashMap::new(),
            author_identifiers: HashMap::new(),
            boilerplate_images: defaults::boilerplate_images(),
            image_host_fixes: defaults::image_host_fixes(),
            summary_length: defaults::summary_length(),
            abstract_similarity: defaults::abstract_similarity(),
        }
    }
}

mod defaults {
    use std::collections::HashMap;

    use super::ImageHostFix;

    // Database defaults
    pub fn database_url() -> String {
        "postgres://localhost/scholarsync".into()
    }
    pub fn min_connections() -> u32 {
        1
    }
    pub fn max_connections() -> u32 {
        10
    }
    pub fn acquire_timeout() -> u64 {
        30
    }
    pub fn health_check_interval() -> u64 {
        60
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_base_delay() -> u64 {
        500
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; scholarsync/0.1)".into()
    }
    pub fn feed_timeout() -> u64 {
        30
    }
    pub fn short_timeout() -> u64 {
        10
    }
    pub fn max_concurrent() -> usize {
        10
    }

    // Sync defaults
    pub fn page_size() -> usize {
        50
    }
    pub fn constrained_page_cap() -> u32 {
        5
    }
    pub fn constrained_plans() -> Vec<String> {
        vec!["Starter".into()]
    }

    pub fn crossref_endpoint() -> String {
        "https://doi.crossref.org/servlet/getForwardLinks".into()
    }

    // Normalizer defaults
    pub fn reference_headings() -> Vec<String> {
        ["References", "Reference", "Referenzen", "Bibliography", "Literatur", "Literature"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn acknowledgment_headings() -> Vec<String> {
        ["Acknowledgments", "Acknowledgements", "Acknowledgment", "Danksagung"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn identical_keywords() -> Vec<String> {
        ["originally published", "cross-posted", "crossposted"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn preprint_keywords() -> Vec<String> {
        ["peer-reviewed version"].into_iter().map(String::from).collect()
    }
    pub fn award_keywords() -> Vec<String> {
        ["work was funded", "was funded by"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn tag_corrections() -> HashMap<String, String> {
        [
            ("ai", "AI"),
            ("covid-19", "COVID-19"),
            ("doi", "DOI"),
            ("doi registration", "DOI Registration"),
            ("fair", "FAIR"),
            ("orcid", "ORCID"),
            ("open access", "Open Access"),
            ("open science", "Open Science"),
            ("phd", "PhD"),
            ("rdm", "RDM"),
            ("ror", "ROR"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }
    pub fn excluded_tags() -> Vec<String> {
        ["Uncategorized", "Uncategorised", "Allgemein", "Unkategorisiert"]
            .into_iter()
            .map(String::from)
            .collect()
    }
    pub fn boilerplate_images() -> Vec<String> {
        vec!["https://s0.wp.com/i/buttonw-com.png".into()]
    }
    pub fn image_host_fixes() -> Vec<ImageHostFix> {
        vec![ImageHostFix {
            host: "wayback.archive-it.org".into(),
            path_prefix: "/images/".into(),
        }]
    }
    pub fn summary_length() -> usize {
        450
    }
    pub fn abstract_similarity() -> f64 {
        0.75
    }
}
