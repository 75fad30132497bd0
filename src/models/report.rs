// src/models/report.rs

//! Batch outcome reports.

use std::fmt;

/// Sample errors kept per report.
const MAX_SAMPLE_ERRORS: usize = 5;

/// Outcome of syncing one blog.
#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub slug: String,
    pub fetched: usize,
    /// Dropped as unchanged since the last sync
    pub filtered: usize,
    pub extracted: usize,
    /// Failed extraction or validation
    pub rejected: usize,
    pub stored: usize,
    pub errors: Vec<String>,
}

impl SyncReport {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Self::default()
        }
    }

    /// Record a failure, keeping only the first few messages.
    pub fn record_error(&mut self, error: impl fmt::Display) {
        if self.errors.len() < MAX_SAMPLE_ERRORS {
            self.errors.push(error.to_string());
        }
    }

    /// Fold another blog's counts into this one.
    pub fn merge(&mut self, other: &SyncReport) {
        self.fetched += other.fetched;
        self.filtered += other.filtered;
        self.extracted += other.extracted;
        self.rejected += other.rejected;
        self.stored += other.stored;
        for error in &other.errors {
            self.record_error(format!("{}: {}", other.slug, error));
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: fetched={} filtered={} extracted={} rejected={} stored={}",
            self.slug, self.fetched, self.filtered, self.extracted, self.rejected, self.stored
        )
    }
}

/// Outcome of harvesting citations for one DOI prefix.
#[derive(Debug, Default, Clone)]
pub struct HarvestReport {
    pub prefix: String,
    pub received: usize,
    /// Missing one of the two DOIs
    pub dropped: usize,
    pub stored: usize,
    pub errors: Vec<String>,
}

impl HarvestReport {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn record_error(&mut self, error: impl fmt::Display) {
        if self.errors.len() < MAX_SAMPLE_ERRORS {
            self.errors.push(error.to_string());
        }
    }

    pub fn merge(&mut self, other: &HarvestReport) {
        self.received += other.received;
        self.dropped += other.dropped;
        self.stored += other.stored;
        for error in &other.errors {
            self.record_error(format!("{}: {}", other.prefix, error));
        }
    }
}

impl fmt::Display for HarvestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: received={} dropped={} stored={}",
            self.prefix, self.received, self.dropped, self.stored
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_errors_are_capped() {
        let mut report = SyncReport::new("blog");
        for i in 0..10 {
            report.record_error(format!("error {i}"));
        }
        assert_eq!(report.errors.len(), MAX_SAMPLE_ERRORS);
        assert_eq!(report.errors[0], "error 0");
    }

    #[test]
    fn merge_sums_counts_and_prefixes_errors() {
        let mut total = SyncReport::new("all");
        let mut one = SyncReport::new("one");
        one.fetched = 3;
        one.stored = 2;
        one.record_error("timeout");
        total.merge(&one);
        total.merge(&one);
        assert_eq!(total.fetched, 6);
        assert_eq!(total.stored, 4);
        assert_eq!(total.errors[0], "one: timeout");
    }
}
