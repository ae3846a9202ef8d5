//! Adapter serving a fixed set of candidate records.
//!
//! Applies the query the way a provider search would: keywords must appear
//! in the name, title, company, bio or a skill; title, company and location
//! filters are case-insensitive substring matches. An optional per-record
//! delay and terminal error let callers reproduce slow or flaky providers.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::SourceError;
use crate::source::{CandidateStream, SourceAdapter};
use crate::types::{CandidateRecord, Query, Source};

#[derive(Debug, Clone)]
pub struct FixtureSource {
    source: Source,
    records: Arc<Vec<CandidateRecord>>,
    delay: Option<Duration>,
    fail_with: Option<SourceError>,
    apply_query: bool,
}

impl FixtureSource {
    /// Serve `records` as coming from `source`.
    ///
    /// Each record's own `source` field is overwritten with `source`.
    pub fn new(source: Source, records: Vec<CandidateRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|mut r| {
                r.source = source;
                r
            })
            .collect();
        Self {
            source,
            records: Arc::new(records),
            delay: None,
            fail_with: None,
            apply_query: true,
        }
    }

    /// Wait this long before yielding each record.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// End every stream with this error after the records.
    pub fn failing_with(mut self, error: SourceError) -> Self {
        self.fail_with = Some(error);
        self
    }

    /// Serve every record regardless of the query.
    pub fn unfiltered(mut self) -> Self {
        self.apply_query = false;
        self
    }

    pub fn records(&self) -> &[CandidateRecord] {
        &self.records
    }

    fn matching(&self, query: &Query) -> Vec<CandidateRecord> {
        self.records
            .iter()
            .filter(|r| !self.apply_query || matches_query(r, query))
            .cloned()
            .collect()
    }
}

impl SourceAdapter for FixtureSource {
    fn source(&self) -> Source {
        self.source
    }

    fn fetch(&self, query: &Query) -> CandidateStream {
        let matched = self.matching(query);
        tracing::trace!(source = %self.source, matched = matched.len(), "fixture fetch");
        let delay = self.delay;
        let records = stream::iter(matched).then(move |record| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, SourceError>(record)
        });
        let tail = stream::iter(self.fail_with.clone().map(Err));
        records.chain(tail).boxed()
    }
}

/// Provider-style filter of one record against a query.
pub fn matches_query(record: &CandidateRecord, query: &Query) -> bool {
    let contains = |field: &str, wanted: &str| field.to_lowercase().contains(&wanted.to_lowercase());
    let filter_ok = |field: &str, wanted: &Option<String>| match wanted.as_deref().map(str::trim) {
        Some(w) if !w.is_empty() => contains(field, w),
        _ => true,
    };

    let keywords = query.keywords.trim();
    let keywords_ok = keywords.is_empty()
        || contains(&record.full_name, keywords)
        || contains(&record.title, keywords)
        || contains(&record.company, keywords)
        || contains(&record.bio, keywords)
        || record.skills.iter().any(|s| contains(s, keywords));

    keywords_ok
        && filter_ok(&record.title, &query.title)
        && filter_ok(&record.company, &query.company)
        && filter_ok(&record.location, &query.location)
}
