//! Trait definition for pluggable candidate sources.
//!
//! Each provider (LinkedIn, Twitter, GitHub, web pages) implements
//! [`SourceAdapter`] so the pipeline can query them uniformly and
//! concurrently.

use futures::stream::BoxStream;

use crate::error::SourceError;
use crate::types::{CandidateRecord, Query, Source};

/// Finite stream of candidate records produced by one fetch.
///
/// The stream may end early with an `Err` item; records yielded before the
/// error are still used.
pub type CandidateStream = BoxStream<'static, Result<CandidateRecord, SourceError>>;

/// A pluggable provider of candidate records.
///
/// Implementors translate a [`Query`] into their provider's request format,
/// handle provider authentication and map responses into
/// [`CandidateRecord`] values. Streams are not restartable; calling
/// [`fetch`](SourceAdapter::fetch) again starts a fresh request.
///
/// Adapters run concurrently on separate tasks and must not share mutable
/// state with each other.
pub trait SourceAdapter: Send + Sync {
    /// Which [`Source`] this adapter queries.
    fn source(&self) -> Source;

    /// Start a fetch for `query`.
    fn fetch(&self, query: &Query) -> CandidateStream;
}
