//! In-memory store of recent aggregation results.
//!
//! Keeps every merged lead of a run (before `min_score` filtering and
//! truncation) keyed by [`SessionId`], so the export step can resolve lead
//! ids and a weight edit can re-score without querying sources again. Uses
//! [`moka`] with a bounded capacity and a time-to-live.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::types::{Lead, Query, SessionId, SourceStatus};

/// One stored aggregation result.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub query: Query,
    /// Every merged lead, with the most recent scores, in id order.
    pub leads: Vec<Lead>,
    pub source_status: Vec<SourceStatus>,
    pub cancelled: bool,
}

/// Bounded, expiring map of sessions.
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache<SessionId, Arc<Session>>,
}

impl SessionStore {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn insert(&self, id: SessionId, session: Session) {
        self.cache.insert(id, Arc::new(session)).await;
    }

    /// Returns `None` for unknown or expired sessions.
    pub async fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.cache.get(id).await
    }

    pub async fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.cache.remove(id).await
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}
