//! The engine facade: one long-lived value that owns the source registry,
//! settings, scoring rules, session store and circuit breaker.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::circuit_breaker::{CircuitBreaker, SourceHealth};
use crate::config::EngineOptions;
use crate::error::{LeadError, Result};
use crate::orchestrator::pipeline::{select_leads, Pipeline, PipelineOptions, RunProgress};
use crate::orchestrator::scoring::{FactorRules, HeuristicRules};
use crate::session::{Session, SessionStore};
use crate::settings::{ConfigStore, EngineSettings};
use crate::sources::SourceRegistry;
use crate::types::{Lead, LeadId, Query, SearchOutcome, SessionId};

/// Multi-source lead aggregation engine.
///
/// Cheap to clone; clones share all state.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> lead_engine::Result<()> {
/// use lead_engine::{CandidateRecord, FixtureSource, LeadEngine, Query, Source, SourceRegistry};
///
/// let registry = SourceRegistry::new().with(FixtureSource::new(
///     Source::LinkedIn,
///     vec![CandidateRecord::new(Source::LinkedIn, "Jane Doe").with_title("CTO")],
/// ));
/// let engine = LeadEngine::builder(registry).build()?;
/// let outcome = engine.search(Query::new("jane")).await?;
/// for lead in &outcome.leads {
///     println!("{} {} ({})", lead.score, lead.name, lead.title);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LeadEngine {
    inner: Arc<Inner>,
}

struct Inner {
    registry: SourceRegistry,
    config: ConfigStore,
    rules: Arc<dyn FactorRules>,
    options: EngineOptions,
    sessions: SessionStore,
    breaker: Mutex<CircuitBreaker>,
}

/// Builder for [`LeadEngine`].
pub struct LeadEngineBuilder {
    registry: SourceRegistry,
    settings: EngineSettings,
    options: EngineOptions,
    rules: Arc<dyn FactorRules>,
}

impl LeadEngineBuilder {
    pub fn settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the default [`HeuristicRules`].
    pub fn rules(mut self, rules: impl FactorRules + 'static) -> Self {
        self.rules = Arc::new(rules);
        self
    }

    /// # Errors
    ///
    /// Returns [`LeadError::Config`] if the options are invalid.
    pub fn build(self) -> Result<LeadEngine> {
        self.options.validate()?;
        let sessions = SessionStore::new(self.options.session_capacity, self.options.session_ttl);
        let breaker = Mutex::new(CircuitBreaker::new(self.options.breaker.clone()));
        Ok(LeadEngine {
            inner: Arc::new(Inner {
                registry: self.registry,
                config: ConfigStore::new(self.settings),
                rules: self.rules,
                options: self.options,
                sessions,
                breaker,
            }),
        })
    }
}

impl LeadEngine {
    pub fn builder(registry: SourceRegistry) -> LeadEngineBuilder {
        LeadEngineBuilder {
            registry,
            settings: EngineSettings::default(),
            options: EngineOptions::default(),
            rules: Arc::new(HeuristicRules),
        }
    }

    /// Run a search to completion.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::InvalidQuery`] for a malformed query. Source
    /// failures are never errors: they appear in
    /// [`SearchOutcome::source_status`], and if every source fails the
    /// outcome simply has no leads.
    pub async fn search(&self, query: Query) -> Result<SearchOutcome> {
        self.start(query)?.wait().await
    }

    /// Start a search in the background.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::InvalidQuery`] for a malformed query; no source
    /// is contacted in that case.
    pub fn start(&self, query: Query) -> Result<AggregationHandle> {
        query.validate()?;
        let session_id = SessionId::new();
        let cancel = CancellationToken::new();
        let (progress_tx, progress_rx) =
            watch::channel(RunProgress::pending(&query.enabled_sources()));

        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let task = tokio::spawn(async move { inner.run(session_id, query, token, progress_tx).await });

        tracing::debug!(session = %session_id, "aggregation started");
        Ok(AggregationHandle {
            session_id,
            cancel,
            progress: progress_rx,
            task,
        })
    }

    /// Re-score a stored session with the current weights without
    /// contacting any source.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::UnknownSession`] if the session is unknown or
    /// expired.
    pub async fn rescore(&self, session_id: SessionId) -> Result<SearchOutcome> {
        let session = self.inner.session(session_id).await?;
        let weights = self.inner.config.get().scoring;
        let mut merged = session.leads.clone();
        let leads = select_leads(
            &mut merged,
            &session.query,
            &weights,
            self.inner.rules.as_ref(),
            self.inner.options.max_leads,
        );
        let source_status = session.source_status.clone();
        let cancelled = session.cancelled;
        self.inner
            .sessions
            .insert(
                session_id,
                Session {
                    query: session.query.clone(),
                    leads: merged,
                    source_status: source_status.clone(),
                    cancelled,
                },
            )
            .await;
        tracing::debug!(session = %session_id, leads = leads.len(), "session rescored");
        Ok(SearchOutcome {
            session_id,
            leads,
            source_status,
            cancelled,
        })
    }

    /// Full lead records for `ids`, in request order.
    ///
    /// Ids not present in the session are skipped. Leads filtered out by
    /// `min_score` or truncation can still be exported.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::UnknownSession`] if the session is unknown or
    /// expired.
    pub async fn export(&self, session_id: SessionId, ids: &[LeadId]) -> Result<Vec<Lead>> {
        let session = self.inner.session(session_id).await?;
        let leads: Vec<Lead> = ids
            .iter()
            .filter_map(|id| session.leads.iter().find(|lead| lead.id == *id))
            .cloned()
            .collect();
        if leads.len() < ids.len() {
            tracing::debug!(
                session = %session_id,
                requested = ids.len(),
                found = leads.len(),
                "export skipped unknown lead ids"
            );
        }
        Ok(leads)
    }

    /// The runtime settings store (weights and credentials).
    pub fn config(&self) -> &ConfigStore {
        &self.inner.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.inner.registry
    }

    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    /// Drop a stored session once its leads have been exported.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::UnknownSession`] if the session is unknown or
    /// already expired.
    pub async fn close_session(&self, session_id: SessionId) -> Result<()> {
        match self.inner.sessions.remove(&session_id).await {
            Some(_) => {
                tracing::debug!(session = %session_id, "session closed");
                Ok(())
            }
            None => Err(LeadError::UnknownSession(session_id.to_string())),
        }
    }

    /// Circuit state of every source that has run at least once.
    pub fn source_health(&self) -> Vec<SourceHealth> {
        match self.inner.breaker.lock() {
            Ok(guard) => guard.health_report(),
            Err(poisoned) => poisoned.into_inner().health_report(),
        }
    }

    /// Close every circuit, e.g. after a provider outage is known to be over.
    pub fn reset_source_health(&self) {
        match self.inner.breaker.lock() {
            Ok(mut guard) => guard.reset(),
            Err(poisoned) => poisoned.into_inner().reset(),
        }
        tracing::debug!("source health reset");
    }
}

impl Inner {
    async fn run(
        &self,
        session_id: SessionId,
        query: Query,
        cancel: CancellationToken,
        progress: watch::Sender<RunProgress>,
    ) -> SearchOutcome {
        let pipeline = Pipeline {
            registry: &self.registry,
            config: &self.config,
            rules: self.rules.as_ref(),
            options: PipelineOptions {
                source_timeout: self.options.source_timeout,
                max_leads: self.options.max_leads,
            },
            breaker: Some(&self.breaker),
        };
        let result = pipeline.execute(&query, cancel, &progress).await;

        self.sessions
            .insert(
                session_id,
                Session {
                    query,
                    leads: result.merged,
                    source_status: result.source_status.clone(),
                    cancelled: result.cancelled,
                },
            )
            .await;

        SearchOutcome {
            session_id,
            leads: result.leads,
            source_status: result.source_status,
            cancelled: result.cancelled,
        }
    }

    async fn session(&self, id: SessionId) -> Result<Arc<Session>> {
        self.sessions
            .get(&id)
            .await
            .ok_or_else(|| LeadError::UnknownSession(id.to_string()))
    }
}

impl std::fmt::Debug for LeadEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeadEngine")
            .field("registry", &self.inner.registry)
            .field("options", &self.inner.options)
            .field("sessions", &self.inner.sessions)
            .finish_non_exhaustive()
    }
}

/// A running search.
///
/// Dropping the handle does not stop the run; its result is still stored
/// in the session store.
#[derive(Debug)]
pub struct AggregationHandle {
    session_id: SessionId,
    cancel: CancellationToken,
    progress: watch::Receiver<RunProgress>,
    task: JoinHandle<SearchOutcome>,
}

impl AggregationHandle {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Stop waiting for sources that are still running.
    ///
    /// Records already merged are kept and scored; still-running sources
    /// are reported as failed with `cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this run, for use from another task.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Subscribe to progress updates.
    pub fn progress(&self) -> watch::Receiver<RunProgress> {
        self.progress.clone()
    }

    /// Wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::Aggregation`] if the background task panicked.
    pub async fn wait(self) -> Result<SearchOutcome> {
        self.task
            .await
            .map_err(|err| LeadError::Aggregation(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;
    use crate::error::SourceError;
    use crate::sources::FixtureSource;
    use crate::types::{CandidateRecord, Source};

    fn engine() -> LeadEngine {
        let registry = SourceRegistry::new().with(FixtureSource::new(
            Source::LinkedIn,
            vec![
                CandidateRecord::new(Source::LinkedIn, "Jane Doe").with_title("CTO"),
                CandidateRecord::new(Source::LinkedIn, "John Roe").with_title("Engineer"),
            ],
        ));
        LeadEngine::builder(registry).build().expect("valid options")
    }

    #[test]
    fn invalid_options_rejected() {
        let result = LeadEngine::builder(SourceRegistry::new())
            .options(EngineOptions {
                max_leads: 0,
                ..Default::default()
            })
            .build();
        assert!(result.unwrap_err().to_string().contains("max_leads"));
    }

    #[tokio::test]
    async fn malformed_query_is_rejected() {
        let err = engine().search(Query::new("  ")).await.unwrap_err();
        assert!(matches!(err, LeadError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn search_stores_session_for_export() {
        let engine = engine();
        let outcome = engine.search(Query::new("o")).await.expect("search");
        assert_eq!(outcome.leads.len(), 2);

        let ids: Vec<LeadId> = outcome.leads.iter().rev().map(|l| l.id).collect();
        let exported = engine
            .export(outcome.session_id, &ids)
            .await
            .expect("session exists");
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].id, ids[0]);
        assert_eq!(exported[1].id, ids[1]);
    }

    #[tokio::test]
    async fn export_skips_unknown_ids() {
        let engine = engine();
        let outcome = engine.search(Query::new("jane")).await.expect("search");
        let exported = engine
            .export(outcome.session_id, &[LeadId(999), outcome.leads[0].id])
            .await
            .expect("session exists");
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].name, "Jane Doe");
    }

    #[tokio::test]
    async fn unknown_session_errors() {
        let engine = engine();
        let err = engine.export(SessionId::new(), &[LeadId(1)]).await.unwrap_err();
        assert!(matches!(err, LeadError::UnknownSession(_)));
        assert!(engine.rescore(SessionId::new()).await.is_err());
    }

    #[tokio::test]
    async fn source_health_tracks_runs() {
        let engine = engine();
        assert!(engine.source_health().is_empty());
        engine.search(Query::new("jane")).await.expect("search");
        let health = engine.source_health();
        assert_eq!(health.len(), 1);
        assert_eq!(health[0].source, Source::LinkedIn);
        assert_eq!(health[0].consecutive_failures, 0);

        engine.reset_source_health();
        assert!(engine.source_health().is_empty());
    }

    #[tokio::test]
    async fn closed_session_is_gone() {
        let engine = engine();
        let outcome = engine.search(Query::new("jane")).await.expect("search");
        engine
            .close_session(outcome.session_id)
            .await
            .expect("session exists");

        let err = engine
            .export(outcome.session_id, &[outcome.leads[0].id])
            .await
            .unwrap_err();
        assert!(matches!(err, LeadError::UnknownSession(_)));
        assert!(engine.close_session(outcome.session_id).await.is_err());
    }

    #[tokio::test]
    async fn reset_reopens_a_tripped_source() {
        let registry = SourceRegistry::new().with(
            FixtureSource::new(Source::Twitter, vec![])
                .failing_with(SourceError::Unavailable("down".into())),
        );
        let engine = LeadEngine::builder(registry)
            .options(EngineOptions {
                breaker: CircuitBreakerConfig {
                    failure_threshold: 1,
                    ..Default::default()
                },
                ..Default::default()
            })
            .build()
            .expect("valid options");
        let query = || Query::new("x").with_sources([Source::Twitter]);

        engine.search(query()).await.expect("search");
        let skipped = engine.search(query()).await.expect("search");
        assert_eq!(skipped.source_status[0].error.as_deref(), Some("circuit open"));

        engine.reset_source_health();
        let retried = engine.search(query()).await.expect("search");
        assert_ne!(retried.source_status[0].error.as_deref(), Some("circuit open"));
    }
}
