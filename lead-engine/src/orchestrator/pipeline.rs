//! Aggregation pipeline: concurrent source fan-out, streaming merge, scoring
//! and ranking.
//!
//! Every enabled source runs on its own task under an independent time
//! budget and forwards records over a channel. A single merge loop owns the
//! [`Deduplicator`] and ingests records as they arrive, so merge state never
//! needs a lock. When every source has finished, or the run is cancelled,
//! the merged leads are scored against a configuration snapshot and ranked.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::SourceError;
use crate::settings::{ConfigStore, ScoringWeights};
use crate::source::SourceAdapter;
use crate::sources::SourceRegistry;
use crate::types::{CandidateRecord, Lead, Query, Source, SourceOutcome, SourceStatus};

use super::dedup::Deduplicator;
use super::ranking::{filter_by_min_score, rank};
use super::scoring::{score_leads, FactorRules};

/// Records buffered between source tasks and the merge loop.
const EVENT_BUFFER: usize = 64;

/// Coarse state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunPhase {
    Pending,
    Fetching,
    Scoring,
    Complete,
}

/// State of one source within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceState {
    Running,
    Succeeded,
    Partial,
    Failed,
}

impl From<SourceOutcome> for SourceState {
    fn from(outcome: SourceOutcome) -> Self {
        match outcome {
            SourceOutcome::Succeeded => Self::Succeeded,
            SourceOutcome::Partial => Self::Partial,
            SourceOutcome::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceProgress {
    pub source: Source,
    pub state: SourceState,
    /// Records received so far.
    pub count: usize,
}

/// Observable progress of a run, published on a `watch` channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunProgress {
    pub phase: RunPhase,
    pub sources: Vec<SourceProgress>,
    /// Distinct leads merged so far.
    pub leads: usize,
}

impl RunProgress {
    /// Initial progress for a run over `sources`.
    pub fn pending(sources: &[Source]) -> Self {
        Self {
            phase: RunPhase::Pending,
            sources: sources
                .iter()
                .map(|source| SourceProgress {
                    source: *source,
                    state: SourceState::Running,
                    count: 0,
                })
                .collect(),
            leads: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase == RunPhase::Complete
    }
}

/// Options the pipeline reads per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub source_timeout: Duration,
    pub max_leads: usize,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    /// Ranked, `min_score`-filtered and truncated leads.
    pub leads: Vec<Lead>,
    /// Every merged lead, scored, in id order.
    pub merged: Vec<Lead>,
    pub source_status: Vec<SourceStatus>,
    pub cancelled: bool,
}

/// Collaborators of one run, borrowed from the engine.
pub struct Pipeline<'a> {
    pub registry: &'a SourceRegistry,
    pub config: &'a ConfigStore,
    pub rules: &'a dyn FactorRules,
    pub options: PipelineOptions,
    pub breaker: Option<&'a Mutex<CircuitBreaker>>,
}

enum SourceEvent {
    Record(Source, CandidateRecord),
    Finished(Source, Result<(), SourceError>),
}

/// How a source's participation ended.
enum Finish {
    Done,
    Error(SourceError),
    Skipped(&'static str),
}

struct SourceRun {
    source: Source,
    count: usize,
    finish: Option<Finish>,
}

impl SourceRun {
    fn is_running(&self) -> bool {
        self.finish.is_none()
    }

    /// Status entry; still-running sources count as cancelled.
    fn status(&self) -> SourceStatus {
        let (status, error) = match &self.finish {
            None => (SourceOutcome::Failed, Some(SourceError::Cancelled.to_string())),
            Some(Finish::Done) => (SourceOutcome::Succeeded, None),
            Some(Finish::Error(err @ (SourceError::Timeout(_) | SourceError::Cancelled))) => {
                (SourceOutcome::Failed, Some(err.to_string()))
            }
            Some(Finish::Error(err)) if self.count > 0 => {
                (SourceOutcome::Partial, Some(err.to_string()))
            }
            Some(Finish::Error(err)) => (SourceOutcome::Failed, Some(err.to_string())),
            Some(Finish::Skipped(reason)) => (SourceOutcome::Failed, Some((*reason).to_string())),
        };
        SourceStatus {
            source: self.source,
            status,
            count: self.count,
            error,
        }
    }

    fn progress(&self) -> SourceProgress {
        let state = if self.is_running() {
            SourceState::Running
        } else {
            self.status().status.into()
        };
        SourceProgress {
            source: self.source,
            state,
            count: self.count,
        }
    }
}

impl Pipeline<'_> {
    /// Run one aggregation.
    ///
    /// # Pipeline
    ///
    /// 1. Skip sources with no adapter or an open circuit (reported failed)
    /// 2. Spawn one fetch task per remaining source, each under its own timeout
    /// 3. Merge records into leads as they arrive
    /// 4. Stop when every source has finished or `cancel` fires
    /// 5. Score every lead with the current weights, rank, filter, truncate
    ///
    /// Source failures never abort the run; they are reported per source in
    /// [`RunResult::source_status`].
    pub async fn execute(
        &self,
        query: &Query,
        cancel: CancellationToken,
        progress: &watch::Sender<RunProgress>,
    ) -> RunResult {
        tracing::trace!(keywords = %query.keywords, "aggregation started");

        let mut runs: Vec<SourceRun> = query
            .enabled_sources()
            .into_iter()
            .map(|source| SourceRun {
                source,
                count: 0,
                finish: None,
            })
            .collect();

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let mut tasks = JoinSet::new();
        let mut task_sources = HashMap::new();

        for run in runs.iter_mut() {
            let Some(adapter) = self.registry.get(run.source) else {
                tracing::warn!(source = %run.source, "no adapter registered");
                run.finish = Some(Finish::Skipped("no adapter"));
                continue;
            };
            if !self.breaker_allows(run.source) {
                tracing::warn!(source = %run.source, "circuit open, skipping source");
                run.finish = Some(Finish::Skipped("circuit open"));
                continue;
            }
            let handle = tasks.spawn(fetch_source(
                adapter,
                query.clone(),
                self.options.source_timeout,
                tx.clone(),
                cancel.clone(),
            ));
            task_sources.insert(handle.id(), run.source);
        }
        drop(tx);

        let mut dedup = Deduplicator::new();
        publish(progress, RunPhase::Fetching, &runs, 0);

        let mut cancelled = false;
        while runs.iter().any(SourceRun::is_running) {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                event = rx.recv() => match event {
                    Some(SourceEvent::Record(source, record)) => {
                        dedup.ingest(record);
                        if let Some(run) = runs.iter_mut().find(|r| r.source == source) {
                            run.count += 1;
                        }
                    }
                    Some(SourceEvent::Finished(source, result)) => {
                        if let Some(run) = runs.iter_mut().find(|r| r.source == source) {
                            log_finish(run, &result);
                            run.finish = Some(match result {
                                Ok(()) => Finish::Done,
                                Err(err) => Finish::Error(err),
                            });
                        }
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(err) = joined {
                        let source = task_sources.get(&err.id()).copied();
                        if let Some(run) = runs.iter_mut().find(|r| Some(r.source) == source) {
                            tracing::warn!(source = %run.source, error = %err, "fetch task failed");
                            if run.is_running() {
                                run.finish = Some(Finish::Error(SourceError::Unavailable(
                                    "fetch task failed".into(),
                                )));
                            }
                        }
                    }
                }
            }
            publish(progress, RunPhase::Fetching, &runs, dedup.len());
        }
        tasks.abort_all();

        if cancelled {
            tracing::debug!("aggregation cancelled");
        } else {
            for run in runs.iter_mut().filter(|r| r.is_running()) {
                run.finish = Some(Finish::Error(SourceError::Unavailable(
                    "fetch ended without status".into(),
                )));
            }
        }

        publish(progress, RunPhase::Scoring, &runs, dedup.len());
        let settings = self.config.get();
        let mut merged = dedup.into_leads();
        let leads = select_leads(&mut merged, query, &settings.scoring, self.rules, self.options.max_leads);

        let source_status: Vec<SourceStatus> = runs.iter().map(SourceRun::status).collect();
        self.record_health(&runs, &source_status);
        publish(progress, RunPhase::Complete, &runs, merged.len());

        tracing::debug!(
            leads = leads.len(),
            merged = merged.len(),
            cancelled,
            "aggregation complete"
        );

        RunResult {
            leads,
            merged,
            source_status,
            cancelled,
        }
    }

    fn breaker_allows(&self, source: Source) -> bool {
        let Some(breaker) = self.breaker else {
            return true;
        };
        match breaker.lock() {
            Ok(mut guard) => guard.should_attempt(source),
            Err(poisoned) => poisoned.into_inner().should_attempt(source),
        }
    }

    fn record_health(&self, runs: &[SourceRun], statuses: &[SourceStatus]) {
        let Some(breaker) = self.breaker else {
            return;
        };
        let mut guard = match breaker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for (run, status) in runs.iter().zip(statuses) {
            match (&run.finish, status.status) {
                (Some(Finish::Skipped(_)) | None, _) => {}
                (Some(Finish::Error(SourceError::Cancelled)), _) => {}
                (_, SourceOutcome::Succeeded | SourceOutcome::Partial) => {
                    guard.record_success(run.source)
                }
                (_, SourceOutcome::Failed) => guard.record_failure(run.source),
            }
        }
    }
}

/// Score `merged` in place (left in id order) and return the ranked,
/// filtered and truncated selection.
pub fn select_leads(
    merged: &mut [Lead],
    query: &Query,
    weights: &ScoringWeights,
    rules: &dyn FactorRules,
    max_leads: usize,
) -> Vec<Lead> {
    score_leads(merged, query, weights, rules);
    let mut ranked = merged.to_vec();
    rank(&mut ranked);
    if let Some(min_score) = query.min_score {
        filter_by_min_score(&mut ranked, min_score);
    }
    ranked.truncate(max_leads);
    ranked
}

async fn fetch_source(
    adapter: Arc<dyn SourceAdapter>,
    query: Query,
    budget: Duration,
    tx: mpsc::Sender<SourceEvent>,
    cancel: CancellationToken,
) {
    let source = adapter.source();
    let drain = async {
        let mut stream = adapter.fetch(&query);
        while let Some(item) = stream.next().await {
            let record = item?;
            if tx.send(SourceEvent::Record(source, record)).await.is_err() {
                return Err(SourceError::Cancelled);
            }
        }
        Ok::<(), SourceError>(())
    };

    let result = tokio::select! {
        _ = cancel.cancelled() => Err(SourceError::Cancelled),
        outcome = tokio::time::timeout(budget, drain) => {
            outcome.unwrap_or_else(|_| Err(SourceError::Timeout(millis(budget))))
        }
    };
    let _ = tx.send(SourceEvent::Finished(source, result)).await;
}

fn log_finish(run: &SourceRun, result: &Result<(), SourceError>) {
    match result {
        Ok(()) => tracing::debug!(source = %run.source, count = run.count, "source finished"),
        Err(err) => tracing::warn!(
            source = %run.source,
            count = run.count,
            error = %err,
            "source failed"
        ),
    }
}

fn publish(progress: &watch::Sender<RunProgress>, phase: RunPhase, runs: &[SourceRun], leads: usize) {
    progress.send_replace(RunProgress {
        phase,
        sources: runs.iter().map(SourceRun::progress).collect(),
        leads,
    });
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
