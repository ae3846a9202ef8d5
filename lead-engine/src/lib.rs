//! # lead-engine
//!
//! Multi-source lead aggregation, deduplication and weighted scoring.
//!
//! This crate turns raw candidate records pulled from several providers
//! (LinkedIn, Twitter, GitHub, web pages) into one deduplicated, ranked list
//! of leads with a reproducible 0–100 score. Provider connectors plug in
//! through the [`SourceAdapter`] trait; everything else runs in-process.
//!
//! ## Design
//!
//! - Queries every enabled source concurrently, each under its own timeout
//! - Merges records into leads by profile URL, email, or name plus role
//! - Scores each lead from six weighted factors; weights are normalised
//! - Ranks by score, then by lead id, so identical inputs give identical output
//! - Graceful degradation: failing sources are reported, never fatal
//! - Keeps recent results for export and re-scoring after weight edits
//!
//! ## Security
//!
//! - API keys are redacted from `Debug` output and never logged
//! - Query text is logged only at trace level

pub mod circuit_breaker;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod service;
pub mod session;
pub mod settings;
pub mod source;
pub mod sources;
pub mod types;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitState, SourceHealth};
pub use config::EngineOptions;
pub use error::{LeadError, Result, SourceError};
pub use orchestrator::pipeline::{RunPhase, RunProgress, SourceProgress, SourceState};
pub use orchestrator::ranking::{categorize, LeadCategory};
pub use orchestrator::scoring::{FactorRules, HeuristicRules};
pub use service::{AggregationHandle, LeadEngine, LeadEngineBuilder};
pub use settings::{
    ApiCredentials, ConfigStore, ConfigWarning, EngineSettings, PublicSettings, ScoringWeights,
    ValidationReport,
};
pub use source::{CandidateStream, SourceAdapter};
pub use sources::{FixtureSource, SourceRegistry};
pub use types::{
    CandidateRecord, Lead, LeadId, Query, ScoreBreakdown, SearchOutcome, SessionId, Source,
    SourceOutcome, SourceStatus,
};
