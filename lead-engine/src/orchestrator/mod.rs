//! Aggregation orchestrator: concurrent source fan-out, dedup, scoring,
//! ranking.
//!
//! This module fans a query out to every enabled source concurrently,
//! merges the streamed candidate records into leads by normalised identity
//! keys, scores each lead with the configured weights and returns a
//! deterministically ordered, filtered list.

pub mod dedup;
pub mod pipeline;
pub mod ranking;
pub mod scoring;
pub mod url_normalize;
