//! Leadgen: multi-source lead generation.
//!
//! Host crate around [`lead_engine`]: it persists settings as TOML, loads
//! fixture records as a development source and renders search results for
//! the `leadgen` command-line tool.
//!
//! # Architecture
//!
//! - **Settings**: [`LeadgenConfig`] maps the TOML file onto engine settings and options
//! - **Sources**: [`fixtures`] registers one fixture adapter per source in a JSON file
//! - **Output**: [`report`] renders ranked leads and the per-source status summary

pub mod config;
pub mod error;
pub mod fixtures;
pub mod report;

pub use config::LeadgenConfig;
pub use error::{AppError, Result};

use lead_engine::{LeadEngine, SourceRegistry};

/// Build an engine from host settings and a source registry.
///
/// # Errors
///
/// Returns an error if the settings hold invalid weights or limits.
pub fn build_engine(config: &LeadgenConfig, registry: SourceRegistry) -> Result<LeadEngine> {
    let report = config.validate()?;
    for warning in &report.warnings {
        tracing::warn!(%warning, "scoring weights");
    }
    let engine = LeadEngine::builder(registry)
        .settings(config.engine_settings())
        .options(config.engine_options())
        .build()?;
    Ok(engine)
}
