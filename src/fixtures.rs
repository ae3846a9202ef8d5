//! Candidate records loaded from a JSON fixture file.
//!
//! Stands in for live provider connectors during development. The file is
//! either a JSON array of candidate records or an object with a `records`
//! array; each record names its own `source`, and one fixture adapter is
//! registered per source found.

use std::collections::BTreeMap;
use std::path::Path;

use lead_engine::{CandidateRecord, FixtureSource, Source, SourceRegistry};
use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Deserialize)]
#[serde(untagged)]
enum FixtureFile {
    List(Vec<CandidateRecord>),
    Wrapped { records: Vec<CandidateRecord> },
}

/// Parse fixture JSON.
///
/// # Errors
///
/// Returns [`AppError::Fixture`] if the text is not a record list.
pub fn parse_records(json: &str) -> Result<Vec<CandidateRecord>> {
    let file: FixtureFile =
        serde_json::from_str(json).map_err(|e| AppError::Fixture(e.to_string()))?;
    Ok(match file {
        FixtureFile::List(records) | FixtureFile::Wrapped { records } => records,
    })
}

/// Read and parse a fixture file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_records(path: &Path) -> Result<Vec<CandidateRecord>> {
    let content = std::fs::read_to_string(path)?;
    let records = parse_records(&content)?;
    tracing::debug!(path = %path.display(), records = records.len(), "loaded fixtures");
    Ok(records)
}

/// One fixture adapter per source present in `records`.
pub fn registry_from_records(records: Vec<CandidateRecord>) -> SourceRegistry {
    let mut by_source: BTreeMap<Source, Vec<CandidateRecord>> = BTreeMap::new();
    for record in records {
        by_source.entry(record.source).or_default().push(record);
    }
    by_source
        .into_iter()
        .fold(SourceRegistry::new(), |registry, (source, records)| {
            registry.with(FixtureSource::new(source, records))
        })
}

/// Registry for the fixture file at `path`, or an empty registry.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_registry(path: Option<&Path>) -> Result<SourceRegistry> {
    match path {
        Some(path) => Ok(registry_from_records(load_records(path)?)),
        None => Ok(SourceRegistry::new()),
    }
}
