//! Error types for the leadgen host.

use lead_engine::LeadError;

/// Errors raised while loading settings, fixtures or driving the engine.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Settings file could not be parsed or serialised, or holds invalid values.
    #[error("config error: {0}")]
    Config(String),

    /// Fixture file could not be parsed.
    #[error("fixture error: {0}")]
    Fixture(String),

    /// Rejected by the engine (bad query, bad weights, unknown session).
    #[error(transparent)]
    Engine(#[from] LeadError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;
