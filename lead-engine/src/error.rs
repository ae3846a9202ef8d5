//! Error types for the lead-engine crate.
//!
//! Only malformed queries, rejected configuration updates, unknown sessions
//! and a crashed aggregation task surface as [`LeadError`]. Failures inside a
//! single source are reported as [`SourceError`] values in the per-source
//! status summary and never abort a search. No credentials appear in error
//! messages.

/// Errors returned to callers of the engine.
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    /// The query was rejected before any source was contacted.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A scoring weight was outside `[0, 1]` or not a finite number.
    #[error("invalid weight {field}: {value} is not a finite number in [0, 1]")]
    InvalidWeight {
        /// Name of the offending weight, as it appears in settings.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The session id is unknown or its cached result has expired.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// Invalid engine options.
    #[error("config error: {0}")]
    Config(String),

    /// The background aggregation task panicked or was aborted.
    #[error("aggregation task failed: {0}")]
    Aggregation(String),
}

/// Convenience type alias for lead-engine results.
pub type Result<T> = std::result::Result<T, LeadError>;

/// Why a single source stopped producing candidate records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Credentials were missing or rejected by the provider.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The provider throttled the request.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The source did not finish within its time budget.
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// The provider answered with data that could not be mapped.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The source could not be queried at all.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The caller cancelled the search while this source was running.
    #[error("cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_query() {
        let err = LeadError::InvalidQuery("no sources enabled".into());
        assert_eq!(err.to_string(), "invalid query: no sources enabled");
    }

    #[test]
    fn display_invalid_weight_names_field() {
        let err = LeadError::InvalidWeight {
            field: "company_fit_weight",
            value: 1.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("company_fit_weight"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn display_unknown_session() {
        let err = LeadError::UnknownSession("abc".into());
        assert_eq!(err.to_string(), "unknown session: abc");
    }

    #[test]
    fn display_source_errors() {
        assert_eq!(SourceError::Timeout(250).to_string(), "timed out after 250ms");
        assert_eq!(SourceError::Cancelled.to_string(), "cancelled");
        assert_eq!(
            SourceError::RateLimited("429".into()).to_string(),
            "rate limited: 429"
        );
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LeadError>();
        assert_send_sync::<SourceError>();
    }
}
