//! Engine options with sensible defaults.
//!
//! [`EngineOptions`] controls per-source time budgets, result size, session
//! retention and the circuit breaker. Scoring weights and credentials live in
//! [`crate::settings`] because they change at runtime.

use std::time::Duration;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::LeadError;

/// Options fixed for the lifetime of a [`LeadEngine`](crate::LeadEngine).
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Independent time budget of each source's fetch.
    pub source_timeout: Duration,
    /// Maximum number of leads returned after ranking.
    pub max_leads: usize,
    /// How long a returned result stays available for export and re-scoring.
    pub session_ttl: Duration,
    /// Maximum number of sessions kept at once.
    pub session_capacity: u64,
    pub breaker: CircuitBreakerConfig,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(10),
            max_leads: 100,
            session_ttl: Duration::from_secs(30 * 60),
            session_capacity: 100,
            breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl EngineOptions {
    /// Validates these options.
    ///
    /// Checks:
    /// - `source_timeout` must be non-zero
    /// - `max_leads` must be greater than 0
    /// - `session_ttl` must be non-zero
    /// - `session_capacity` must be greater than 0
    /// - `breaker.failure_threshold` must be greater than 0
    pub fn validate(&self) -> Result<(), LeadError> {
        if self.source_timeout.is_zero() {
            return Err(LeadError::Config(
                "source_timeout must be greater than 0".into(),
            ));
        }
        if self.max_leads == 0 {
            return Err(LeadError::Config(
                "max_leads must be greater than 0".into(),
            ));
        }
        if self.session_ttl.is_zero() {
            return Err(LeadError::Config(
                "session_ttl must be greater than 0".into(),
            ));
        }
        if self.session_capacity == 0 {
            return Err(LeadError::Config(
                "session_capacity must be greater than 0".into(),
            ));
        }
        self.breaker.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_have_sensible_values() {
        let options = EngineOptions::default();
        assert_eq!(options.source_timeout, Duration::from_secs(10));
        assert_eq!(options.max_leads, 100);
        assert_eq!(options.session_ttl, Duration::from_secs(1800));
        assert_eq!(options.session_capacity, 100);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn zero_timeout_rejected() {
        let options = EngineOptions {
            source_timeout: Duration::ZERO,
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("source_timeout"));
    }

    #[test]
    fn zero_max_leads_rejected() {
        let options = EngineOptions {
            max_leads: 0,
            ..Default::default()
        };
        let err = options.validate().unwrap_err();
        assert!(err.to_string().contains("max_leads"));
    }

    #[test]
    fn zero_session_limits_rejected() {
        let ttl = EngineOptions {
            session_ttl: Duration::ZERO,
            ..Default::default()
        };
        assert!(ttl.validate().unwrap_err().to_string().contains("session_ttl"));
        let capacity = EngineOptions {
            session_capacity: 0,
            ..Default::default()
        };
        assert!(capacity
            .validate()
            .unwrap_err()
            .to_string()
            .contains("session_capacity"));
    }

    #[test]
    fn breaker_threshold_checked() {
        let options = EngineOptions {
            breaker: CircuitBreakerConfig {
                failure_threshold: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(options
            .validate()
            .unwrap_err()
            .to_string()
            .contains("failure_threshold"));
    }
}
