//! Per-source circuit breaker.
//!
//! Tracks consecutive failures per source and skips sources that keep
//! failing. After a cooldown a tripped source gets one probe run, which
//! either restores it or trips it again.
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └───▲────┘             └────┬─────┘
//!     │        success         │       failure         │
//!     └────────────────────────┴───────────────────────┘
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::LeadError;
use crate::types::Source;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Runs normally.
    Closed,
    /// Skipped until the cooldown expires.
    Open,
    /// Cooldown elapsed; the next run is a probe.
    HalfOpen,
}

#[derive(Debug, Clone)]
struct Health {
    state: CircuitState,
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            last_failure_at: None,
        }
    }
}

/// Snapshot of one source's breaker, as reported to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceHealth {
    pub source: Source,
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the circuit.
    pub failure_threshold: u32,
    /// Time spent Open before a probe is allowed.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    /// A zero threshold would trip before the first run.
    pub fn validate(&self) -> Result<(), LeadError> {
        if self.failure_threshold == 0 {
            return Err(LeadError::Config(
                "failure_threshold must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Independent breakers for every source seen so far.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    sources: HashMap<Source, Health>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            sources: HashMap::new(),
        }
    }

    /// Close the circuit and reset the failure count.
    pub fn record_success(&mut self, source: Source) {
        let health = self.sources.entry(source).or_default();
        if health.state != CircuitState::Closed {
            tracing::debug!(%source, "circuit closed");
        }
        health.state = CircuitState::Closed;
        health.consecutive_failures = 0;
    }

    /// Count a failure; trips to Open at the threshold, or immediately when
    /// a half-open probe fails.
    pub fn record_failure(&mut self, source: Source) {
        let threshold = self.config.failure_threshold;
        let health = self.sources.entry(source).or_default();
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.last_failure_at = Some(Instant::now());

        let probe_failed = health.state == CircuitState::HalfOpen;
        if probe_failed || health.consecutive_failures >= threshold {
            if health.state != CircuitState::Open {
                tracing::warn!(
                    %source,
                    failures = health.consecutive_failures,
                    "circuit opened"
                );
            }
            health.state = CircuitState::Open;
        }
    }

    /// Whether the source should be queried now.
    ///
    /// An Open circuit whose cooldown has elapsed moves to HalfOpen and
    /// allows the attempt.
    pub fn should_attempt(&mut self, source: Source) -> bool {
        let cooldown = self.config.cooldown;
        let health = self.sources.entry(source).or_default();

        match health.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled = health
                    .last_failure_at
                    .is_none_or(|t| t.elapsed() >= cooldown);
                if cooled {
                    health.state = CircuitState::HalfOpen;
                }
                cooled
            }
        }
    }

    pub fn state(&self, source: Source) -> CircuitState {
        self.sources
            .get(&source)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// Health of every tracked source, in canonical source order.
    pub fn health_report(&self) -> Vec<SourceHealth> {
        let mut report: Vec<SourceHealth> = self
            .sources
            .iter()
            .map(|(source, health)| SourceHealth {
                source: *source,
                state: health.state,
                consecutive_failures: health.consecutive_failures,
            })
            .collect();
        report.sort_by_key(|h| h.source);
        report
    }

    pub fn reset(&mut self) {
        self.sources.clear();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_breaker(threshold: u32, cooldown: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown,
        })
    }

    const LONG: Duration = Duration::from_secs(600);

    #[test]
    fn unseen_source_is_closed() {
        let mut breaker = make_breaker(3, LONG);
        assert_eq!(breaker.state(Source::LinkedIn), CircuitState::Closed);
        assert!(breaker.should_attempt(Source::LinkedIn));
    }

    #[test]
    fn trips_at_threshold_and_blocks() {
        let mut breaker = make_breaker(3, LONG);
        breaker.record_failure(Source::Twitter);
        breaker.record_failure(Source::Twitter);
        assert_eq!(breaker.state(Source::Twitter), CircuitState::Closed);
        breaker.record_failure(Source::Twitter);
        assert_eq!(breaker.state(Source::Twitter), CircuitState::Open);
        assert!(!breaker.should_attempt(Source::Twitter));
    }

    #[test]
    fn cooldown_moves_to_half_open() {
        let mut breaker = make_breaker(1, Duration::ZERO);
        breaker.record_failure(Source::GitHub);
        assert!(breaker.should_attempt(Source::GitHub));
        assert_eq!(breaker.state(Source::GitHub), CircuitState::HalfOpen);
    }

    #[test]
    fn probe_success_closes() {
        let mut breaker = make_breaker(2, Duration::ZERO);
        breaker.record_failure(Source::Web);
        breaker.record_failure(Source::Web);
        let _ = breaker.should_attempt(Source::Web);
        breaker.record_success(Source::Web);
        assert_eq!(breaker.state(Source::Web), CircuitState::Closed);
        assert_eq!(breaker.health_report()[0].consecutive_failures, 0);
    }

    #[test]
    fn probe_failure_reopens_immediately() {
        let mut breaker = make_breaker(3, Duration::ZERO);
        for _ in 0..3 {
            breaker.record_failure(Source::Web);
        }
        let _ = breaker.should_attempt(Source::Web);
        assert_eq!(breaker.state(Source::Web), CircuitState::HalfOpen);
        breaker.record_failure(Source::Web);
        assert_eq!(breaker.state(Source::Web), CircuitState::Open);
    }

    #[test]
    fn sources_are_independent() {
        let mut breaker = make_breaker(1, LONG);
        breaker.record_failure(Source::LinkedIn);
        assert!(!breaker.should_attempt(Source::LinkedIn));
        assert!(breaker.should_attempt(Source::Twitter));
    }

    #[test]
    fn alternating_results_never_trip() {
        let mut breaker = make_breaker(2, LONG);
        for _ in 0..10 {
            breaker.record_failure(Source::LinkedIn);
            breaker.record_success(Source::LinkedIn);
        }
        assert_eq!(breaker.state(Source::LinkedIn), CircuitState::Closed);
    }

    #[test]
    fn health_report_is_sorted() {
        let mut breaker = make_breaker(3, LONG);
        breaker.record_success(Source::Web);
        breaker.record_failure(Source::LinkedIn);
        let report = breaker.health_report();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].source, Source::LinkedIn);
        assert_eq!(report[0].consecutive_failures, 1);
        assert_eq!(report[1].source, Source::Web);

        breaker.reset();
        assert!(breaker.health_report().is_empty());
    }

    #[test]
    fn zero_threshold_rejected() {
        let config = CircuitBreakerConfig {
            failure_threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(CircuitBreakerConfig::default().validate().is_ok());
    }
}
