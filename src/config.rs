//! Host settings persisted as TOML.
//!
//! One file holds the scoring weights, provider API keys, engine limits and
//! the fixture file used as a development source. Missing sections and
//! fields fall back to defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use lead_engine::{
    ApiCredentials, CircuitBreakerConfig, EngineOptions, EngineSettings, ScoringWeights, Source,
    ValidationReport,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Top-level settings file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadgenConfig {
    /// Factor weights used by the scorer.
    pub scoring: ScoringWeights,
    /// Provider API keys. Stored in plain text; keep the file private.
    pub credentials: ApiCredentials,
    pub search: SearchConfig,
    pub sources: SourcesConfig,
}

/// Engine limits and search defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Time budget of each source, in milliseconds.
    pub source_timeout_ms: u64,
    /// Maximum leads returned per search.
    pub max_leads: usize,
    /// Sources queried when a search names none.
    pub default_sources: Vec<Source>,
    /// How long results stay available for export, in seconds.
    pub session_ttl_secs: u64,
    pub session_capacity: u64,
    /// Consecutive failures before a source is skipped.
    pub failure_threshold: u32,
    /// Seconds a skipped source waits before it is retried.
    pub cooldown_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let engine = EngineOptions::default();
        Self {
            source_timeout_ms: u64::try_from(engine.source_timeout.as_millis()).unwrap_or(10_000),
            max_leads: engine.max_leads,
            default_sources: vec![Source::LinkedIn],
            session_ttl_secs: engine.session_ttl.as_secs(),
            session_capacity: engine.session_capacity,
            failure_threshold: engine.breaker.failure_threshold,
            cooldown_secs: engine.breaker.cooldown.as_secs(),
        }
    }
}

/// Where candidate records come from when no live connector is installed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// JSON fixture file of candidate records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixtures: Option<PathBuf>,
}

impl LeadgenConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Like [`from_file`](Self::from_file), but a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/leadgen/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("leadgen").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("leadgen")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/leadgen-config/config.toml")
        }
    }

    /// Check weights and engine limits.
    ///
    /// # Errors
    ///
    /// Returns the engine's error for an out-of-range weight or an invalid
    /// limit.
    pub fn validate(&self) -> Result<ValidationReport> {
        let warnings = self.scoring.validate()?;
        self.engine_options().validate()?;
        Ok(ValidationReport { warnings })
    }

    /// Weights and credentials handed to the engine's settings store.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            scoring: self.scoring,
            credentials: self.credentials.clone(),
        }
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            source_timeout: Duration::from_millis(self.search.source_timeout_ms),
            max_leads: self.search.max_leads,
            session_ttl: Duration::from_secs(self.search.session_ttl_secs),
            session_capacity: self.search.session_capacity,
            breaker: CircuitBreakerConfig {
                failure_threshold: self.search.failure_threshold,
                cooldown: Duration::from_secs(self.search.cooldown_secs),
            },
        }
    }
}
