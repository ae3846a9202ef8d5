//! Scoring weights, provider credentials and the process-wide store that
//! holds them.
//!
//! [`ConfigStore`] swaps the whole [`EngineSettings`] value at once, so a
//! scoring pass that grabbed a snapshot with [`ConfigStore::get`] never sees
//! a half-applied update.

use std::fmt;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::LeadError;
use crate::types::Source;

/// Allowed distance of the raw weight sum from 1.0 before a warning is raised.
pub const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Relative importance of the six scoring factors.
///
/// Weights need not sum to 1.0; the scorer normalises them. Field names in
/// serialised form match the settings form (`decision_maker_weight`, ...);
/// missing fields take their default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    #[serde(rename = "decision_maker_weight")]
    pub decision_maker: f64,
    #[serde(rename = "company_fit_weight")]
    pub company_fit: f64,
    #[serde(rename = "growth_potential_weight")]
    pub growth_potential: f64,
    #[serde(rename = "skill_relevance_weight")]
    pub skill_relevance: f64,
    #[serde(rename = "location_relevance_weight")]
    pub location_relevance: f64,
    #[serde(rename = "engagement_potential_weight")]
    pub engagement_potential: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            decision_maker: 0.25,
            company_fit: 0.20,
            growth_potential: 0.15,
            skill_relevance: 0.15,
            location_relevance: 0.10,
            engagement_potential: 0.15,
        }
    }
}

impl ScoringWeights {
    /// Field names in canonical factor order.
    pub const FIELDS: [&'static str; 6] = [
        "decision_maker_weight",
        "company_fit_weight",
        "growth_potential_weight",
        "skill_relevance_weight",
        "location_relevance_weight",
        "engagement_potential_weight",
    ];

    /// Every weight set to the same value.
    pub fn uniform(value: f64) -> Self {
        Self::from_array([value; 6])
    }

    /// Weights in canonical factor order.
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.decision_maker,
            self.company_fit,
            self.growth_potential,
            self.skill_relevance,
            self.location_relevance,
            self.engagement_potential,
        ]
    }

    pub fn from_array(values: [f64; 6]) -> Self {
        Self {
            decision_maker: values[0],
            company_fit: values[1],
            growth_potential: values[2],
            skill_relevance: values[3],
            location_relevance: values[4],
            engagement_potential: values[5],
        }
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Checks every weight is a finite number in `[0, 1]`.
    ///
    /// Returns the advisory warnings on success. A sum away from 1.0 is a
    /// warning, never an error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, LeadError> {
        for (field, value) in Self::FIELDS.into_iter().zip(self.as_array()) {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(LeadError::InvalidWeight { field, value });
            }
        }
        let sum = self.sum();
        let mut warnings = Vec::new();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            warnings.push(ConfigWarning::WeightSumDeviation { sum });
        }
        Ok(warnings)
    }
}

/// Provider API keys.
///
/// `Debug` redacts the values; they are only read by source adapters.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_api_key: Option<String>,
}

impl ApiCredentials {
    /// API key for the given source, if one is configured and non-empty.
    pub fn for_source(&self, source: Source) -> Option<&str> {
        let key = match source {
            Source::LinkedIn => self.linkedin_api_key.as_deref(),
            Source::Twitter => self.twitter_api_key.as_deref(),
            Source::GitHub | Source::Web => None,
        };
        key.filter(|k| !k.trim().is_empty())
    }

    /// Returns a copy where only the provided, non-empty keys replace the
    /// current ones.
    pub fn merged(&self, update: &ApiCredentials) -> Self {
        let pick = |new: &Option<String>, old: &Option<String>| match new {
            Some(k) if !k.trim().is_empty() => Some(k.clone()),
            _ => old.clone(),
        };
        Self {
            linkedin_api_key: pick(&update.linkedin_api_key, &self.linkedin_api_key),
            twitter_api_key: pick(&update.twitter_api_key, &self.twitter_api_key),
        }
    }
}

impl fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &Option<String>| if k.is_some() { "<redacted>" } else { "<unset>" };
        f.debug_struct("ApiCredentials")
            .field("linkedin_api_key", &redact(&self.linkedin_api_key))
            .field("twitter_api_key", &redact(&self.twitter_api_key))
            .finish()
    }
}

/// Everything the store swaps as one unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub scoring: ScoringWeights,
    #[serde(default)]
    pub credentials: ApiCredentials,
}

/// Settings safe to hand to a UI: weights only, no secrets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublicSettings {
    pub scoring: ScoringWeights,
}

/// Non-blocking findings of settings validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigWarning {
    /// The raw weights do not sum to 1.0 within [`WEIGHT_SUM_TOLERANCE`].
    WeightSumDeviation { sum: f64 },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeightSumDeviation { sum } => {
                write!(f, "scoring weights sum to {sum:.3}; they will be normalised")
            }
        }
    }
}

/// Result of an accepted settings update.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub warnings: Vec<ConfigWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Holds the single active [`EngineSettings`].
///
/// Reads clone an `Arc`; writes validate first and then replace the whole
/// value, leaving the previous settings untouched on rejection.
#[derive(Debug)]
pub struct ConfigStore {
    current: RwLock<Arc<EngineSettings>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl ConfigStore {
    /// Create a store with initial settings loaded by the host.
    ///
    /// Startup settings are not rejected: out-of-range weights are logged and
    /// the scorer's normalisation copes with them.
    pub fn new(settings: EngineSettings) -> Self {
        if let Err(err) = settings.scoring.validate() {
            tracing::warn!(error = %err, "initial scoring weights are invalid");
        }
        Self {
            current: RwLock::new(Arc::new(settings)),
        }
    }

    /// Snapshot of the active settings.
    pub fn get(&self) -> Arc<EngineSettings> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Validate and install new settings.
    ///
    /// # Errors
    ///
    /// Returns [`LeadError::InvalidWeight`] naming the first offending field;
    /// the active settings are unchanged in that case.
    pub fn set(&self, settings: EngineSettings) -> Result<ValidationReport, LeadError> {
        let warnings = settings.scoring.validate()?;
        for warning in &warnings {
            tracing::warn!(%warning, "accepted scoring weights with warning");
        }
        let next = Arc::new(settings);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
        tracing::debug!("engine settings replaced");
        Ok(ValidationReport { warnings })
    }

    /// Replace only the scoring weights.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigStore::set`].
    pub fn update_weights(&self, weights: ScoringWeights) -> Result<ValidationReport, LeadError> {
        let mut next = (*self.get()).clone();
        next.scoring = weights;
        self.set(next)
    }

    /// Replace only the provided, non-empty API keys.
    ///
    /// # Errors
    ///
    /// Fails only if the active weights themselves are invalid, which can
    /// happen when the host started with out-of-range values.
    pub fn update_credentials(
        &self,
        update: &ApiCredentials,
    ) -> Result<ValidationReport, LeadError> {
        let mut next = (*self.get()).clone();
        next.credentials = next.credentials.merged(update);
        self.set(next)
    }

    pub fn public_view(&self) -> PublicSettings {
        PublicSettings {
            scoring: self.get().scoring,
        }
    }
}
