//! Core types: sources, candidate records, leads, queries and outcomes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::LeadError;

/// Longest accepted keyword string, in bytes.
const MAX_KEYWORDS_LEN: usize = 512;

/// External providers that can contribute candidate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// LinkedIn people search.
    LinkedIn,
    /// Twitter / X user search.
    Twitter,
    /// GitHub user search.
    GitHub,
    /// Generic web / company-page sources.
    Web,
}

impl Source {
    /// Returns the human-readable name of this source.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LinkedIn => "LinkedIn",
            Self::Twitter => "Twitter",
            Self::GitHub => "GitHub",
            Self::Web => "Web",
        }
    }

    /// Returns the lowercase identifier used in queries and settings.
    pub fn id(&self) -> &'static str {
        match self {
            Self::LinkedIn => "linkedin",
            Self::Twitter => "twitter",
            Self::GitHub => "github",
            Self::Web => "web",
        }
    }

    /// Returns all known sources.
    pub fn all() -> &'static [Source] {
        &[Self::LinkedIn, Self::Twitter, Self::GitHub, Self::Web]
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = LeadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|source| source.id() == wanted)
            .ok_or_else(|| LeadError::InvalidQuery(format!("unknown source: {s}")))
    }
}

/// One observation of a person from one source, before deduplication.
///
/// Empty strings mean "not supplied by this provider". Records are handed to
/// the pipeline by value and only read from then on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Full display name as the provider reports it.
    #[serde(default)]
    pub full_name: String,
    /// Profile URLs on any network (LinkedIn, Twitter, GitHub, homepage).
    #[serde(default)]
    pub profile_urls: Vec<String>,
    /// Contact email, when the provider exposes one.
    #[serde(default)]
    pub email: Option<String>,
    /// Current job title.
    #[serde(default)]
    pub title: String,
    /// Current employer.
    #[serde(default)]
    pub company: String,
    /// Industry of the current employer.
    #[serde(default)]
    pub industry: String,
    /// Free-form location.
    #[serde(default)]
    pub location: String,
    /// Free-text bio or headline.
    #[serde(default)]
    pub bio: String,
    /// Listed skills.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Activity signals such as `active_poster` or `job_change_6mo`.
    #[serde(default)]
    pub engagement_signals: Vec<String>,
    /// Which provider produced this record.
    pub source: Source,
    /// The provider's own id for this record.
    #[serde(default)]
    pub source_record_id: String,
    /// When the record was retrieved from the provider.
    #[serde(default = "Utc::now")]
    pub retrieved_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// Create a record with only a source and a name set.
    pub fn new(source: Source, full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            profile_urls: Vec::new(),
            email: None,
            title: String::new(),
            company: String::new(),
            industry: String::new(),
            location: String::new(),
            bio: String::new(),
            skills: Vec::new(),
            engagement_signals: Vec::new(),
            source,
            source_record_id: String::new(),
            retrieved_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = company.into();
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = industry.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = bio.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_profile_url(mut self, url: impl Into<String>) -> Self {
        self.profile_urls.push(url.into());
        self
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_engagement_signals<I, S>(mut self, signals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engagement_signals = signals.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.source_record_id = id.into();
        self
    }

    pub fn retrieved_at(mut self, at: DateTime<Utc>) -> Self {
        self.retrieved_at = at;
        self
    }

    /// Returns `true` if the record carries a name, a profile URL or an email.
    pub fn has_identity_hints(&self) -> bool {
        !self.full_name.trim().is_empty()
            || self.profile_urls.iter().any(|u| !u.trim().is_empty())
            || self.email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

/// Stable per-session lead identifier, assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub u64);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Provenance of one candidate record merged into a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContribution {
    pub source: Source,
    pub record_id: String,
    pub profile_urls: Vec<String>,
    pub retrieved_at: DateTime<Utc>,
}

/// Per-factor scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub decision_maker: f64,
    pub company_fit: f64,
    pub growth_potential: f64,
    pub skill_relevance: f64,
    pub location_relevance: f64,
    pub engagement_potential: f64,
}

impl ScoreBreakdown {
    /// The same value for every factor.
    pub fn uniform(value: f64) -> Self {
        Self {
            decision_maker: value,
            company_fit: value,
            growth_potential: value,
            skill_relevance: value,
            location_relevance: value,
            engagement_potential: value,
        }
    }

    /// Factor values in canonical order, matching
    /// [`ScoringWeights::as_array`](crate::settings::ScoringWeights::as_array).
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

    /// Copy with every factor clamped to `[0, 1]`; NaN becomes 0.
    pub fn clamped(&self) -> Self {
        fn unit(v: f64) -> f64 {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, 1.0)
            }
        }
        Self {
            decision_maker: unit(self.decision_maker),
            company_fit: unit(self.company_fit),
            growth_potential: unit(self.growth_potential),
            skill_relevance: unit(self.skill_relevance),
            location_relevance: unit(self.location_relevance),
            engagement_potential: unit(self.engagement_potential),
        }
    }
}

/// A deduplicated, scored person assembled from one or more candidate records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub title: String,
    pub company: String,
    pub industry: String,
    pub location: String,
    pub bio: String,
    pub email: Option<String>,
    pub skills: Vec<String>,
    pub engagement_signals: Vec<String>,
    /// One entry per merged candidate record, in merge order.
    pub sources: Vec<SourceContribution>,
    /// Composite score, 0–100.
    pub score: u8,
    pub breakdown: ScoreBreakdown,
}

impl Lead {
    /// Distinct sources that contributed to this lead, sorted.
    pub fn source_kinds(&self) -> Vec<Source> {
        let mut kinds: Vec<Source> = self.sources.iter().map(|c| c.source).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// First profile URL contributed by the given source.
    pub fn profile_url(&self, source: Source) -> Option<&str> {
        self.sources
            .iter()
            .filter(|c| c.source == source)
            .flat_map(|c| c.profile_urls.iter())
            .map(String::as_str)
            .find(|u| !u.is_empty())
    }
}

/// One search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Free-text keywords.
    #[serde(default)]
    pub keywords: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Sources to query. Defaults to LinkedIn.
    #[serde(default = "default_sources")]
    pub sources: Vec<Source>,
    /// Skills the caller is targeting; feeds skill relevance.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Industries the caller is targeting; feeds company fit.
    #[serde(default)]
    pub industries: Vec<String>,
    /// Drop leads scoring below this after ranking.
    #[serde(default)]
    pub min_score: Option<u8>,
}

fn default_sources() -> Vec<Source> {
    vec![Source::LinkedIn]
}

impl Default for Query {
    fn default() -> Self {
        Self {
            keywords: String::new(),
            title: None,
            company: None,
            location: None,
            sources: default_sources(),
            skills: Vec::new(),
            industries: Vec::new(),
            min_score: None,
        }
    }
}

impl Query {
    /// Keyword query against the default source set.
    pub fn new(keywords: impl Into<String>) -> Self {
        Self {
            keywords: keywords.into(),
            ..Default::default()
        }
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = Source>) -> Self {
        self.sources = sources.into_iter().collect();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Enabled sources with duplicates removed, first occurrence kept.
    pub fn enabled_sources(&self) -> Vec<Source> {
        let mut seen = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            if !seen.contains(source) {
                seen.push(*source);
            }
        }
        seen
    }

    /// Rejects queries that cannot be searched.
    ///
    /// Checks:
    /// - at least one source is enabled
    /// - at least one of keywords, title, company, location or skills is set
    /// - keywords are at most 512 bytes
    /// - `min_score` is at most 100
    pub fn validate(&self) -> Result<(), LeadError> {
        if self.sources.is_empty() {
            return Err(LeadError::InvalidQuery(
                "at least one source must be enabled".into(),
            ));
        }
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        let has_criteria = !self.keywords.trim().is_empty()
            || filled(&self.title)
            || filled(&self.company)
            || filled(&self.location)
            || self.skills.iter().any(|s| !s.trim().is_empty());
        if !has_criteria {
            return Err(LeadError::InvalidQuery(
                "at least one search criterion is required".into(),
            ));
        }
        if self.keywords.len() > MAX_KEYWORDS_LEN {
            return Err(LeadError::InvalidQuery(format!(
                "keywords exceed {MAX_KEYWORDS_LEN} bytes"
            )));
        }
        if self.min_score.is_some_and(|s| s > 100) {
            return Err(LeadError::InvalidQuery(
                "min_score must be at most 100".into(),
            ));
        }
        Ok(())
    }
}

/// Identifier of one aggregation session (one returned result).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = LeadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| LeadError::UnknownSession(s.to_string()))
    }
}

/// How a source's fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOutcome {
    /// The source's stream ended normally.
    Succeeded,
    /// The source delivered some records, then failed.
    Partial,
    /// The source delivered nothing usable.
    Failed,
}

/// Per-source entry of the status summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub source: Source,
    pub status: SourceOutcome,
    /// Candidate records delivered by this source.
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The result of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub session_id: SessionId,
    /// Ranked leads: score descending, then id ascending.
    pub leads: Vec<Lead>,
    pub source_status: Vec<SourceStatus>,
    /// `true` if the caller cancelled before every source finished.
    pub cancelled: bool,
}

impl SearchOutcome {
    /// Returns `true` if no source produced any data.
    pub fn all_sources_failed(&self) -> bool {
        !self.source_status.is_empty()
            && self
                .source_status
                .iter()
                .all(|s| s.status == SourceOutcome::Failed)
    }

    /// Sources that failed or stopped early.
    pub fn failures(&self) -> impl Iterator<Item = &SourceStatus> {
        self.source_status
            .iter()
            .filter(|s| s.status != SourceOutcome::Succeeded)
    }

    pub fn lead(&self, id: LeadId) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_display_and_id() {
        assert_eq!(Source::LinkedIn.to_string(), "LinkedIn");
        assert_eq!(Source::GitHub.id(), "github");
        assert_eq!(Source::all().len(), 4);
    }

    #[test]
    fn source_parses_case_insensitively() {
        assert_eq!("LinkedIn".parse::<Source>().ok(), Some(Source::LinkedIn));
        assert_eq!(" twitter ".parse::<Source>().ok(), Some(Source::Twitter));
        assert!("myspace".parse::<Source>().is_err());
    }

    #[test]
    fn source_serializes_lowercase() {
        let json = serde_json::to_string(&Source::LinkedIn).expect("serialize");
        assert_eq!(json, "\"linkedin\"");
        let decoded: Source = serde_json::from_str("\"github\"").expect("deserialize");
        assert_eq!(decoded, Source::GitHub);
    }

    #[test]
    fn candidate_record_deserializes_with_defaults() {
        let json = r#"{"full_name": "Jane Doe", "source": "twitter"}"#;
        let record: CandidateRecord = serde_json::from_str(json).expect("deserialize");
        assert_eq!(record.full_name, "Jane Doe");
        assert_eq!(record.source, Source::Twitter);
        assert!(record.profile_urls.is_empty());
        assert!(record.email.is_none());
        assert!(record.title.is_empty());
    }

    #[test]
    fn identity_hints() {
        assert!(CandidateRecord::new(Source::Web, "A").has_identity_hints());
        assert!(CandidateRecord::new(Source::Web, "")
            .with_email("a@b.com")
            .has_identity_hints());
        assert!(CandidateRecord::new(Source::Web, " ")
            .with_profile_url("https://x.com/a")
            .has_identity_hints());
        assert!(!CandidateRecord::new(Source::Web, "  ")
            .with_company("Acme")
            .with_title("CTO")
            .has_identity_hints());
    }

    #[test]
    fn breakdown_clamps_out_of_range_and_nan() {
        let raw = ScoreBreakdown {
            decision_maker: 1.5,
            company_fit: -0.2,
            growth_potential: f64::NAN,
            ..ScoreBreakdown::uniform(0.5)
        };
        let clamped = raw.clamped();
        assert!((clamped.decision_maker - 1.0).abs() < f64::EPSILON);
        assert!(clamped.company_fit.abs() < f64::EPSILON);
        assert!(clamped.growth_potential.abs() < f64::EPSILON);
        assert!((clamped.skill_relevance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn query_defaults_to_linkedin() {
        let q: Query = serde_json::from_str(r#"{"keywords": "rust"}"#).expect("deserialize");
        assert_eq!(q.sources, vec![Source::LinkedIn]);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn query_without_sources_rejected() {
        let q = Query::new("rust").with_sources([]);
        let err = q.validate().unwrap_err();
        assert!(err.to_string().contains("source"));
    }

    #[test]
    fn query_without_criteria_rejected() {
        let q = Query::new("   ");
        let err = q.validate().unwrap_err();
        assert!(err.to_string().contains("criterion"));
    }

    #[test]
    fn query_with_only_title_is_valid() {
        let q = Query::new("").with_title("CTO");
        assert!(q.validate().is_ok());
    }

    #[test]
    fn query_rejects_min_score_above_100() {
        let q = Query {
            min_score: Some(101),
            ..Query::new("rust")
        };
        assert!(q.validate().is_err());
    }

    #[test]
    fn enabled_sources_drops_duplicates() {
        let q = Query::new("x").with_sources([Source::Twitter, Source::LinkedIn, Source::Twitter]);
        assert_eq!(q.enabled_sources(), vec![Source::Twitter, Source::LinkedIn]);
    }

    #[test]
    fn outcome_serializes_camel_case() {
        let outcome = SearchOutcome {
            session_id: SessionId::new(),
            leads: vec![],
            source_status: vec![SourceStatus {
                source: Source::LinkedIn,
                status: SourceOutcome::Failed,
                count: 0,
                error: Some("timed out after 10ms".into()),
            }],
            cancelled: false,
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert!(json.get("sourceStatus").is_some());
        assert_eq!(json["sourceStatus"][0]["status"], "failed");
        assert_eq!(json["sourceStatus"][0]["source"], "linkedin");
        assert!(outcome.all_sources_failed());
    }

    #[test]
    fn session_id_parses_back() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
