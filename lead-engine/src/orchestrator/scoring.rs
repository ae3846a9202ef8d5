//! Weighted composite scoring for leads.
//!
//! Each lead gets six factor values in `[0, 1]` from a [`FactorRules`]
//! implementation, combined with the configured weights:
//!
//! ```text
//! normalized_weight[i] = weight[i] / sum(weight)
//! composite            = 100 * Σ normalized_weight[i] * factor_value[i]
//! ```
//!
//! Negative or non-finite weights count as zero. When nothing positive is
//! left the six factors are weighted equally, so scoring degrades instead of
//! failing. The calculation is pure: the same lead, query and weights always
//! give the same score.

use std::collections::HashSet;

use crate::settings::ScoringWeights;
use crate::types::{Lead, Query, ScoreBreakdown};

/// Equal weight used when the configured weights are degenerate.
const EQUAL_WEIGHT: f64 = 1.0 / 6.0;

/// Computes per-factor values for a lead.
///
/// Implementations must be pure with respect to their inputs; the pipeline
/// may score the same lead several times (for example after a weight edit)
/// and expects identical results.
pub trait FactorRules: Send + Sync {
    /// Evaluate the six scoring factors. Values outside `[0, 1]` are clamped
    /// by the caller.
    fn evaluate(&self, lead: &Lead, query: &Query) -> ScoreBreakdown;
}

/// Normalise weights so they sum to 1.0.
///
/// Falls back to equal weights (1/6 each) when the positive weights sum to
/// zero or the sum is not finite.
pub fn normalized_weights(weights: &ScoringWeights) -> [f64; 6] {
    let positive = weights
        .as_array()
        .map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 });
    let sum: f64 = positive.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return [EQUAL_WEIGHT; 6];
    }
    positive.map(|w| w / sum)
}

/// Composite score in `[0, 100]` for a factor breakdown.
pub fn composite_score(breakdown: &ScoreBreakdown, weights: &ScoringWeights) -> f64 {
    let values = breakdown.clamped().as_array();
    let total: f64 = normalized_weights(weights)
        .iter()
        .zip(values)
        .map(|(w, v)| w * v)
        .sum();
    (100.0 * total).clamp(0.0, 100.0)
}

/// Integer score exposed to callers: the composite rounded to nearest.
pub fn display_score(composite: f64) -> u8 {
    composite.round().clamp(0.0, 100.0) as u8
}

/// Evaluate, combine and store the score and breakdown on `lead`.
pub fn score_lead(lead: &mut Lead, query: &Query, weights: &ScoringWeights, rules: &dyn FactorRules) {
    let breakdown = rules.evaluate(lead, query).clamped();
    lead.score = display_score(composite_score(&breakdown, weights));
    lead.breakdown = breakdown;
}

/// Score every lead in place.
pub fn score_leads(
    leads: &mut [Lead],
    query: &Query,
    weights: &ScoringWeights,
    rules: &dyn FactorRules,
) {
    for lead in leads.iter_mut() {
        score_lead(lead, query, weights, rules);
    }
}

/// Rule-of-thumb factor values from title, employer, skills, location and
/// engagement signals.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicRules;

impl FactorRules for HeuristicRules {
    fn evaluate(&self, lead: &Lead, query: &Query) -> ScoreBreakdown {
        ScoreBreakdown {
            decision_maker: decision_maker_fit(&lead.title),
            company_fit: company_fit(lead, query),
            growth_potential: growth_potential(lead),
            skill_relevance: skill_relevance(lead, query),
            location_relevance: location_relevance(lead, query),
            engagement_potential: engagement_potential(lead),
        }
    }
}

/// Title seniority: C-level 1.0, VP/director 0.8, manager 0.6,
/// senior IC 0.4, anything else 0.2.
pub fn decision_maker_fit(title: &str) -> f64 {
    let lowered = title.to_lowercase();
    let tokens = tokens(&lowered);
    let has = |words: &[&str]| words.iter().any(|w| tokens.contains(*w));

    if has(&["ceo", "cto", "cio", "cfo", "coo", "cmo", "chief"]) {
        1.0
    } else if has(&["vp", "svp", "evp", "director"]) || lowered.contains("vice president") {
        0.8
    } else if has(&["manager", "head"]) {
        0.6
    } else if has(&["senior", "sr", "lead", "principal"]) {
        0.4
    } else {
        0.2
    }
}

fn company_fit(lead: &Lead, query: &Query) -> f64 {
    let mut score: f64 = 0.5;
    let industry = lead.industry.trim();
    if !industry.is_empty()
        && query
            .industries
            .iter()
            .any(|i| i.trim().eq_ignore_ascii_case(industry))
    {
        score += 0.2;
    }
    if let Some(wanted) = non_blank(&query.company) {
        if lead.company.to_lowercase().contains(&wanted.to_lowercase()) {
            score += 0.2;
        }
    }
    score.min(1.0)
}

fn growth_potential(lead: &Lead) -> f64 {
    let growing = lead
        .engagement_signals
        .iter()
        .any(|s| matches!(s.to_lowercase().as_str(), "growing_company" | "hiring"));
    if growing {
        0.9
    } else {
        0.7
    }
}

fn skill_relevance(lead: &Lead, query: &Query) -> f64 {
    let targets: Vec<String> = if query.skills.iter().any(|s| !s.trim().is_empty()) {
        query
            .skills
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        tokens(&query.keywords.to_lowercase()).into_iter().collect()
    };
    if targets.is_empty() {
        return 0.5;
    }

    let skills: Vec<String> = lead.skills.iter().map(|s| s.to_lowercase()).collect();
    let text = format!("{} {}", lead.title, lead.bio).to_lowercase();
    if skills.is_empty() && text.trim().is_empty() {
        return 0.5;
    }

    let matched = targets
        .iter()
        .filter(|t| skills.iter().any(|s| s.contains(t.as_str())) || text.contains(t.as_str()))
        .count();
    (matched as f64 / targets.len() as f64).min(1.0)
}

fn location_relevance(lead: &Lead, query: &Query) -> f64 {
    let Some(wanted) = non_blank(&query.location) else {
        return 0.5;
    };
    let have = lead.location.trim().to_lowercase();
    if have.is_empty() {
        return 0.5;
    }
    let wanted = wanted.to_lowercase();
    if have.contains(&wanted) || wanted.contains(&have) {
        1.0
    } else {
        0.3
    }
}

fn engagement_potential(lead: &Lead) -> f64 {
    match lead.engagement_signals.len() {
        0 => 0.5,
        1 => 0.6,
        2 => 0.8,
        _ => 1.0,
    }
}

fn tokens(lowered: &str) -> HashSet<String> {
    lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 2)
        .map(str::to_string)
        .collect()
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::dedup::deduplicate;
    use crate::types::{CandidateRecord, Source};

    struct FixedRules(ScoreBreakdown);

    impl FactorRules for FixedRules {
        fn evaluate(&self, _lead: &Lead, _query: &Query) -> ScoreBreakdown {
            self.0
        }
    }

    fn lead_from(record: CandidateRecord) -> Lead {
        deduplicate(vec![record]).remove(0)
    }

    fn sample_breakdown() -> ScoreBreakdown {
        ScoreBreakdown {
            decision_maker: 1.0,
            company_fit: 0.8,
            growth_potential: 0.7,
            skill_relevance: 0.9,
            location_relevance: 1.0,
            engagement_potential: 0.7,
        }
    }

    #[test]
    fn half_factors_with_default_weights_score_50() {
        let weights = ScoringWeights::from_array([0.25, 0.20, 0.15, 0.15, 0.10, 0.15]);
        let composite = composite_score(&ScoreBreakdown::uniform(0.5), &weights);
        assert!((composite - 50.0).abs() < 1e-9);
        assert_eq!(display_score(composite), 50);
    }

    #[test]
    fn uniform_rescaling_does_not_change_score() {
        let weights = ScoringWeights::default();
        let base = composite_score(&sample_breakdown(), &weights);
        for factor in [0.001, 0.5, 3.0, 250.0] {
            let scaled = ScoringWeights::from_array(weights.as_array().map(|w| w * factor));
            let rescored = composite_score(&sample_breakdown(), &scaled);
            assert!((base - rescored).abs() < 1e-9, "factor {factor}: {base} vs {rescored}");
        }
    }

    #[test]
    fn all_zero_weights_fall_back_to_equal() {
        let normalized = normalized_weights(&ScoringWeights::uniform(0.0));
        for w in normalized {
            assert!((w - 1.0 / 6.0).abs() < 1e-12);
        }
        let breakdown = ScoreBreakdown {
            decision_maker: 1.0,
            ..ScoreBreakdown::uniform(0.0)
        };
        let composite = composite_score(&breakdown, &ScoringWeights::uniform(0.0));
        assert!((composite - 100.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn negative_and_nan_weights_are_ignored() {
        let weights = ScoringWeights::from_array([1.0, -5.0, f64::NAN, 0.0, 0.0, 0.0]);
        let normalized = normalized_weights(&weights);
        assert!((normalized[0] - 1.0).abs() < 1e-12);
        assert!(normalized[1..].iter().all(|w| w.abs() < f64::EPSILON));

        let all_negative = ScoringWeights::uniform(-1.0);
        assert!((normalized_weights(&all_negative)[3] - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn composite_stays_in_range() {
        let weights = ScoringWeights::default();
        let high = ScoreBreakdown::uniform(7.0);
        let low = ScoreBreakdown::uniform(-3.0);
        assert!((composite_score(&high, &weights) - 100.0).abs() < 1e-9);
        assert!(composite_score(&low, &weights).abs() < 1e-9);
    }

    #[test]
    fn scoring_is_idempotent() {
        let rules = HeuristicRules;
        let query = Query::new("rust").with_location("Berlin");
        let weights = ScoringWeights::default();
        let mut lead = lead_from(
            CandidateRecord::new(Source::LinkedIn, "Jane Doe")
                .with_title("VP Engineering")
                .with_location("Berlin, Germany")
                .with_skills(["Rust"]),
        );
        score_lead(&mut lead, &query, &weights, &rules);
        let first = (lead.score, lead.breakdown);
        score_lead(&mut lead, &query, &weights, &rules);
        assert_eq!(first, (lead.score, lead.breakdown));
    }

    #[test]
    fn fixed_rules_flow_through_score_leads() {
        let mut leads = deduplicate(vec![
            CandidateRecord::new(Source::Web, "A").with_email("a@x.com"),
            CandidateRecord::new(Source::Web, "B").with_email("b@x.com"),
        ]);
        let rules = FixedRules(ScoreBreakdown::uniform(0.8));
        score_leads(&mut leads, &Query::new("x"), &ScoringWeights::default(), &rules);
        assert!(leads.iter().all(|l| l.score == 80));
    }

    #[test]
    fn decision_maker_levels() {
        assert!((decision_maker_fit("CTO") - 1.0).abs() < f64::EPSILON);
        assert!((decision_maker_fit("Chief Technology Officer") - 1.0).abs() < f64::EPSILON);
        assert!((decision_maker_fit("VP of Engineering") - 0.8).abs() < f64::EPSILON);
        assert!((decision_maker_fit("Vice President, Sales") - 0.8).abs() < f64::EPSILON);
        assert!((decision_maker_fit("Director of Product") - 0.8).abs() < f64::EPSILON);
        assert!((decision_maker_fit("Engineering Manager") - 0.6).abs() < f64::EPSILON);
        assert!((decision_maker_fit("Head of Growth") - 0.6).abs() < f64::EPSILON);
        assert!((decision_maker_fit("Senior Developer") - 0.4).abs() < f64::EPSILON);
        assert!((decision_maker_fit("Developer") - 0.2).abs() < f64::EPSILON);
        assert!((decision_maker_fit("") - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn company_fit_rewards_industry_and_company_match() {
        let lead = lead_from(
            CandidateRecord::new(Source::LinkedIn, "A")
                .with_company("Tech Corp")
                .with_industry("Technology"),
        );
        let plain = Query::new("x");
        assert!((company_fit(&lead, &plain) - 0.5).abs() < f64::EPSILON);

        let targeted = Query {
            industries: vec!["technology".into()],
            ..Query::new("x").with_company("tech")
        };
        assert!((company_fit(&lead, &targeted) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn skill_relevance_uses_explicit_skills_then_keywords() {
        let lead = lead_from(
            CandidateRecord::new(Source::GitHub, "A")
                .with_skills(["Rust", "Kubernetes"])
                .with_bio("Building distributed systems"),
        );
        let explicit = Query {
            skills: vec!["rust".into(), "go".into()],
            ..Query::new("anything")
        };
        assert!((skill_relevance(&lead, &explicit) - 0.5).abs() < f64::EPSILON);

        let keywords = Query::new("distributed rust");
        assert!((skill_relevance(&lead, &keywords) - 1.0).abs() < f64::EPSILON);

        let nothing = Query::new("").with_title("CTO");
        assert!((skill_relevance(&lead, &nothing) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn location_relevance_matches_containment() {
        let lead = lead_from(
            CandidateRecord::new(Source::LinkedIn, "A").with_location("San Francisco, CA"),
        );
        let near = Query::new("x").with_location("san francisco");
        let far = Query::new("x").with_location("Austin");
        assert!((location_relevance(&lead, &near) - 1.0).abs() < f64::EPSILON);
        assert!((location_relevance(&lead, &far) - 0.3).abs() < f64::EPSILON);
        assert!((location_relevance(&lead, &Query::new("x")) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn engagement_and_growth_follow_signals() {
        let quiet = lead_from(CandidateRecord::new(Source::Twitter, "A"));
        let busy = lead_from(
            CandidateRecord::new(Source::Twitter, "B").with_engagement_signals([
                "active_poster",
                "job_change_6mo",
                "growing_company",
            ]),
        );
        assert!((engagement_potential(&quiet) - 0.5).abs() < f64::EPSILON);
        assert!((engagement_potential(&busy) - 1.0).abs() < f64::EPSILON);
        assert!((growth_potential(&quiet) - 0.7).abs() < f64::EPSILON);
        assert!((growth_potential(&busy) - 0.9).abs() < f64::EPSILON);
    }
}
