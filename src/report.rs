//! Plain-text rendering of search results and settings.

use std::fmt::Write as _;

use lead_engine::{
    ApiCredentials, Lead, LeadCategory, ScoringWeights, SearchOutcome, Source, SourceOutcome,
};

/// Ranked lead table followed by the source summary.
pub fn render_outcome(outcome: &SearchOutcome) -> String {
    let mut out = String::new();
    if outcome.leads.is_empty() {
        out.push_str("No leads found.\n");
    } else {
        let _ = writeln!(
            out,
            "{:>4}  {:>5}  {:<4}  {:<24}  {:<28}  {:<20}  SOURCES",
            "ID", "SCORE", "TIER", "NAME", "TITLE", "COMPANY"
        );
        for lead in &outcome.leads {
            let _ = writeln!(out, "{}", render_lead(lead));
        }
    }
    out.push('\n');
    out.push_str(&render_status(outcome));
    if outcome.cancelled {
        out.push_str("Search cancelled; results are incomplete.\n");
    }
    let _ = writeln!(out, "Session: {}", outcome.session_id);
    out
}

fn render_lead(lead: &Lead) -> String {
    let sources = lead
        .source_kinds()
        .iter()
        .map(Source::id)
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{:>4}  {:>5}  {:<4}  {:<24}  {:<28}  {:<20}  {}",
        lead.id,
        lead.score,
        tier(LeadCategory::for_score(lead.score)),
        clip(&lead.name, 24),
        clip(&lead.title, 28),
        clip(&lead.company, 20),
        sources
    )
}

/// One line per source: outcome, record count and error.
pub fn render_status(outcome: &SearchOutcome) -> String {
    let mut out = String::new();
    for status in &outcome.source_status {
        let label = match status.status {
            SourceOutcome::Succeeded => "ok",
            SourceOutcome::Partial => "partial",
            SourceOutcome::Failed => "failed",
        };
        let _ = write!(out, "{:<9} {:<8} {:>4} records", status.source.name(), label, status.count);
        if let Some(error) = &status.error {
            let _ = write!(out, " ({error})");
        }
        out.push('\n');
    }
    if outcome.all_sources_failed() {
        out.push_str("Every source failed.\n");
    }
    out
}

/// Weights plus whether each key is configured. Key values are never shown.
pub fn render_settings(weights: &ScoringWeights, credentials: &ApiCredentials) -> String {
    let mut out = String::from("Scoring weights\n");
    for (field, value) in ScoringWeights::FIELDS.into_iter().zip(weights.as_array()) {
        let _ = writeln!(out, "  {field:<28} {value:.2}");
    }
    let _ = writeln!(out, "  {:<28} {:.2}", "sum", weights.sum());
    out.push_str("API keys\n");
    for source in [Source::LinkedIn, Source::Twitter] {
        let state = if credentials.for_source(source).is_some() {
            "set"
        } else {
            "not set"
        };
        let _ = writeln!(out, "  {:<28} {state}", source.name());
    }
    out
}

fn tier(category: LeadCategory) -> &'static str {
    match category {
        LeadCategory::Hot => "hot",
        LeadCategory::Warm => "warm",
        LeadCategory::Cold => "cold",
    }
}

fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use lead_engine::{SessionId, SourceStatus};

    fn outcome(status: Vec<SourceStatus>) -> SearchOutcome {
        SearchOutcome {
            session_id: SessionId::new(),
            leads: vec![],
            source_status: status,
            cancelled: false,
        }
    }

    #[test]
    fn empty_outcome_says_so() {
        let text = render_outcome(&outcome(vec![]));
        assert!(text.contains("No leads found."));
        assert!(text.contains("Session:"));
    }

    #[test]
    fn status_lines_include_errors() {
        let text = render_status(&outcome(vec![SourceStatus {
            source: Source::Twitter,
            status: SourceOutcome::Failed,
            count: 0,
            error: Some("timed out after 100ms".into()),
        }]));
        assert!(text.contains("Twitter"));
        assert!(text.contains("failed"));
        assert!(text.contains("(timed out after 100ms)"));
        assert!(text.contains("Every source failed."));
    }

    #[test]
    fn settings_hide_key_values() {
        let credentials = ApiCredentials {
            linkedin_api_key: Some("li-secret".into()),
            twitter_api_key: None,
        };
        let text = render_settings(&ScoringWeights::default(), &credentials);
        assert!(!text.contains("li-secret"));
        assert!(text.contains("decision_maker_weight"));
        assert!(text.contains("not set"));
    }

    #[test]
    fn clip_marks_truncation() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("abcdefghij", 5), "abcd…");
    }
}
