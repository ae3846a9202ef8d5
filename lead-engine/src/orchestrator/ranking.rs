//! Ordering, filtering and hot/warm/cold bucketing of scored leads.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::Lead;

/// Minimum score of a hot lead.
pub const HOT_THRESHOLD: u8 = 80;
/// Minimum score of a warm lead.
pub const WARM_THRESHOLD: u8 = 60;

/// Coarse bucket used for follow-up prioritisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadCategory {
    Hot,
    Warm,
    Cold,
}

impl LeadCategory {
    pub fn for_score(score: u8) -> Self {
        if score >= HOT_THRESHOLD {
            Self::Hot
        } else if score >= WARM_THRESHOLD {
            Self::Warm
        } else {
            Self::Cold
        }
    }
}

/// Leads split by category, each bucket keeping the input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizedLeads<'a> {
    pub hot: Vec<&'a Lead>,
    pub warm: Vec<&'a Lead>,
    pub cold: Vec<&'a Lead>,
}

pub fn categorize(leads: &[Lead]) -> CategorizedLeads<'_> {
    let mut buckets = CategorizedLeads::default();
    for lead in leads {
        match LeadCategory::for_score(lead.score) {
            LeadCategory::Hot => buckets.hot.push(lead),
            LeadCategory::Warm => buckets.warm.push(lead),
            LeadCategory::Cold => buckets.cold.push(lead),
        }
    }
    buckets
}

/// Canonical result order: score descending, then id ascending.
pub fn compare(a: &Lead, b: &Lead) -> Ordering {
    b.score.cmp(&a.score).then_with(|| a.id.cmp(&b.id))
}

/// Sort into canonical order. Total, so the result never depends on arrival
/// order or the sort algorithm.
pub fn rank(leads: &mut [Lead]) {
    leads.sort_by(compare);
}

/// Keep only leads scoring at least `min_score`.
pub fn filter_by_min_score(leads: &mut Vec<Lead>, min_score: u8) {
    leads.retain(|lead| lead.score >= min_score);
}
