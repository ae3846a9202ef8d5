//! Candidate-record deduplication into leads.
//!
//! Records are matched against the leads seen so far in this session, first
//! confident match wins:
//!
//! 1. identical normalised profile URL
//! 2. identical normalised email
//! 3. identical normalised name, plus the same employer or an overlapping
//!    significant title token
//!
//! A record whose keys hit several leads joins all of them into the lowest
//! id. Merging only fills gaps, so a populated attribute is never replaced
//! by another value.

use std::collections::{HashMap, HashSet};

use crate::types::{CandidateRecord, Lead, LeadId, ScoreBreakdown, SourceContribution};

use super::url_normalize::{normalize_email, normalize_name, normalize_profile_url};

/// Title words too generic to identify a role on their own.
const GENERIC_TITLE_TOKENS: &[&str] = &[
    "of", "the", "and", "at", "for", "in", "to", "an", "senior", "sr", "junior", "jr", "lead",
    "head", "chief", "principal", "staff", "associate", "assistant", "officer",
];

/// How an ingested record was placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// No existing lead matched; a new one was created.
    Created,
    /// Merged on an identical normalised profile URL.
    ProfileUrl,
    /// Merged on an identical normalised email.
    Email,
    /// Merged on name plus employer or title overlap.
    NameAndRole,
}

/// Normalised identity keys of one record.
struct IdentityKeys {
    urls: Vec<String>,
    email: Option<String>,
    name: Option<String>,
}

impl IdentityKeys {
    fn of(record: &CandidateRecord) -> Self {
        let mut urls: Vec<String> = record
            .profile_urls
            .iter()
            .filter_map(|u| normalize_profile_url(u))
            .collect();
        urls.dedup();
        Self {
            urls,
            email: record.email.as_deref().and_then(normalize_email),
            name: normalize_name(&record.full_name),
        }
    }
}

/// Per-session merge state. Owned by a single writer.
///
/// Every indexed key points at exactly one live lead. When a record's keys
/// point at several leads, those leads are folded into the one with the
/// lowest id, so the surviving ids keep increasing in creation order.
#[derive(Debug, Default)]
pub struct Deduplicator {
    /// Live leads, sorted by id.
    leads: Vec<Lead>,
    next_id: u64,
    by_url: HashMap<String, LeadId>,
    by_email: HashMap<String, LeadId>,
    by_name: HashMap<String, Vec<LeadId>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `record` into a matching lead or create a new one.
    ///
    /// Records without a name, profile URL or email are never merged.
    pub fn ingest(&mut self, record: CandidateRecord) -> (LeadId, MergeKind) {
        if !record.has_identity_hints() {
            let id = self.create(&record);
            return (id, MergeKind::Created);
        }

        let keys = IdentityKeys::of(&record);
        let (id, kind) = match self.find_match(&record, &keys) {
            Some((target, others, kind)) => {
                for other in others {
                    self.absorb(target, other);
                }
                if let Some(lead) = self.get_mut(target) {
                    merge_record(lead, &record);
                }
                (target, kind)
            }
            None => (self.create(&record), MergeKind::Created),
        };
        self.index(id, keys);
        (id, kind)
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// Leads in id order.
    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn get(&self, id: LeadId) -> Option<&Lead> {
        self.position(id).and_then(|i| self.leads.get(i))
    }

    pub fn into_leads(self) -> Vec<Lead> {
        self.leads
    }

    /// The lowest matching id plus any other leads the record also hits.
    ///
    /// URL and email hits are collected together so a record bridging two
    /// leads joins both of them.
    fn find_match(
        &self,
        record: &CandidateRecord,
        keys: &IdentityKeys,
    ) -> Option<(LeadId, Vec<LeadId>, MergeKind)> {
        let mut ids: Vec<LeadId> = keys
            .urls
            .iter()
            .filter_map(|u| self.by_url.get(u).copied())
            .collect();
        let kind = if ids.is_empty() {
            MergeKind::Email
        } else {
            MergeKind::ProfileUrl
        };
        ids.extend(keys.email.as_ref().and_then(|e| self.by_email.get(e)).copied());
        ids.sort_unstable();
        ids.dedup();
        if let Some((&target, others)) = ids.split_first() {
            return Some((target, others.to_vec(), kind));
        }

        let name = keys.name.as_ref()?;
        let candidates = self.by_name.get(name)?;
        let tokens = significant_title_tokens(&record.title);
        candidates
            .iter()
            .copied()
            .find(|id| {
                self.get(*id)
                    .is_some_and(|lead| same_role(lead, &record.company, &tokens))
            })
            .map(|id| (id, Vec::new(), MergeKind::NameAndRole))
    }

    fn create(&mut self, record: &CandidateRecord) -> LeadId {
        self.next_id += 1;
        let id = LeadId(self.next_id);
        self.leads.push(Lead {
            id,
            name: record.full_name.trim().to_string(),
            title: record.title.trim().to_string(),
            company: record.company.trim().to_string(),
            industry: record.industry.trim().to_string(),
            location: record.location.trim().to_string(),
            bio: record.bio.trim().to_string(),
            email: trimmed_email(record.email.as_deref()),
            skills: union_case_insensitive(Vec::new(), &record.skills),
            engagement_signals: union_case_insensitive(Vec::new(), &record.engagement_signals),
            sources: vec![contribution(record)],
            score: 0,
            breakdown: ScoreBreakdown::default(),
        });
        id
    }

    /// Fold lead `other` into `target` and repoint every key it owned.
    fn absorb(&mut self, target: LeadId, other: LeadId) {
        let Some(index) = self.position(other) else {
            return;
        };
        let absorbed = self.leads.remove(index);
        if let Some(lead) = self.get_mut(target) {
            merge_lead(lead, absorbed);
        }

        for owner in self.by_url.values_mut().chain(self.by_email.values_mut()) {
            if *owner == other {
                *owner = target;
            }
        }
        for ids in self.by_name.values_mut() {
            if ids.contains(&other) {
                ids.retain(|id| *id != other);
                if !ids.contains(&target) {
                    ids.push(target);
                }
            }
        }
    }

    /// Register every key of a placed record. Keys already claimed point at
    /// `id` or a lead folded into it, so `or_insert` never splits a person.
    fn index(&mut self, id: LeadId, keys: IdentityKeys) {
        for url in keys.urls {
            self.by_url.entry(url).or_insert(id);
        }
        if let Some(email) = keys.email {
            self.by_email.entry(email).or_insert(id);
        }
        if let Some(name) = keys.name {
            let ids = self.by_name.entry(name).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    fn position(&self, id: LeadId) -> Option<usize> {
        self.leads.binary_search_by_key(&id, |lead| lead.id).ok()
    }

    fn get_mut(&mut self, id: LeadId) -> Option<&mut Lead> {
        self.position(id).and_then(|i| self.leads.get_mut(i))
    }
}

/// Deduplicate a batch of records in iteration order.
pub fn deduplicate(records: impl IntoIterator<Item = CandidateRecord>) -> Vec<Lead> {
    let mut dedup = Deduplicator::new();
    for record in records {
        dedup.ingest(record);
    }
    dedup.into_leads()
}

/// Lowercased alphanumeric title tokens of length >= 2, minus generic words.
pub fn significant_title_tokens(title: &str) -> HashSet<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= 2 && !GENERIC_TITLE_TOKENS.contains(&t.as_str()))
        .collect()
}

fn same_role(lead: &Lead, company: &str, title_tokens: &HashSet<String>) -> bool {
    let company = company.trim().to_lowercase();
    if !company.is_empty() && company == lead.company.trim().to_lowercase() {
        return true;
    }
    !title_tokens.is_empty()
        && significant_title_tokens(&lead.title)
            .intersection(title_tokens)
            .next()
            .is_some()
}

fn fill_gap(current: &mut String, incoming: &str) {
    let incoming = incoming.trim();
    if current.trim().is_empty() && !incoming.is_empty() {
        *current = incoming.to_string();
    }
}

fn trimmed_email(email: Option<&str>) -> Option<String> {
    email
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
}

fn merge_record(lead: &mut Lead, record: &CandidateRecord) {
    fill_gap(&mut lead.name, &record.full_name);
    fill_gap(&mut lead.title, &record.title);
    fill_gap(&mut lead.company, &record.company);
    fill_gap(&mut lead.industry, &record.industry);
    fill_gap(&mut lead.location, &record.location);
    fill_gap(&mut lead.bio, &record.bio);
    if lead.email.is_none() {
        lead.email = trimmed_email(record.email.as_deref());
    }
    lead.skills = union_case_insensitive(std::mem::take(&mut lead.skills), &record.skills);
    lead.engagement_signals = union_case_insensitive(
        std::mem::take(&mut lead.engagement_signals),
        &record.engagement_signals,
    );
    lead.sources.push(contribution(record));
}

/// Same gap-filling rules as [`merge_record`], for a whole lead.
fn merge_lead(lead: &mut Lead, other: Lead) {
    fill_gap(&mut lead.name, &other.name);
    fill_gap(&mut lead.title, &other.title);
    fill_gap(&mut lead.company, &other.company);
    fill_gap(&mut lead.industry, &other.industry);
    fill_gap(&mut lead.location, &other.location);
    fill_gap(&mut lead.bio, &other.bio);
    if lead.email.is_none() {
        lead.email = other.email;
    }
    lead.skills = union_case_insensitive(std::mem::take(&mut lead.skills), &other.skills);
    lead.engagement_signals = union_case_insensitive(
        std::mem::take(&mut lead.engagement_signals),
        &other.engagement_signals,
    );
    lead.sources.extend(other.sources);
}

fn union_case_insensitive(mut current: Vec<String>, incoming: &[String]) -> Vec<String> {
    for item in incoming {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let lowered = item.to_lowercase();
        if !current.iter().any(|c| c.to_lowercase() == lowered) {
            current.push(item.to_string());
        }
    }
    current
}

fn contribution(record: &CandidateRecord) -> SourceContribution {
    SourceContribution {
        source: record.source,
        record_id: record.source_record_id.clone(),
        profile_urls: record
            .profile_urls
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect(),
        retrieved_at: record.retrieved_at,
    }
}
