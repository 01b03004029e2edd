//! Scoring engine: exclusion rules, component scores, the engagement
//! gate, and the ordered adjustment ladder on top of the base score.

mod config;
mod policy;
mod rules;

pub use config::{ComponentWeights, ScoringConfig};
pub use policy::{
    email_domain, is_personal_domain, is_shared_inbox, ExclusionReason, PERSONAL_DOMAINS,
    SHARED_INBOX_PREFIXES,
};
pub use rules::{ActivityLevel, ComponentScores};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ContactAggregate, ContactHash};

/// The aggregate fields echoed back with every scored contact, so callers
/// can explain a score without re-reading the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub email_count_30d: u32,
    pub email_count_7d: u32,
    pub email_count_8_30d: u32,
    pub email_count_31_90d: u32,
    pub inbound_count_30d: u32,
    pub outbound_count_30d: u32,
    pub direct_email_count: u32,
    pub cc_email_count: u32,
    pub meeting_count_30d: u32,
    pub total_meeting_minutes: u32,
    pub reply_rate_30d: f64,
    pub starred_email_count: u32,
    pub important_email_count: u32,
    pub weighted_meeting_score: f64,
    pub threads_they_started: u32,
    pub threads_you_started: u32,
    pub consistency_score: f64,
    pub initiation_score: f64,
    pub off_hours_ratio: f64,
    pub median_response_hours: Option<f64>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub first_contact_at: Option<DateTime<Utc>>,
    pub email_domain: Option<String>,
    pub is_shared_inbox: bool,
    pub manual_added: bool,
}

impl From<&ContactAggregate> for MetricSnapshot {
    fn from(contact: &ContactAggregate) -> Self {
        Self {
            email_count_30d: contact.email_count_30d,
            email_count_7d: contact.email_count_7d,
            email_count_8_30d: contact.email_count_8_30d,
            email_count_31_90d: contact.email_count_31_90d,
            inbound_count_30d: contact.inbound_count_30d,
            outbound_count_30d: contact.outbound_count_30d,
            direct_email_count: contact.direct_email_count,
            cc_email_count: contact.cc_email_count,
            meeting_count_30d: contact.meeting_count_30d,
            total_meeting_minutes: contact.total_meeting_minutes,
            reply_rate_30d: contact.reply_rate_30d,
            starred_email_count: contact.starred_email_count,
            important_email_count: contact.important_email_count,
            weighted_meeting_score: contact.weighted_meeting_score,
            threads_they_started: contact.threads_they_started,
            threads_you_started: contact.threads_you_started,
            consistency_score: contact.consistency_score,
            initiation_score: contact.initiation_score,
            off_hours_ratio: contact.off_hours_ratio,
            median_response_hours: contact.median_response_hours,
            last_contact_at: contact.last_contact_at,
            first_contact_at: contact.first_contact_at,
            email_domain: contact.email_domain.clone(),
            is_shared_inbox: contact.is_shared_inbox,
            manual_added: contact.manual_added,
        }
    }
}

/// One ranked contact. Cached reconstructions carry no component
/// breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredContact {
    pub contact_hash: ContactHash,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub vip_score: f64,
    pub confidence_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_scores: Option<ComponentScores>,
    pub metrics: MetricSnapshot,
}

impl ScoredContact {
    /// Rebuilds a contact from persisted fields; None when the row was
    /// never scored.
    pub(crate) fn cached(row: &ContactAggregate) -> Option<Self> {
        let vip_score = row.vip_score?;
        Some(Self {
            contact_hash: row.contact_hash.clone(),
            email: row.email.clone(),
            display_name: row.display_name.clone(),
            vip_score,
            confidence_score: row.confidence_score.unwrap_or(0.5),
            component_scores: None,
            metrics: MetricSnapshot::from(row),
        })
    }
}

/// Where a scoring result came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ScoringOutcome {
    Cached { contacts: Vec<ScoredContact> },
    Fresh { contacts: Vec<ScoredContact> },
}

impl ScoringOutcome {
    pub fn contacts(&self) -> &[ScoredContact] {
        match self {
            ScoringOutcome::Cached { contacts } | ScoringOutcome::Fresh { contacts } => contacts,
        }
    }

    pub fn into_contacts(self) -> Vec<ScoredContact> {
        match self {
            ScoringOutcome::Cached { contacts } | ScoringOutcome::Fresh { contacts } => contacts,
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ScoringOutcome::Cached { .. })
    }
}

/// Domain comparison inputs resolved once per scoring run from the
/// user's own address.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainScoringContext {
    pub enabled: bool,
    pub user_domain: Option<String>,
    pub custom_domain: bool,
}

impl DomainScoringContext {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            user_domain: None,
            custom_domain: false,
        }
    }

    pub fn for_user_email(email: Option<&str>) -> Self {
        let user_domain = email.and_then(email_domain);
        let custom_domain = user_domain
            .as_deref()
            .is_some_and(|domain| !is_personal_domain(domain));
        Self {
            enabled: true,
            user_domain,
            custom_domain,
        }
    }
}

/// Pure scoring logic; all I/O stays with the caller.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Scores one contact, or None when an exclusion rule or the
    /// engagement gate rejects it.
    pub fn score_contact(
        &self,
        contact: &ContactAggregate,
        domain: &DomainScoringContext,
        now: DateTime<Utc>,
    ) -> Option<ScoredContact> {
        if let Some(reason) = policy::exclusion_for(contact) {
            debug!(
                user_id = %contact.user_id.0,
                contact_hash = %contact.contact_hash.0,
                reason = reason.label(),
                "contact excluded before scoring"
            );
            return None;
        }

        let scores = rules::component_scores(contact, now);
        if !policy::passes_engagement_gate(contact, scores.engagement) {
            debug!(
                user_id = %contact.user_id.0,
                contact_hash = %contact.contact_hash.0,
                "contact failed the engagement gate"
            );
            return None;
        }

        let mut score = rules::base_score(&scores, &self.config.weights);
        score *= rules::signal_bonus_multiplier(contact, &scores, now);
        if self.config.refinements_enabled {
            score *= rules::multi_source_multiplier(contact);
        }
        score *= rules::edge_case_multiplier(contact, &scores, now);
        score *= rules::penalty_multiplier(contact, &scores);
        if domain.enabled {
            score *= rules::domain_multiplier(contact, domain);
        }
        if self.config.refinements_enabled {
            score *= rules::age_decay_multiplier(contact, now);
        }

        Some(ScoredContact {
            contact_hash: contact.contact_hash.clone(),
            email: contact.email.clone(),
            display_name: contact.display_name.clone(),
            vip_score: score,
            confidence_score: rules::confidence_score(contact, now),
            component_scores: Some(scores),
            metrics: MetricSnapshot::from(contact),
        })
    }
}
