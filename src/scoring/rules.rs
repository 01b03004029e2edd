//! Component scores, the adjustment ladder, and the confidence estimate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::ComponentWeights;
use super::policy::has_strong_engagement;
use super::DomainScoringContext;
use crate::domain::ContactAggregate;

/// Expected cadence band; picks the half-life for recency decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    High,
    Medium,
    Low,
}

impl ActivityLevel {
    pub const fn half_life_days(self) -> f64 {
        match self {
            ActivityLevel::High => 4.0,
            ActivityLevel::Medium => 7.0,
            ActivityLevel::Low => 12.0,
        }
    }
}

/// The six component scores backing a fresh vip_score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub recency: f64,
    pub frequency: f64,
    pub meeting: f64,
    pub engagement: f64,
    pub initiation: f64,
    pub response_time: f64,
}

pub(crate) fn component_scores(contact: &ContactAggregate, now: DateTime<Utc>) -> ComponentScores {
    ComponentScores {
        recency: recency_component(contact, now, ActivityLevel::Medium),
        frequency: frequency_component(contact),
        meeting: meeting_component(contact),
        engagement: engagement_component(contact),
        initiation: initiation_component(contact),
        response_time: response_time_component(contact),
    }
}

/// Exponential decay over fractional days since the last touch point,
/// floored at 0.05. Anything 30+ days old sits at the floor.
pub(crate) fn recency_component(
    contact: &ContactAggregate,
    now: DateTime<Utc>,
    level: ActivityLevel,
) -> f64 {
    let Some(last_activity) = contact.last_activity() else {
        return 0.0;
    };
    let days_since = ((now - last_activity).num_milliseconds() as f64 / 86_400_000.0).max(0.0);
    if days_since >= 30.0 {
        return 0.05;
    }
    let decay_const = 0.693 / level.half_life_days();
    (-decay_const * days_since).exp().max(0.05)
}

pub(crate) fn frequency_component(contact: &ContactAggregate) -> f64 {
    let base = (f64::from(contact.email_count_30d) / 30.0).min(1.0);
    let consistency_factor = 0.7 + 0.3 * contact.consistency_score;
    (base * consistency_factor).min(1.0)
}

/// Weighted meeting volume against a four-point ceiling, floored at 0.25
/// whenever any meeting happened at all.
pub(crate) fn meeting_component(contact: &ContactAggregate) -> f64 {
    let mut base = (contact.weighted_meeting_score / 4.0).min(1.0);
    if contact.meeting_count_30d > 0 {
        base = base.max(0.25);
    }
    let recurrence_bonus = 1.0 + 0.2 * contact.meeting_recurrence_score;
    (base * recurrence_bonus).min(1.0)
}

pub(crate) fn engagement_component(contact: &ContactAggregate) -> f64 {
    let inbound = contact.inbound_count_30d;
    let outbound = contact.outbound_count_30d;

    let mut score = if inbound > 0 && outbound > 0 {
        let balance = f64::from(inbound.min(outbound)) / f64::from(inbound.max(outbound));
        (contact.reply_rate_30d * 0.7 + 0.3) * (0.95 + 0.1 * balance)
    } else if inbound > 0 {
        0.1
    } else if outbound > 0 {
        0.35
    } else {
        0.25
    };

    if contact.avg_thread_depth >= 5.0 {
        score *= 1.12;
    } else if contact.avg_thread_depth >= 3.0 {
        score *= 1.06;
    }
    if contact.reply_rate_30d >= 0.8 {
        score *= 1.0 + (contact.reply_rate_30d - 0.8) * 0.25;
    }
    score.min(1.0)
}

/// Stored initiation score, or the 0.5 neutral when no thread was ever
/// attributed either way.
pub(crate) fn initiation_component(contact: &ContactAggregate) -> f64 {
    if contact.threads_they_started == 0 && contact.threads_you_started == 0 {
        return 0.5;
    }
    contact.initiation_score
}

pub(crate) fn response_time_component(contact: &ContactAggregate) -> f64 {
    let Some(hours) = contact.median_response_hours else {
        return 0.5;
    };
    match hours {
        h if h <= 0.5 => 1.0,
        h if h <= 1.0 => 0.95,
        h if h <= 2.0 => 0.85,
        h if h <= 4.0 => 0.75,
        h if h <= 8.0 => 0.65,
        h if h <= 12.0 => 0.55,
        h if h <= 24.0 => 0.45,
        h if h <= 48.0 => 0.3,
        h if h <= 72.0 => 0.2,
        _ => 0.1,
    }
}

pub(crate) fn base_score(scores: &ComponentScores, weights: &ComponentWeights) -> f64 {
    scores.engagement * weights.engagement
        + scores.meeting * weights.meeting
        + scores.recency * weights.recency
        + scores.frequency * weights.frequency
        + scores.initiation * weights.initiation
        + scores.response_time * weights.response_time
}

/// Stackable bonuses for strong explicit signals.
pub(crate) fn signal_bonus_multiplier(
    contact: &ContactAggregate,
    scores: &ComponentScores,
    now: DateTime<Utc>,
) -> f64 {
    let mut multiplier = 1.0;
    if contact.starred_email_count >= 3 {
        multiplier *= 1.10;
    } else if contact.starred_email_count >= 1 {
        multiplier *= 1.05;
    }
    if contact.cc_email_count >= 3 {
        multiplier *= 1.0 + f64::from(contact.cc_email_count.min(12)) * 0.004;
    }
    if contact.consistency_score >= 0.7 && contact.email_count_30d >= 15 {
        multiplier *= 1.06;
    }
    if contact.meetings_they_organized >= 2 {
        multiplier *= 1.05;
    }
    if let Some(first) = contact.first_contact_at {
        if (now - first).num_days() >= 180 && scores.recency >= 0.5 {
            multiplier *= 1.04;
        }
    }
    multiplier
}

/// Contacts present in both channels are rarely noise.
pub(crate) fn multi_source_multiplier(contact: &ContactAggregate) -> f64 {
    if contact.meeting_count_30d >= 2 && contact.email_count_30d >= 5 {
        1.08
    } else if contact.meeting_count_30d >= 1 && contact.email_count_30d >= 1 {
        1.04
    } else {
        1.0
    }
}

pub(crate) fn edge_case_multiplier(
    contact: &ContactAggregate,
    scores: &ComponentScores,
    now: DateTime<Utc>,
) -> f64 {
    let mut multiplier = 1.0;

    // Rare but prompt and meeting-backed: infrequent contact that still
    // gets fast answers.
    if scores.frequency < 0.2 && scores.response_time >= 0.75 && scores.meeting >= 0.25 {
        multiplier *= 1.2;
    }

    // Low-volume contacts lean on how recent their bucket is.
    if contact.email_count_30d <= 3 {
        if contact.email_count_7d > 0 {
            multiplier *= 1.12;
        } else if contact.email_count_8_30d > 0 {
            multiplier *= 1.06;
        } else if contact.email_count_31_90d > 0 {
            multiplier *= 1.03;
        }
    }

    if let Some(first) = contact.first_contact_at {
        let days_since_first = (now - first).num_days();
        if days_since_first <= 14
            && contact.email_count_30d >= 8
            && contact.consistency_score >= 0.5
            && scores.recency >= 0.8
        {
            multiplier *= 1.15;
        } else if days_since_first <= 7
            && contact.email_count_30d >= 5
            && contact.consistency_score >= 0.4
        {
            multiplier *= 1.10;
        }
    }

    if (1..=5).contains(&contact.email_count_30d) && contact.starred_email_count >= 1 {
        multiplier *= 1.12;
    }

    multiplier
}

pub(crate) fn penalty_multiplier(contact: &ContactAggregate, scores: &ComponentScores) -> f64 {
    let mut multiplier = 1.0;
    if contact.meeting_count_30d >= 3 && contact.email_count_30d <= 3 {
        multiplier *= 0.55;
    }
    if contact.email_count_30d > 0 {
        let ratio = f64::from(contact.meeting_count_30d) / f64::from(contact.email_count_30d);
        if contact.meeting_count_30d >= 2 && ratio > 2.0 {
            multiplier *= 0.6;
        }
    }
    if contact.email_count_30d >= 25
        && contact.avg_thread_depth <= 1.5
        && contact.off_hours_ratio >= 0.5
    {
        multiplier *= 0.8;
    }
    if contact.outbound_count_30d >= 5
        && contact.inbound_count_30d <= 1
        && contact.meeting_count_30d == 0
    {
        multiplier *= 0.5;
    }
    if scores.frequency >= 0.5 && scores.engagement < 0.15 {
        multiplier *= 0.7;
    }
    multiplier
}

pub(crate) fn domain_multiplier(contact: &ContactAggregate, context: &DomainScoringContext) -> f64 {
    let mut multiplier = 1.0;
    if context.custom_domain {
        if let (Some(user_domain), Some(contact_domain)) =
            (&context.user_domain, &contact.email_domain)
        {
            if user_domain == contact_domain {
                multiplier *= 1.05;
            }
        }
    }
    if contact.is_shared_inbox && !has_strong_engagement(contact) {
        multiplier *= 0.85;
    }
    multiplier
}

/// Whole-day staleness decay applied after every other adjustment.
pub(crate) fn age_decay_multiplier(contact: &ContactAggregate, now: DateTime<Utc>) -> f64 {
    let Some(last_activity) = contact.last_activity() else {
        return 1.0;
    };
    let days_since = (now - last_activity).num_days();
    if days_since <= 30 {
        return 1.0;
    }
    let decay = (-((days_since - 30) as f64) / 120.0).exp();
    decay.max(0.5)
}

/// Evidence-volume tiers with small boosts for corroborating signals.
/// Week-old relationships are damped; the estimate can exceed neither 1
/// nor the tier logic below it.
pub(crate) fn confidence_score(contact: &ContactAggregate, now: DateTime<Utc>) -> f64 {
    let total = contact.email_count_30d + contact.meeting_count_30d;
    let mut confidence: f64 = match total {
        t if t >= 25 => 1.0,
        t if t >= 15 => 0.9,
        t if t >= 10 => 0.8,
        t if t >= 5 => 0.65,
        t if t >= 3 => 0.5,
        _ => 0.3,
    };
    if contact.inbound_count_30d > 0 && contact.outbound_count_30d > 0 {
        confidence = (confidence + 0.08).min(1.0);
    }
    if contact.meeting_count_30d >= 1 {
        confidence = (confidence + 0.08).min(1.0);
    }
    if contact.starred_email_count >= 1 {
        confidence = (confidence + 0.05).min(1.0);
    }
    if let Some(first) = contact.first_contact_at {
        if (now - first).num_days() <= 7 {
            confidence *= 0.85;
        }
    }
    confidence
}
