//! Hard exclusion rules, the engagement gate, and mailbox classification.

use serde::{Deserialize, Serialize};

use crate::domain::ContactAggregate;

/// Consumer mail providers. A user domain outside this set is treated as
/// a custom workplace domain.
pub const PERSONAL_DOMAINS: [&str; 15] = [
    "gmail.com",
    "googlemail.com",
    "outlook.com",
    "hotmail.com",
    "live.com",
    "msn.com",
    "yahoo.com",
    "yahoo.co.uk",
    "icloud.com",
    "me.com",
    "mac.com",
    "aol.com",
    "proton.me",
    "protonmail.com",
    "pm.me",
];

/// Local parts that mark a mailbox as shared rather than personal.
pub const SHARED_INBOX_PREFIXES: [&str; 16] = [
    "support",
    "help",
    "info",
    "team",
    "sales",
    "billing",
    "careers",
    "admin",
    "office",
    "hr",
    "noreply",
    "no-reply",
    "donotreply",
    "do-not-reply",
    "newsletter",
    "notifications",
];

/// Why a contact was rejected before any score was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    InsufficientInteractions,
    InboundOnlyDistribution,
    NewsletterPattern,
    BroadcastSender,
}

impl ExclusionReason {
    pub const fn label(self) -> &'static str {
        match self {
            ExclusionReason::InsufficientInteractions => "insufficient_interactions",
            ExclusionReason::InboundOnlyDistribution => "inbound_only_distribution",
            ExclusionReason::NewsletterPattern => "newsletter_pattern",
            ExclusionReason::BroadcastSender => "broadcast_sender",
        }
    }
}

/// First matching rule wins. A manual contact below the activity minimum
/// is kept outright; at two or more interactions every rule applies to
/// manual contacts as well.
pub(crate) fn exclusion_for(contact: &ContactAggregate) -> Option<ExclusionReason> {
    let interactions = contact.email_count_30d + contact.meeting_count_30d;
    if interactions < 2 {
        if contact.manual_added {
            return None;
        }
        return Some(ExclusionReason::InsufficientInteractions);
    }

    if contact.inbound_count_30d >= 5
        && contact.outbound_count_30d == 0
        && contact.meeting_count_30d == 0
    {
        return Some(ExclusionReason::InboundOnlyDistribution);
    }

    if contact.inbound_count_30d >= 10
        && f64::from(contact.outbound_count_30d) / f64::from(contact.inbound_count_30d.max(1)) < 0.1
        && contact.reply_rate_30d < 0.1
    {
        return Some(ExclusionReason::NewsletterPattern);
    }

    if contact.inbound_count_30d >= 5
        && contact.reply_rate_30d < 0.1
        && contact.avg_thread_depth < 1.3
    {
        return Some(ExclusionReason::BroadcastSender);
    }

    None
}

/// Soft filter applied after component scores exist: email engagement at
/// or above 0.1, or any meeting presence.
pub(crate) fn passes_engagement_gate(contact: &ContactAggregate, engagement: f64) -> bool {
    engagement >= 0.1 || contact.meeting_count_30d >= 1
}

/// Lowercased domain of an address, or None without a usable `@` part.
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.split_once('@')?;
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

pub fn is_personal_domain(domain: &str) -> bool {
    PERSONAL_DOMAINS.contains(&domain)
}

fn local_part(email: &str) -> Option<String> {
    let (local, _) = email.split_once('@')?;
    let local = local.to_lowercase();
    match local.split_once('+') {
        Some((head, _)) => Some(head.to_string()),
        None => Some(local),
    }
}

/// Classification used when the identity flow persists `is_shared_inbox`:
/// a known shared local part, or inbound-heavy traffic nobody answers.
pub fn is_shared_inbox(email: Option<&str>, contact: &ContactAggregate) -> bool {
    if let Some(local) = email.and_then(local_part) {
        if SHARED_INBOX_PREFIXES.contains(&local.as_str()) {
            return true;
        }
    }
    contact.inbound_count_30d >= 8
        && contact.outbound_count_30d == 0
        && contact.reply_rate_30d < 0.1
        && contact.avg_thread_depth < 1.5
}

/// Two-way email with a healthy reply rate, or meetings backed by some
/// email response. Shields a contact from the shared-inbox penalty.
pub(crate) fn has_strong_engagement(contact: &ContactAggregate) -> bool {
    let two_way = contact.inbound_count_30d > 0 && contact.outbound_count_30d > 0;
    if two_way && contact.reply_rate_30d >= 0.2 {
        return true;
    }
    contact.meeting_count_30d >= 1 && contact.reply_rate_30d >= 0.1
}
