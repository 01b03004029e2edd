//! Core data carriers shared by the aggregation and scoring stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier for the account whose mailbox is being analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// HMAC pseudonym for a counterparty address. Never a raw email.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactHash(pub String);

/// Direction of an email relative to the mailbox owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "in")]
    Inbound,
    #[serde(rename = "out")]
    Outbound,
}

impl Direction {
    pub fn is_inbound(self) -> bool {
        matches!(self, Direction::Inbound)
    }
}

/// One email metadata row. Promotional and social mail is filtered out
/// upstream; rows arrive ordered by timestamp ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailEvent {
    pub message_id: String,
    pub thread_id: String,
    pub direction: Direction,
    pub from_contact_hash: Option<ContactHash>,
    pub to_contact_hash: Option<ContactHash>,
    pub cc_contact_hashes: Vec<ContactHash>,
    pub timestamp: DateTime<Utc>,
    pub has_attachment: bool,
    pub is_starred: bool,
    pub is_important: bool,
    pub is_reply: bool,
    /// Hour in the sender's local time, 0..=23. Absent when the source
    /// could not resolve a timezone.
    pub hour_of_day: Option<u8>,
    /// Day of week with Sunday = 0, matching the upstream extractor.
    pub day_of_week: Option<u8>,
}

/// One calendar event row. Only accepted, regular events reach the
/// pipeline; declined invites and all-day markers are dropped upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingEvent {
    pub event_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendee_contact_hashes: Vec<ContactHash>,
    pub duration_minutes: Option<i64>,
    pub is_recurring: bool,
    pub organizer_hash: Option<ContactHash>,
    pub user_is_organizer: bool,
    pub user_response: String,
    pub is_one_on_one: bool,
    pub event_type: String,
}

/// Per-contact statistics produced by aggregation and consumed by scoring.
///
/// Counters suffixed `_30d` cover the trailing stats window only. The
/// recency buckets span the full 90 day fetch horizon. Scores, the manual
/// flag, and the identity columns are written by other flows and survive
/// re-aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactAggregate {
    pub user_id: UserId,
    pub contact_hash: ContactHash,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub email_count_30d: u32,
    pub email_count_7d: u32,
    pub email_count_8_30d: u32,
    pub email_count_31_90d: u32,
    pub inbound_count_30d: u32,
    pub outbound_count_30d: u32,
    /// Mirrors the outbound count. Kept for compatibility with older
    /// consumers that read it as "emails sent directly to the contact".
    pub direct_email_count: u32,
    pub cc_email_count: u32,
    pub thread_count_30d: u32,
    pub avg_thread_depth: f64,
    pub attachment_email_count: u32,
    pub starred_email_count: u32,
    pub important_email_count: u32,
    pub reply_rate_30d: f64,
    pub median_response_hours: Option<f64>,
    pub off_hours_ratio: f64,
    pub threads_they_started: u32,
    pub threads_you_started: u32,
    pub meeting_count_30d: u32,
    pub total_meeting_minutes: u32,
    pub recurring_meeting_count: u32,
    pub meetings_you_organized: u32,
    pub meetings_they_organized: u32,
    pub weighted_meeting_score: f64,
    pub meeting_recurrence_score: f64,
    pub first_contact_at: Option<DateTime<Utc>>,
    pub last_contact_at: Option<DateTime<Utc>>,
    pub consistency_score: f64,
    pub initiation_score: f64,
    pub email_domain: Option<String>,
    pub is_shared_inbox: bool,
    pub manual_added: bool,
    pub vip_score: Option<f64>,
    pub confidence_score: Option<f64>,
}

impl ContactAggregate {
    /// Most recent touch point, falling back to the first one when the
    /// contact never produced a later event.
    pub fn last_activity(&self) -> Option<DateTime<Utc>> {
        self.last_contact_at.or(self.first_contact_at)
    }
}
