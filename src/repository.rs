//! Async seams to the metadata source and the contact store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{ContactAggregate, ContactHash, EmailEvent, MeetingEvent, UserId};

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A VIP selection referenced hashes that are not stored for the user.
    /// Carries a sample of at most three missing hashes for logging.
    #[error("{missing} selected contacts are unknown for this user")]
    UnknownContacts {
        missing: usize,
        sample: Vec<ContactHash>,
    },
    #[error("contact storage unavailable: {0}")]
    Unavailable(String),
}

/// Read side: raw email and calendar metadata for one user.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// The user's own profile address, when one is on file.
    async fn fetch_user_email(&self, user_id: &UserId) -> Result<Option<String>, RepositoryError>;

    /// Non-promotional, non-social messages at or after `window_start`,
    /// ordered by timestamp ascending.
    async fn fetch_email_events(
        &self,
        user_id: &UserId,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<EmailEvent>, RepositoryError>;

    /// Accepted regular meetings starting inside the window.
    async fn fetch_meeting_events(
        &self,
        user_id: &UserId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<MeetingEvent>, RepositoryError>;
}

/// Score fields persisted after a fresh scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreUpdate {
    pub contact_hash: ContactHash,
    pub vip_score: f64,
    pub confidence_score: f64,
}

/// Write side: aggregate rows, scores, and the saved VIP selection.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Inserts or refreshes rows keyed by `(user_id, contact_hash)` in one
    /// transaction. Statistics, email, and display name take the incoming
    /// values; `vip_score`, `confidence_score`, `manual_added`,
    /// `email_domain`, and `is_shared_inbox` keep their stored values.
    async fn upsert_aggregates(
        &self,
        user_id: &UserId,
        rows: &[ContactAggregate],
    ) -> Result<(), RepositoryError>;

    /// Top rows in VIP-surfacing order: vip_score desc with nulls ranked
    /// as zero, then weighted_meeting_score desc, then 30d email count desc.
    async fn fetch_contacts(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ContactAggregate>, RepositoryError>;

    /// Candidate rows for a fresh scoring pass, deliberately ignoring any
    /// stale stored score: weighted_meeting_score desc, then 30d email
    /// count desc, then last_contact_at desc with nulls last.
    async fn fetch_contacts_for_rescore(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ContactAggregate>, RepositoryError>;

    /// Every row the user pinned by hand, regardless of score.
    async fn fetch_manual_contacts(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ContactAggregate>, RepositoryError>;

    async fn count_contacts(&self, user_id: &UserId) -> Result<u64, RepositoryError>;

    /// Batch write of vip/confidence scores in one transaction.
    async fn update_contact_scores(
        &self,
        user_id: &UserId,
        updates: &[ScoreUpdate],
    ) -> Result<(), RepositoryError>;

    /// Nulls both score fields for every row of the user, returning how
    /// many rows were touched.
    async fn clear_contact_scores(&self, user_id: &UserId) -> Result<u64, RepositoryError>;

    /// Replaces the saved selection with `hashes` ranked 1..N, validating
    /// every hash before any mutation. All-or-nothing.
    async fn replace_vip_selection(
        &self,
        user_id: &UserId,
        hashes: &[ContactHash],
    ) -> Result<(), RepositoryError>;
}
