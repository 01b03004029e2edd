use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::domain::{ContactAggregate, ContactHash, Direction, EmailEvent, MeetingEvent, UserId};
use crate::identity::Pseudonymizer;
use crate::repository::{ContactStore, EventSource, RepositoryError, ScoreUpdate};
use crate::scoring::{MetricSnapshot, ScoredContact, ScoringConfig};
use crate::service::VipPipeline;

pub(crate) const TEST_SECRET: &str = "unit-test-hashing-secret";

pub(crate) fn test_hasher() -> Pseudonymizer {
    Pseudonymizer::new(TEST_SECRET).expect("test secret is long enough")
}

pub(crate) fn user() -> UserId {
    UserId("user-1".to_string())
}

pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Aggregate row with every counter at zero and the neutral derived
/// scores aggregation produces for an empty history.
pub(crate) fn blank_contact(hash: &str) -> ContactAggregate {
    ContactAggregate {
        user_id: user(),
        contact_hash: ContactHash(hash.to_string()),
        email: None,
        display_name: None,
        email_count_30d: 0,
        email_count_7d: 0,
        email_count_8_30d: 0,
        email_count_31_90d: 0,
        inbound_count_30d: 0,
        outbound_count_30d: 0,
        direct_email_count: 0,
        cc_email_count: 0,
        thread_count_30d: 0,
        avg_thread_depth: 0.0,
        attachment_email_count: 0,
        starred_email_count: 0,
        important_email_count: 0,
        reply_rate_30d: 0.0,
        median_response_hours: None,
        off_hours_ratio: 0.0,
        threads_they_started: 0,
        threads_you_started: 0,
        meeting_count_30d: 0,
        total_meeting_minutes: 0,
        recurring_meeting_count: 0,
        meetings_you_organized: 0,
        meetings_they_organized: 0,
        weighted_meeting_score: 0.0,
        meeting_recurrence_score: 0.0,
        first_contact_at: None,
        last_contact_at: None,
        consistency_score: 0.5,
        initiation_score: 0.5,
        email_domain: None,
        is_shared_inbox: false,
        manual_added: false,
        vip_score: None,
        confidence_score: None,
    }
}

/// A healthy two-way relationship: 12 emails in the stats window split
/// evenly, half of inbound answered, last touch one day before `now`.
pub(crate) fn engaged_contact(hash: &str, now: DateTime<Utc>) -> ContactAggregate {
    let mut row = blank_contact(hash);
    row.email_count_30d = 12;
    row.email_count_7d = 4;
    row.email_count_8_30d = 8;
    row.inbound_count_30d = 6;
    row.outbound_count_30d = 6;
    row.direct_email_count = 6;
    row.thread_count_30d = 6;
    row.avg_thread_depth = 2.0;
    row.reply_rate_30d = 0.5;
    row.median_response_hours = Some(2.0);
    row.threads_they_started = 3;
    row.threads_you_started = 3;
    row.first_contact_at = Some(now - Duration::days(40));
    row.last_contact_at = Some(now - Duration::days(1));
    row
}

/// Minimal scored contact for ranking and truncation tests.
pub(crate) fn scored_stub(hash: &str, vip_score: f64, manual: bool) -> ScoredContact {
    let mut row = blank_contact(hash);
    row.manual_added = manual;
    ScoredContact {
        contact_hash: row.contact_hash.clone(),
        email: None,
        display_name: None,
        vip_score,
        confidence_score: 0.5,
        component_scores: None,
        metrics: MetricSnapshot::from(&row),
    }
}

pub(crate) fn email_event(
    direction: Direction,
    counterparty: &str,
    thread: &str,
    at: DateTime<Utc>,
) -> EmailEvent {
    let hash = ContactHash(counterparty.to_string());
    let (from_contact_hash, to_contact_hash) = match direction {
        Direction::Inbound => (Some(hash), None),
        Direction::Outbound => (None, Some(hash)),
    };
    EmailEvent {
        message_id: format!("msg-{thread}-{}", at.timestamp()),
        thread_id: thread.to_string(),
        direction,
        from_contact_hash,
        to_contact_hash,
        cc_contact_hashes: Vec::new(),
        timestamp: at,
        has_attachment: false,
        is_starred: false,
        is_important: false,
        is_reply: false,
        hour_of_day: Some(10),
        day_of_week: Some(2),
    }
}

pub(crate) fn meeting_event(
    attendees: &[&str],
    start: DateTime<Utc>,
    minutes: i64,
    is_recurring: bool,
) -> MeetingEvent {
    MeetingEvent {
        event_id: format!("evt-{}", start.timestamp()),
        start_time: start,
        end_time: start + Duration::minutes(minutes),
        attendee_contact_hashes: attendees
            .iter()
            .map(|hash| ContactHash((*hash).to_string()))
            .collect(),
        duration_minutes: Some(minutes),
        is_recurring,
        organizer_hash: None,
        user_is_organizer: true,
        user_response: "accepted".to_string(),
        is_one_on_one: attendees.len() <= 2,
        event_type: "default".to_string(),
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryEventSource {
    user_email: Arc<Mutex<Option<String>>>,
    emails: Arc<Mutex<Vec<EmailEvent>>>,
    meetings: Arc<Mutex<Vec<MeetingEvent>>>,
}

impl MemoryEventSource {
    pub(crate) fn with_user_email(email: &str) -> Self {
        let source = Self::default();
        *source.user_email.lock().expect("event mutex poisoned") = Some(email.to_string());
        source
    }

    pub(crate) fn push_email(&self, event: EmailEvent) {
        self.emails.lock().expect("event mutex poisoned").push(event);
    }

    pub(crate) fn push_meeting(&self, event: MeetingEvent) {
        self.meetings.lock().expect("event mutex poisoned").push(event);
    }
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn fetch_user_email(&self, _user_id: &UserId) -> Result<Option<String>, RepositoryError> {
        Ok(self.user_email.lock().expect("event mutex poisoned").clone())
    }

    async fn fetch_email_events(
        &self,
        _user_id: &UserId,
        window_start: DateTime<Utc>,
    ) -> Result<Vec<EmailEvent>, RepositoryError> {
        let mut events: Vec<EmailEvent> = self
            .emails
            .lock()
            .expect("event mutex poisoned")
            .iter()
            .filter(|event| event.timestamp >= window_start)
            .cloned()
            .collect();
        events.sort_by_key(|event| event.timestamp);
        Ok(events)
    }

    async fn fetch_meeting_events(
        &self,
        _user_id: &UserId,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<MeetingEvent>, RepositoryError> {
        Ok(self
            .meetings
            .lock()
            .expect("event mutex poisoned")
            .iter()
            .filter(|event| event.start_time >= window_start && event.start_time <= window_end)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct MemoryContactStore {
    rows: Arc<Mutex<HashMap<(UserId, ContactHash), ContactAggregate>>>,
    selections: Arc<Mutex<HashMap<UserId, Vec<ContactHash>>>>,
}

impl MemoryContactStore {
    pub(crate) fn seed(&self, rows: Vec<ContactAggregate>) {
        let mut guard = self.rows.lock().expect("store mutex poisoned");
        for row in rows {
            guard.insert((row.user_id.clone(), row.contact_hash.clone()), row);
        }
    }

    pub(crate) fn row(&self, user_id: &UserId, hash: &ContactHash) -> Option<ContactAggregate> {
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .get(&(user_id.clone(), hash.clone()))
            .cloned()
    }

    pub(crate) fn selection(&self, user_id: &UserId) -> Option<Vec<ContactHash>> {
        self.selections
            .lock()
            .expect("store mutex poisoned")
            .get(user_id)
            .cloned()
    }

    fn user_rows(&self, user_id: &UserId) -> Vec<ContactAggregate> {
        self.rows
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|row| row.user_id == *user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn upsert_aggregates(
        &self,
        user_id: &UserId,
        rows: &[ContactAggregate],
    ) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("store mutex poisoned");
        for row in rows {
            let key = (user_id.clone(), row.contact_hash.clone());
            match guard.get_mut(&key) {
                Some(existing) => {
                    let mut updated = row.clone();
                    updated.vip_score = existing.vip_score;
                    updated.confidence_score = existing.confidence_score;
                    updated.manual_added = existing.manual_added;
                    updated.email_domain = existing.email_domain.clone();
                    updated.is_shared_inbox = existing.is_shared_inbox;
                    *existing = updated;
                }
                None => {
                    guard.insert(key, row.clone());
                }
            }
        }
        Ok(())
    }

    async fn fetch_contacts(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ContactAggregate>, RepositoryError> {
        let mut rows = self.user_rows(user_id);
        rows.sort_by(|a, b| {
            b.vip_score
                .unwrap_or(0.0)
                .total_cmp(&a.vip_score.unwrap_or(0.0))
                .then_with(|| b.weighted_meeting_score.total_cmp(&a.weighted_meeting_score))
                .then_with(|| b.email_count_30d.cmp(&a.email_count_30d))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn fetch_contacts_for_rescore(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ContactAggregate>, RepositoryError> {
        let mut rows = self.user_rows(user_id);
        rows.sort_by(|a, b| {
            b.weighted_meeting_score
                .total_cmp(&a.weighted_meeting_score)
                .then_with(|| b.email_count_30d.cmp(&a.email_count_30d))
                .then_with(|| match (a.last_contact_at, b.last_contact_at) {
                    (Some(a_at), Some(b_at)) => b_at.cmp(&a_at),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn fetch_manual_contacts(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<ContactAggregate>, RepositoryError> {
        let mut rows: Vec<ContactAggregate> = self
            .user_rows(user_id)
            .into_iter()
            .filter(|row| row.manual_added)
            .collect();
        rows.sort_by(|a, b| a.contact_hash.cmp(&b.contact_hash));
        Ok(rows)
    }

    async fn count_contacts(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        Ok(self.user_rows(user_id).len() as u64)
    }

    async fn update_contact_scores(
        &self,
        user_id: &UserId,
        updates: &[ScoreUpdate],
    ) -> Result<(), RepositoryError> {
        let mut guard = self.rows.lock().expect("store mutex poisoned");
        for update in updates {
            let key = (user_id.clone(), update.contact_hash.clone());
            if let Some(row) = guard.get_mut(&key) {
                row.vip_score = Some(update.vip_score);
                row.confidence_score = Some(update.confidence_score);
            }
        }
        Ok(())
    }

    async fn clear_contact_scores(&self, user_id: &UserId) -> Result<u64, RepositoryError> {
        let mut guard = self.rows.lock().expect("store mutex poisoned");
        let mut touched = 0;
        for ((owner, _), row) in guard.iter_mut() {
            if owner == user_id {
                row.vip_score = None;
                row.confidence_score = None;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn replace_vip_selection(
        &self,
        user_id: &UserId,
        hashes: &[ContactHash],
    ) -> Result<(), RepositoryError> {
        let rows = self.rows.lock().expect("store mutex poisoned");
        let missing: Vec<ContactHash> = hashes
            .iter()
            .filter(|hash| !rows.contains_key(&(user_id.clone(), (*hash).clone())))
            .cloned()
            .collect();
        if !missing.is_empty() {
            let sample = missing.iter().take(3).cloned().collect();
            return Err(RepositoryError::UnknownContacts {
                missing: missing.len(),
                sample,
            });
        }
        drop(rows);
        self.selections
            .lock()
            .expect("store mutex poisoned")
            .insert(user_id.clone(), hashes.to_vec());
        Ok(())
    }
}

pub(crate) fn build_pipeline() -> (
    VipPipeline<MemoryEventSource, MemoryContactStore>,
    Arc<MemoryEventSource>,
    Arc<MemoryContactStore>,
) {
    build_pipeline_with(ScoringConfig::default())
}

pub(crate) fn build_pipeline_with(
    config: ScoringConfig,
) -> (
    VipPipeline<MemoryEventSource, MemoryContactStore>,
    Arc<MemoryEventSource>,
    Arc<MemoryContactStore>,
) {
    let events = Arc::new(MemoryEventSource::with_user_email("owner@example.com"));
    let store = Arc::new(MemoryContactStore::default());
    let pipeline = VipPipeline::new(events.clone(), store.clone(), test_hasher(), config);
    (pipeline, events, store)
}
