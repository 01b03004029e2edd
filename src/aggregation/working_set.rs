//! Per-contact accumulator filled while walking raw events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{Direction, EmailEvent, MeetingEvent};

/// One message observed in a thread, kept for reply-time analysis.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ThreadMessage {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
}

/// Running counters for a single counterparty. Emails older than the
/// stats window touch only the extent and bucket fields.
#[derive(Debug, Default)]
pub(crate) struct ContactWorkingSet {
    pub email_count: u32,
    pub email_count_7d: u32,
    pub email_count_8_30d: u32,
    pub email_count_31_90d: u32,
    pub inbound_count: u32,
    pub outbound_count: u32,
    pub cc_count: u32,
    pub attachment_count: u32,
    pub starred_count: u32,
    pub important_count: u32,
    pub thread_messages: HashMap<String, Vec<ThreadMessage>>,
    pub timestamps: Vec<DateTime<Utc>>,
    pub off_hours_count: u32,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub meeting_count: u32,
    pub total_meeting_minutes: u32,
    pub recurring_meeting_count: u32,
    pub meetings_you_organized: u32,
    pub meetings_they_organized: u32,
    pub weighted_meeting_score: f64,
    pub meeting_times: Vec<DateTime<Utc>>,
    pub first_meeting_at: Option<DateTime<Utc>>,
    pub last_meeting_at: Option<DateTime<Utc>>,
}

impl ContactWorkingSet {
    /// Widens first/last seen; called for every email regardless of age.
    pub fn observe_extent(&mut self, timestamp: DateTime<Utc>) {
        self.first_seen = Some(self.first_seen.map_or(timestamp, |first| first.min(timestamp)));
        self.last_seen = Some(self.last_seen.map_or(timestamp, |last| last.max(timestamp)));
    }

    pub fn record_bucket(&mut self, age_days: i64) {
        if age_days <= 7 {
            self.email_count_7d += 1;
        } else if age_days <= 30 {
            self.email_count_8_30d += 1;
        } else {
            self.email_count_31_90d += 1;
        }
    }

    /// Full accumulation for an email inside the stats window.
    pub fn record_email(&mut self, email: &EmailEvent) {
        self.email_count += 1;
        self.timestamps.push(email.timestamp);
        self.thread_messages
            .entry(email.thread_id.clone())
            .or_default()
            .push(ThreadMessage {
                timestamp: email.timestamp,
                direction: email.direction,
            });
        match email.direction {
            Direction::Inbound => self.inbound_count += 1,
            Direction::Outbound => self.outbound_count += 1,
        }
        if email.has_attachment {
            self.attachment_count += 1;
        }
        if email.is_starred {
            self.starred_count += 1;
        }
        if email.is_important {
            self.important_count += 1;
        }
        // Off-hours needs both local-time fields; Sunday = 0, Saturday = 6.
        if let (Some(hour), Some(day)) = (email.hour_of_day, email.day_of_week) {
            if hour < 8 || hour >= 19 || day == 0 || day == 6 {
                self.off_hours_count += 1;
            }
        }
    }

    pub fn record_cc(&mut self) {
        self.cc_count += 1;
    }

    pub fn record_meeting(
        &mut self,
        meeting: &MeetingEvent,
        duration_minutes: u32,
        weight: f64,
        organized_by_contact: bool,
    ) {
        self.meeting_count += 1;
        self.total_meeting_minutes += duration_minutes;
        if meeting.is_recurring {
            self.recurring_meeting_count += 1;
        }
        if meeting.user_is_organizer {
            self.meetings_you_organized += 1;
        }
        if organized_by_contact {
            self.meetings_they_organized += 1;
        }
        self.weighted_meeting_score += weight;
        self.meeting_times.push(meeting.start_time);
        self.first_meeting_at = Some(
            self.first_meeting_at
                .map_or(meeting.start_time, |first| first.min(meeting.start_time)),
        );
        self.last_meeting_at = Some(
            self.last_meeting_at
                .map_or(meeting.start_time, |last| last.max(meeting.start_time)),
        );
    }
}

/// Weight of one meeting toward a contact's meeting score. Small and long
/// meetings signal more than large or short ones; recurrence adds a bump.
pub(crate) fn meeting_weight(attendee_count: usize, duration_minutes: u32, is_recurring: bool) -> f64 {
    let base = match attendee_count {
        0..=2 => 1.0,
        3..=5 => 0.7,
        6..=10 => 0.4,
        11..=20 => 0.2,
        _ => 0.05,
    };
    let duration_modifier = match duration_minutes {
        0..=29 => 0.5,
        30..=59 => 1.0,
        60..=119 => 1.25,
        _ => 1.5,
    };
    let recurring_bonus = if is_recurring { 1.1 } else { 1.0 };
    base * duration_modifier * recurring_bonus
}
