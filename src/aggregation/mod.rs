//! Aggregation engine: turns raw email and calendar events into one
//! statistics row per counterparty.

mod derive;
mod working_set;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::{ContactAggregate, ContactHash, Direction, EmailEvent, MeetingEvent, UserId};
use derive::{analyze_threads, consistency_score, initiation_score, meeting_recurrence_score};
use working_set::{meeting_weight, ContactWorkingSet};

/// Email fetch horizon. Days 31..=90 feed only the long recency bucket
/// and the first/last contact extremes.
pub const EMAIL_FETCH_LOOKBACK_DAYS: i64 = 90;
/// Window for every statistic suffixed `_30d`.
pub const EMAIL_STATS_WINDOW_DAYS: i64 = 30;
pub const MEETING_LOOKBACK_DAYS: i64 = 30;

/// Builds aggregate rows for every counterparty seen in the given events.
/// Deterministic in (events, now); the map is keyed and ordered by hash.
pub fn build_contact_aggregates(
    user_id: &UserId,
    user_hash: &ContactHash,
    emails: &[EmailEvent],
    meetings: &[MeetingEvent],
    now: DateTime<Utc>,
) -> BTreeMap<ContactHash, ContactAggregate> {
    let mut working: BTreeMap<ContactHash, ContactWorkingSet> = BTreeMap::new();

    for email in emails {
        let primary = match email.direction {
            Direction::Inbound => email.from_contact_hash.as_ref(),
            Direction::Outbound => email.to_contact_hash.as_ref(),
        };
        let Some(primary) = primary.filter(|hash| !hash.0.is_empty()) else {
            continue;
        };
        let age_days = (now - email.timestamp).num_days();
        let in_window = age_days <= EMAIL_STATS_WINDOW_DAYS;
        {
            let set = working.entry(primary.clone()).or_default();
            set.observe_extent(email.timestamp);
            set.record_bucket(age_days);
            if in_window {
                set.record_email(email);
            }
        }
        if !in_window {
            continue;
        }
        for cc in &email.cc_contact_hashes {
            if cc.0.is_empty() || cc == primary {
                continue;
            }
            working.entry(cc.clone()).or_default().record_cc();
        }
    }

    for meeting in meetings {
        let mut attendees: Vec<&ContactHash> = meeting
            .attendee_contact_hashes
            .iter()
            .filter(|hash| !hash.0.is_empty() && *hash != user_hash)
            .collect();
        attendees.sort();
        attendees.dedup();
        if attendees.is_empty() {
            continue;
        }
        let duration = meeting.duration_minutes.unwrap_or(0).max(0) as u32;
        let weight = meeting_weight(attendees.len(), duration, meeting.is_recurring);
        for attendee in attendees {
            let organized_by_contact = meeting.organizer_hash.as_ref() == Some(attendee);
            working
                .entry(attendee.clone())
                .or_default()
                .record_meeting(meeting, duration, weight, organized_by_contact);
        }
    }

    working
        .into_iter()
        .map(|(contact_hash, set)| {
            let aggregate = finalize(user_id, contact_hash.clone(), set);
            (contact_hash, aggregate)
        })
        .collect()
}

fn finalize(
    user_id: &UserId,
    contact_hash: ContactHash,
    set: ContactWorkingSet,
) -> ContactAggregate {
    let thread_count = set.thread_messages.len() as u32;
    let avg_thread_depth = if thread_count > 0 {
        f64::from(set.email_count) / f64::from(thread_count)
    } else {
        0.0
    };
    let off_hours_ratio = if set.email_count > 0 {
        f64::from(set.off_hours_count) / f64::from(set.email_count)
    } else {
        0.0
    };
    let stats = analyze_threads(&set.thread_messages, set.inbound_count);

    let mut first_contact_at = set.first_seen;
    let mut last_contact_at = set.last_seen;
    if let Some(first_meeting) = set.first_meeting_at {
        first_contact_at = Some(first_contact_at.map_or(first_meeting, |first| first.min(first_meeting)));
    }
    if let Some(last_meeting) = set.last_meeting_at {
        last_contact_at = Some(last_contact_at.map_or(last_meeting, |last| last.max(last_meeting)));
    }

    ContactAggregate {
        user_id: user_id.clone(),
        contact_hash,
        // Populated later by the identity hydration flow.
        email: None,
        display_name: None,
        email_count_30d: set.email_count,
        email_count_7d: set.email_count_7d,
        email_count_8_30d: set.email_count_8_30d,
        email_count_31_90d: set.email_count_31_90d,
        inbound_count_30d: set.inbound_count,
        outbound_count_30d: set.outbound_count,
        // Legacy column: mirrors outbound rather than counting solo
        // recipients.
        direct_email_count: set.outbound_count,
        cc_email_count: set.cc_count,
        thread_count_30d: thread_count,
        avg_thread_depth,
        attachment_email_count: set.attachment_count,
        starred_email_count: set.starred_count,
        important_email_count: set.important_count,
        reply_rate_30d: stats.reply_rate,
        median_response_hours: stats.median_response_hours,
        off_hours_ratio,
        threads_they_started: stats.threads_they_started,
        threads_you_started: stats.threads_you_started,
        meeting_count_30d: set.meeting_count,
        total_meeting_minutes: set.total_meeting_minutes,
        recurring_meeting_count: set.recurring_meeting_count,
        meetings_you_organized: set.meetings_you_organized,
        meetings_they_organized: set.meetings_they_organized,
        weighted_meeting_score: set.weighted_meeting_score,
        meeting_recurrence_score: meeting_recurrence_score(&set.meeting_times),
        first_contact_at,
        last_contact_at,
        consistency_score: consistency_score(&set.timestamps),
        initiation_score: initiation_score(stats.threads_they_started, stats.threads_you_started),
        email_domain: None,
        is_shared_inbox: false,
        manual_added: false,
        vip_score: None,
        confidence_score: None,
    }
}
