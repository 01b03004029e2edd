//! Derived statistics: thread behavior, cadence, and meeting rhythm.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::working_set::ThreadMessage;

const REPLY_WINDOW_HOURS: i64 = 48;

#[derive(Debug, Default)]
pub(crate) struct ThreadStats {
    pub threads_they_started: u32,
    pub threads_you_started: u32,
    pub reply_rate: f64,
    pub median_response_hours: Option<f64>,
}

/// Walks every thread to find who starts conversations and how fast the
/// user answers. A reply is the first outbound message following an
/// inbound one within 48 hours; a later first outbound ends the search
/// for that inbound message.
pub(crate) fn analyze_threads(
    thread_messages: &HashMap<String, Vec<ThreadMessage>>,
    inbound_count: u32,
) -> ThreadStats {
    let reply_window = Duration::hours(REPLY_WINDOW_HOURS);
    let mut stats = ThreadStats::default();
    let mut replies = 0u32;
    let mut response_hours = Vec::new();

    for messages in thread_messages.values() {
        let mut ordered = messages.clone();
        ordered.sort_by_key(|message| message.timestamp);
        let Some(first) = ordered.first() else {
            continue;
        };
        if first.direction.is_inbound() {
            stats.threads_they_started += 1;
        } else {
            stats.threads_you_started += 1;
        }

        for (idx, current) in ordered.iter().enumerate() {
            if !current.direction.is_inbound() {
                continue;
            }
            for future in &ordered[idx + 1..] {
                if future.direction.is_inbound() {
                    continue;
                }
                let elapsed = future.timestamp - current.timestamp;
                if elapsed <= reply_window {
                    replies += 1;
                    response_hours.push(elapsed.num_milliseconds() as f64 / 3_600_000.0);
                }
                // The first outbound settles this inbound either way.
                break;
            }
        }
    }

    stats.reply_rate = if inbound_count > 0 {
        f64::from(replies) / f64::from(inbound_count)
    } else {
        0.0
    };
    stats.median_response_hours = median(response_hours);
    stats
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// How evenly spaced the contact's emails are. Low variation between
/// inter-arrival gaps reads as a steady relationship.
pub(crate) fn consistency_score(timestamps: &[DateTime<Utc>]) -> f64 {
    if timestamps.len() < 4 {
        return 0.5;
    }
    let mut ordered = timestamps.to_vec();
    ordered.sort();
    let intervals: Vec<f64> = ordered
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_milliseconds() as f64 / 86_400_000.0)
        .filter(|days| *days > 0.0)
        .collect();
    if intervals.is_empty() {
        return 1.0;
    }
    let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
    if mean <= 0.0 {
        return 1.0;
    }
    let std_dev = if intervals.len() > 1 {
        let variance = intervals
            .iter()
            .map(|interval| (interval - mean).powi(2))
            .sum::<f64>()
            / intervals.len() as f64;
        variance.sqrt()
    } else {
        0.0
    };
    (1.0 - (std_dev / mean) / 3.0).clamp(0.0, 1.0)
}

/// Who tends to start threads. Floors at 0.5 so lack of thread data never
/// penalizes; contacts who reach out first rate higher.
pub(crate) fn initiation_score(threads_they_started: u32, threads_you_started: u32) -> f64 {
    let total = threads_they_started + threads_you_started;
    if total == 0 {
        return 0.5;
    }
    let their_rate = f64::from(threads_they_started) / f64::from(total);
    let score = if their_rate >= 0.5 {
        0.8 + 0.2 * (their_rate - 0.5) * 2.0
    } else {
        0.5 + 0.3 * their_rate * 2.0
    };
    score.clamp(0.5, 1.0)
}

/// Detects weekly/biweekly meeting cadences from whole-day gaps between
/// consecutive starts.
pub(crate) fn meeting_recurrence_score(meeting_times: &[DateTime<Utc>]) -> f64 {
    if meeting_times.len() < 3 {
        return 0.0;
    }
    let mut ordered = meeting_times.to_vec();
    ordered.sort();
    let intervals: Vec<i64> = ordered
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).num_days())
        .collect();
    let total = intervals.len() as f64;
    let weekly = intervals.iter().filter(|gap| (5..=9).contains(*gap)).count() as f64;
    let biweekly = intervals.iter().filter(|gap| (11..=17).contains(*gap)).count() as f64;

    if weekly / total >= 0.6 {
        1.0
    } else if biweekly / total >= 0.6 {
        0.8
    } else if (weekly + biweekly) / total >= 0.4 {
        0.5
    } else {
        0.2
    }
}
