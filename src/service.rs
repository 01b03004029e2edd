//! Pipeline service tying aggregation, scoring, and selection together
//! over the repository seams.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::aggregation::{
    build_contact_aggregates, EMAIL_FETCH_LOOKBACK_DAYS, MEETING_LOOKBACK_DAYS,
};
use crate::config::AppConfig;
use crate::domain::{ContactAggregate, ContactHash, UserId};
use crate::identity::{IdentityError, Pseudonymizer};
use crate::repository::{ContactStore, EventSource, RepositoryError, ScoreUpdate};
use crate::scoring::{
    DomainScoringContext, ScoredContact, ScoringConfig, ScoringEngine, ScoringOutcome,
};
use crate::selection::{SelectionError, SelectionPolicy};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// One instance serves all users; every method takes the user it acts on.
pub struct VipPipeline<E, C> {
    events: Arc<E>,
    contacts: Arc<C>,
    hasher: Pseudonymizer,
    engine: ScoringEngine,
    selection: SelectionPolicy,
}

impl<E, C> VipPipeline<E, C>
where
    E: EventSource,
    C: ContactStore,
{
    pub fn new(
        events: Arc<E>,
        contacts: Arc<C>,
        hasher: Pseudonymizer,
        config: ScoringConfig,
    ) -> Self {
        let selection = SelectionPolicy::from(&config);
        Self {
            events,
            contacts,
            hasher,
            engine: ScoringEngine::new(config),
            selection,
        }
    }

    /// Builds the pipeline from application configuration. Fails when the
    /// hashing secret is absent or too short.
    pub fn from_config(
        events: Arc<E>,
        contacts: Arc<C>,
        config: &AppConfig,
    ) -> Result<Self, PipelineError> {
        let secret = config.hashing_secret.as_deref().unwrap_or_default();
        let hasher = Pseudonymizer::new(secret)?;
        Ok(Self::new(events, contacts, hasher, ScoringConfig::from(config)))
    }

    /// Rebuilds aggregate rows for one user from the trailing event
    /// windows. Returns the number of contacts written.
    pub async fn aggregate_contacts(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<usize, PipelineError> {
        let user_email = self.events.fetch_user_email(user_id).await?;
        let Some(user_email) = user_email.filter(|email| !email.is_empty()) else {
            warn!(
                user_id = %user_id.0,
                "skipping contact aggregation, user profile has no email"
            );
            return Ok(0);
        };
        let user_hash = self.hasher.hash_email(&user_email);

        let email_window_start = now - Duration::days(EMAIL_FETCH_LOOKBACK_DAYS);
        let meeting_window_start = now - Duration::days(MEETING_LOOKBACK_DAYS);
        let (emails, meetings) = tokio::try_join!(
            self.events.fetch_email_events(user_id, email_window_start),
            self.events
                .fetch_meeting_events(user_id, meeting_window_start, now),
        )?;

        let aggregates = build_contact_aggregates(user_id, &user_hash, &emails, &meetings, now);
        if aggregates.is_empty() {
            info!(user_id = %user_id.0, "no contacts to aggregate");
            return Ok(0);
        }

        let rows: Vec<ContactAggregate> = aggregates.into_values().collect();
        self.contacts.upsert_aggregates(user_id, &rows).await?;
        info!(
            user_id = %user_id.0,
            contact_count = rows.len(),
            "contacts aggregated"
        );
        Ok(rows.len())
    }

    /// Ranked VIP contacts for one user, served from stored scores when
    /// every candidate already carries one.
    pub async fn score_contacts(
        &self,
        user_id: &UserId,
        limit: Option<usize>,
        force_rescore: bool,
        now: DateTime<Utc>,
    ) -> Result<ScoringOutcome, PipelineError> {
        let limit = limit.unwrap_or(self.engine.config().default_limit);
        let domain = self.domain_context(user_id).await?;

        if !force_rescore {
            if let Some(contacts) = self.cached_scores(user_id, limit).await? {
                info!(
                    user_id = %user_id.0,
                    requested_limit = limit,
                    returned = contacts.len(),
                    "returning cached vip scores"
                );
                return Ok(ScoringOutcome::Cached { contacts });
            }
        }

        let candidates = self
            .contacts
            .fetch_contacts_for_rescore(user_id, limit * 2)
            .await?;
        let manual = self.contacts.fetch_manual_contacts(user_id).await?;
        let candidates = merge_candidates(candidates, manual);
        if candidates.is_empty() {
            info!(user_id = %user_id.0, "no contacts found for vip scoring");
            return Ok(ScoringOutcome::Fresh {
                contacts: Vec::new(),
            });
        }

        let mut scored: Vec<ScoredContact> = candidates
            .iter()
            .filter_map(|contact| self.engine.score_contact(contact, &domain, now))
            .collect();
        scored.sort_by(|a, b| b.vip_score.total_cmp(&a.vip_score));
        let top = ensure_manual_included(scored, limit);

        if !top.is_empty() {
            let updates: Vec<ScoreUpdate> = top
                .iter()
                .map(|contact| ScoreUpdate {
                    contact_hash: contact.contact_hash.clone(),
                    vip_score: contact.vip_score,
                    confidence_score: contact.confidence_score,
                })
                .collect();
            self.contacts.update_contact_scores(user_id, &updates).await?;
        }

        info!(
            user_id = %user_id.0,
            requested_limit = limit,
            returned = top.len(),
            "vip contacts scored"
        );
        Ok(ScoringOutcome::Fresh { contacts: top })
    }

    /// Validates and stores the user's VIP picks in the order given.
    pub async fn save_vip_selection(
        &self,
        user_id: &UserId,
        selected: &[ContactHash],
    ) -> Result<usize, PipelineError> {
        let unique = self.selection.validate(selected)?;
        self.contacts.replace_vip_selection(user_id, &unique).await?;
        info!(
            user_id = %user_id.0,
            count = unique.len(),
            "vip selection saved"
        );
        Ok(unique.len())
    }

    /// Clears stored scores so the next read recomputes them. Returns the
    /// number of rows touched.
    pub async fn invalidate_scores(&self, user_id: &UserId) -> Result<u64, PipelineError> {
        let cleared = self.contacts.clear_contact_scores(user_id).await?;
        info!(user_id = %user_id.0, cleared, "vip scores invalidated");
        Ok(cleared)
    }

    pub async fn get_aggregated_contacts(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ContactAggregate>, PipelineError> {
        Ok(self.contacts.fetch_contacts(user_id, limit).await?)
    }

    pub async fn has_contacts(&self, user_id: &UserId) -> Result<bool, PipelineError> {
        Ok(self.contacts.count_contacts(user_id).await? > 0)
    }

    /// Domain scoring needs resolved identities; without them the context
    /// stays disabled so scores never shift on unverifiable domains.
    async fn domain_context(
        &self,
        user_id: &UserId,
    ) -> Result<DomainScoringContext, PipelineError> {
        let config = self.engine.config();
        if !config.domain_scoring_enabled {
            return Ok(DomainScoringContext::disabled());
        }
        if !config.identity_enabled {
            warn!(
                user_id = %user_id.0,
                "domain scoring disabled because identity resolution is off"
            );
            return Ok(DomainScoringContext::disabled());
        }
        let user_email = self.events.fetch_user_email(user_id).await?;
        Ok(DomainScoringContext::for_user_email(user_email.as_deref()))
    }

    /// Stored scores are reusable only when at least one candidate has a
    /// score and no manual contact is missing one.
    async fn cached_scores(
        &self,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Option<Vec<ScoredContact>>, PipelineError> {
        let rows = self.contacts.fetch_contacts(user_id, limit).await?;
        let manual = self.contacts.fetch_manual_contacts(user_id).await?;
        let rows = merge_candidates(rows, manual);
        if rows.is_empty() {
            return Ok(None);
        }
        if rows.iter().all(|row| row.vip_score.is_none()) {
            return Ok(None);
        }
        if rows
            .iter()
            .any(|row| row.manual_added && row.vip_score.is_none())
        {
            return Ok(None);
        }
        let contacts: Vec<ScoredContact> = rows.iter().filter_map(ScoredContact::cached).collect();
        if contacts.is_empty() {
            return Ok(None);
        }
        Ok(Some(ensure_manual_included(contacts, limit)))
    }
}

/// Appends manual rows not already present. Rows with an empty hash are
/// dropped rather than merged.
fn merge_candidates(
    rows: Vec<ContactAggregate>,
    manual: Vec<ContactAggregate>,
) -> Vec<ContactAggregate> {
    let mut seen: HashSet<ContactHash> =
        rows.iter().map(|row| row.contact_hash.clone()).collect();
    let mut merged = rows;
    for row in manual {
        if row.contact_hash.0.is_empty() {
            continue;
        }
        if seen.insert(row.contact_hash.clone()) {
            merged.push(row);
        }
    }
    merged
}

/// Manual contacts always make the final list. They are appended after the
/// truncation cut; when that overflows the limit, manual contacts win
/// placement and the best remaining rows fill what is left.
fn ensure_manual_included(scored: Vec<ScoredContact>, limit: usize) -> Vec<ScoredContact> {
    if scored.is_empty() {
        return scored;
    }
    let manual: Vec<ScoredContact> = scored
        .iter()
        .filter(|contact| contact.metrics.manual_added)
        .cloned()
        .collect();
    if manual.is_empty() {
        let mut top = scored;
        top.truncate(limit);
        return top;
    }

    let mut top: Vec<ScoredContact> = scored.into_iter().take(limit).collect();
    let mut top_hashes: HashSet<ContactHash> =
        top.iter().map(|contact| contact.contact_hash.clone()).collect();
    for contact in manual {
        if top_hashes.insert(contact.contact_hash.clone()) {
            top.push(contact);
        }
    }
    if top.len() <= limit {
        return top;
    }

    top.sort_by(|a, b| b.vip_score.total_cmp(&a.vip_score));
    let (manual_items, non_manual_items): (Vec<_>, Vec<_>) = top
        .into_iter()
        .partition(|contact| contact.metrics.manual_added);
    if manual_items.len() >= limit {
        let mut items = manual_items;
        items.truncate(limit);
        return items;
    }
    let remaining = limit - manual_items.len();
    let mut result = manual_items;
    result.extend(non_manual_items.into_iter().take(remaining));
    result
}
