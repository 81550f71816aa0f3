use crate::error::AppError;
use crate::schema::{Actor, Event, Verification};
use crate::services::badge::{self, BadgePlan, BadgeUpload};
use crate::services::{BadgeStore, EventRepository};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub verified: bool,
    pub badge: Option<BadgeUpload>,
}

/// Applies a verification toggle to an event.
///
/// Side effects run in a fixed order: the new badge is stored before the record
/// changes, and the superseded badge is deleted only after the record commit, so
/// the record never points at a removed asset.
pub struct VerificationService {
    events: Arc<dyn EventRepository>,
    badges: Arc<dyn BadgeStore>,
    default_badge: String,
}

impl VerificationService {
    pub fn new(
        events: Arc<dyn EventRepository>,
        badges: Arc<dyn BadgeStore>,
        default_badge: String,
    ) -> Self {
        Self {
            events,
            badges,
            default_badge,
        }
    }

    pub async fn apply(
        &self,
        id: Uuid,
        request: VerificationRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Event, AppError> {
        let event = self
            .events
            .find(id)
            .await
            .map_err(AppError::PersistenceFailed)?
            .ok_or_else(|| AppError::NotFound("Event".into()))?;

        let plan = badge::reconcile(
            request.verified,
            request.badge,
            event.verified_badge_image.as_deref(),
            &self.default_badge,
        );

        let (verification, stale, fresh) = match plan {
            BadgePlan::Remove { stale } => (Verification::cleared(), stale, None),
            BadgePlan::Retain { badge } => (grant(&event, actor, now, badge), None, None),
            BadgePlan::Replace { upload, previous } => {
                let stored = self
                    .badges
                    .store(&upload)
                    .await
                    .map_err(AppError::UploadFailed)?;
                tracing::info!(event_id = %id, badge = %stored, "badge stored");
                let stale = badge::superseded(previous, &stored);
                (
                    grant(&event, actor, now, stored.clone()),
                    stale,
                    Some(stored),
                )
            }
        };

        let updated = match self.events.update_verification(id, &verification).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.discard_fresh(id, fresh).await;
                return Err(AppError::NotFound("Event".into()));
            }
            Err(err) => {
                self.discard_fresh(id, fresh).await;
                return Err(AppError::PersistenceFailed(err));
            }
        };

        tracing::info!(
            event_id = %id,
            actor = %actor.identity(),
            actor_id = %actor.id,
            verified = updated.is_verified,
            badge = ?updated.verified_badge_image,
            "event verification updated"
        );

        if let Some(stale) = stale
            && let Err(err) = self.remove_badge(&stale).await
        {
            tracing::warn!(event_id = %id, badge = %stale, error = %err, "stale badge left behind");
        }

        Ok(updated)
    }

    async fn remove_badge(&self, reference: &str) -> Result<(), AppError> {
        self.badges
            .delete(reference)
            .await
            .map_err(AppError::DeleteFailed)
    }

    async fn discard_fresh(&self, id: Uuid, fresh: Option<String>) {
        let Some(fresh) = fresh else {
            return;
        };
        if let Err(err) = self.remove_badge(&fresh).await {
            tracing::warn!(event_id = %id, badge = %fresh, error = %err, "orphaned badge after failed update");
        }
    }
}

/// Keeps the original grant time and actor when the event is already verified.
/// A legacy record with mixed verification fields gets a fresh grant.
fn grant(event: &Event, actor: &Actor, now: DateTime<Utc>, badge: String) -> Verification {
    let current = event.verification();
    if current.is_verified && current.is_consistent() {
        Verification {
            verified_badge_image: Some(badge),
            ..current
        }
    } else {
        Verification::granted(now, actor.identity(), badge)
    }
}
