use crate::error::{AppError, Result};
use crate::functions::AppState;
use crate::functions::auth::AdminUser;
use crate::schema::{Event, EventFilter, EventPatch};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListEventsInput {
    pub search: Option<String>,
    pub verified: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn list_events(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Query(input): Query<ListEventsInput>,
) -> Result<Json<Vec<Event>>> {
    let filter = EventFilter {
        search: input
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        verified: input.verified,
        limit: input.limit.unwrap_or(50).clamp(1, 200),
        offset: input.offset.unwrap_or(0).max(0),
    };

    let events = state.events.list(&filter).await?;
    Ok(Json(events))
}

pub async fn get_event(
    State(state): State<AppState>,
    AdminUser(_): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<Event>> {
    let id = parse_event_id(&id)?;
    let event = state
        .events
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".into()))?;
    Ok(Json(event))
}

pub async fn update_event(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
    patch: std::result::Result<Json<EventPatch>, JsonRejection>,
) -> Result<Json<Event>> {
    let id = parse_event_id(&id)?;
    let Json(patch) = patch.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "event patch rejected");
        AppError::BadRequest("invalid event fields".into())
    })?;
    let mut event = state
        .events
        .find(id)
        .await
        .map_err(AppError::PersistenceFailed)?
        .ok_or_else(|| AppError::NotFound("Event".into()))?;

    patch.apply(&mut event).map_err(AppError::BadRequest)?;

    let updated = state
        .events
        .update_details(&event)
        .await
        .map_err(AppError::PersistenceFailed)?
        .ok_or_else(|| AppError::NotFound("Event".into()))?;

    tracing::info!(event_id = %id, actor = %actor.identity(), "event details updated");
    Ok(Json(updated))
}

/// Malformed ids cannot name an event, so they are reported as not found.
pub fn parse_event_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Event".into()))
}
