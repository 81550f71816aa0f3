use crate::error::{AppError, Result};
use crate::functions::AppState;
use crate::functions::auth::{AdminUser, CurrentUser};
use crate::functions::events::parse_event_id;
use crate::schema::{EventFilter, EventVerificationView};
use crate::services::VerificationRequest;
use crate::services::badge::BadgeUpload;
use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Raster formats only. Badges are served publicly, so no SVG.
const BADGE_CONTENT_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub message: String,
    pub event: EventVerificationView,
}

#[derive(Debug, Deserialize)]
pub struct ListVerificationsInput {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_verification(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<EventVerificationView>> {
    let id = parse_event_id(&id)?;
    let event = state
        .events
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".into()))?;
    Ok(Json(EventVerificationView::from(&event)))
}

pub async fn list_verifications(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(input): Query<ListVerificationsInput>,
) -> Result<Json<Vec<EventVerificationView>>> {
    let filter = EventFilter {
        limit: input.limit.unwrap_or(100).clamp(1, 500),
        offset: input.offset.unwrap_or(0).max(0),
        ..Default::default()
    };
    let events = state.events.list(&filter).await?;
    Ok(Json(events.iter().map(EventVerificationView::from).collect()))
}

pub async fn update_verification(
    State(state): State<AppState>,
    AdminUser(actor): AdminUser,
    Path(id): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<VerifyResponse>> {
    let id = parse_event_id(&id)?;
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "verification form rejected");
        AppError::BadRequest("expected a multipart form".into())
    })?;
    let request = read_verify_form(multipart, state.max_badge_bytes).await?;

    let event = state
        .verification
        .apply(id, request, &actor, Utc::now())
        .await?;

    let message = if event.is_verified {
        "Event verified successfully"
    } else {
        "Event verification removed"
    };

    Ok(Json(VerifyResponse {
        success: true,
        message: message.to_string(),
        event: EventVerificationView::from(&event),
    }))
}

async fn read_verify_form(
    mut multipart: Multipart,
    max_badge_bytes: usize,
) -> Result<VerificationRequest> {
    let mut verified = None;
    let mut badge = None;
    let mut badge_seen = false;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "isVerified" => {
                let raw = field.text().await.map_err(form_error)?;
                verified = Some(parse_verified(&raw)?);
            }
            "badgeFile" => {
                if badge_seen {
                    return Err(AppError::BadRequest(
                        "badgeFile may only be sent once".into(),
                    ));
                }
                badge_seen = true;
                let file_name = field.file_name().map(str::to_string);
                let declared = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(form_error)?;
                badge = badge_upload(bytes.to_vec(), declared, file_name, max_badge_bytes)?;
            }
            _ => {}
        }
    }

    let verified =
        verified.ok_or_else(|| AppError::BadRequest("isVerified is required".into()))?;
    Ok(VerificationRequest { verified, badge })
}

fn form_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest("badge image is too large".into())
    } else {
        tracing::debug!(error = %err.body_text(), "malformed verification form");
        AppError::BadRequest("malformed form data".into())
    }
}

fn parse_verified(raw: &str) -> Result<bool> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(AppError::BadRequest(
            "isVerified must be \"true\" or \"false\"".into(),
        )),
    }
}

/// Validates the uploaded part. Browsers send an empty part when no file was
/// picked; that counts as no upload.
fn badge_upload(
    bytes: Vec<u8>,
    declared: Option<String>,
    file_name: Option<String>,
    max_badge_bytes: usize,
) -> Result<Option<BadgeUpload>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    if bytes.len() > max_badge_bytes {
        return Err(AppError::BadRequest(format!(
            "badge image exceeds {max_badge_bytes} bytes"
        )));
    }

    let content_type = declared
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream")
        .or_else(|| {
            file_name
                .as_deref()
                .and_then(|name| mime_guess::from_path(name).first())
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_default();

    if !BADGE_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::BadRequest(
            "badgeFile must be a PNG, JPEG, GIF or WebP image".into(),
        ));
    }

    Ok(Some(BadgeUpload {
        bytes,
        content_type,
        file_name,
    }))
}
