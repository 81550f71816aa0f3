use crate::error::AppError;
use crate::functions::AppState;
use crate::schema::Actor;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};

const SESSION_COOKIE: &str = "session_token";

/// Any signed-in user.
pub struct CurrentUser(pub Actor);

/// A signed-in user with an elevated role.
pub struct AdminUser(pub Actor);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let token = session_token(&parts.headers).ok_or(AppError::Unauthenticated)?;
        let actor = state
            .sessions
            .resolve(&token)
            .await
            .map_err(AppError::Internal)?
            .ok_or(AppError::Unauthenticated)?;
        Ok(Self(actor))
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let CurrentUser(actor) = CurrentUser::from_request_parts(parts, state).await?;
        if !actor.role.is_elevated() {
            tracing::info!(actor = %actor.identity(), role = %actor.role, "elevated role required");
            return Err(AppError::Forbidden);
        }
        Ok(Self(actor))
    }
}

/// Bearer token first, then the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
