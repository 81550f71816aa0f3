use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("insufficient role")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("badge upload failed: {0:#}")]
    UploadFailed(anyhow::Error),

    #[error("badge cleanup failed: {0:#}")]
    DeleteFailed(anyhow::Error),

    #[error("persistence failed: {0:#}")]
    PersistenceFailed(anyhow::Error),

    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Internal detail of a 5xx response, stashed in the response extensions so the
/// router can decide whether to expose it.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub public: String,
    pub internal: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UploadFailed(_)
            | AppError::DeleteFailed(_)
            | AppError::PersistenceFailed(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn public_message(&self) -> String {
        match self {
            AppError::Unauthenticated => "Unauthorized".into(),
            AppError::Forbidden => "Forbidden".into(),
            AppError::NotFound(what) => format!("{what} not found"),
            AppError::BadRequest(reason) => reason.clone(),
            AppError::UploadFailed(_) => "Failed to upload badge image".into(),
            AppError::PersistenceFailed(_) => "Failed to update event".into(),
            AppError::DeleteFailed(_) | AppError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let public = self.public_message();

        let mut response = (
            status,
            Json(json!({
                "success": false,
                "error": public,
            })),
        )
            .into_response();

        if status.is_server_error() {
            let internal = self.to_string();
            tracing::error!(status = status.as_u16(), error = %internal, "request failed");
            response
                .extensions_mut()
                .insert(ErrorDetail { public, internal });
        }

        response
    }
}

pub type Result<T, E = AppError> = core::result::Result<T, E>;
