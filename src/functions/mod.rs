pub mod auth;
pub mod events;
pub mod verify;

use crate::error::ErrorDetail;
use crate::services::{EventRepository, SessionVerifier, VerificationService};
use axum::extract::{DefaultBodyLimit, Request, State};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;

/// Room for the non-file form fields and multipart framing.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub events: Arc<dyn EventRepository>,
    pub sessions: Arc<dyn SessionVerifier>,
    pub verification: Arc<VerificationService>,
    pub max_badge_bytes: usize,
    pub expose_error_details: bool,
}

pub fn router(state: AppState) -> Router {
    let badge_limit = DefaultBodyLimit::max(state.max_badge_bytes + FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(health))
        .route("/events", get(events::list_events))
        .route(
            "/events/{id}",
            get(events::get_event).patch(events::update_event),
        )
        .route(
            "/events/{id}/verify",
            get(verify::get_verification)
                .post(verify::update_verification)
                .layer(badge_limit),
        )
        .route("/verifications", get(verify::list_verifications))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            attach_error_details,
        ))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Adds the internal error text to 5xx bodies outside production.
async fn attach_error_details(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.expose_error_details {
        return response;
    }
    let Some(detail) = response.extensions().get::<ErrorDetail>().cloned() else {
        return response;
    };

    let status = response.status();
    (
        status,
        Json(json!({
            "success": false,
            "error": detail.public,
            "details": detail.internal,
        })),
    )
        .into_response()
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::services::testing::*;
    use axum::body::Body;
    use axum::http::{Method, StatusCode, header};
    use tower::ServiceExt;

    pub const ADMIN_TOKEN: &str = "admin-session";
    pub const MEMBER_TOKEN: &str = "member-session";
    pub const DEFAULT_BADGE: &str = "/images/verified-badge.png";
    const BOUNDARY: &str = "----event-admin-test-boundary";

    pub enum FormPart<'a> {
        Text(&'a str, &'a str),
        File {
            name: &'a str,
            file_name: &'a str,
            content_type: &'a str,
            bytes: &'a [u8],
        },
    }

    pub struct TestApp {
        pub events: Arc<InMemoryEvents>,
        pub badges: Arc<RecordingBadgeStore>,
        router: Router,
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with_badges(RecordingBadgeStore::default(), true)
        }

        pub fn with_badges(badges: RecordingBadgeStore, expose_error_details: bool) -> Self {
            let events = Arc::new(InMemoryEvents::default());
            let badges = Arc::new(badges);
            let sessions = StaticSessions::default()
                .with(ADMIN_TOKEN, admin())
                .with(MEMBER_TOKEN, member());

            let state = AppState {
                events: events.clone(),
                sessions: Arc::new(sessions),
                verification: Arc::new(VerificationService::new(
                    events.clone(),
                    badges.clone(),
                    DEFAULT_BADGE.into(),
                )),
                max_badge_bytes: 1024,
                expose_error_details,
            };

            Self {
                events,
                badges,
                router: router(state),
            }
        }

        pub async fn send(&self, request: axum::http::Request<Body>) -> (StatusCode, serde_json::Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body = if bytes.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&bytes)
                    .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()))
            };
            (status, body)
        }

        pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, serde_json::Value) {
            let mut request = axum::http::Request::builder().uri(path);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            self.send(request.body(Body::empty()).unwrap()).await
        }

        pub async fn patch_json(
            &self,
            path: &str,
            token: &str,
            body: serde_json::Value,
        ) -> (StatusCode, serde_json::Value) {
            let request = axum::http::Request::builder()
                .method(Method::PATCH)
                .uri(path)
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }

        pub async fn post_form(
            &self,
            path: &str,
            token: &str,
            parts: &[FormPart<'_>],
        ) -> (StatusCode, serde_json::Value) {
            let request = form_request(path)
                .header(header::COOKIE, format!("session_token={token}"))
                .body(Body::from(multipart_body(parts)))
                .unwrap();
            self.send(request).await
        }

        pub async fn post_form_anonymous(
            &self,
            path: &str,
            parts: &[FormPart<'_>],
        ) -> (StatusCode, serde_json::Value) {
            let request = form_request(path)
                .body(Body::from(multipart_body(parts)))
                .unwrap();
            self.send(request).await
        }
    }

    fn form_request(path: &str) -> axum::http::request::Builder {
        axum::http::Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
    }

    fn multipart_body(parts: &[FormPart<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                FormPart::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                            .as_bytes(),
                    );
                }
                FormPart::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                    body.extend_from_slice(b"\r\n");
                }
            }
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = TestApp::new();
        let (status, body) = app.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn oversized_badge_is_rejected() {
        let app = TestApp::new();
        let event = app.events.insert(sample_event());
        let big = vec![7u8; 4096];

        let (status, _) = app
            .post_form(
                &format!("/events/{}/verify", event.id),
                ADMIN_TOKEN,
                &[
                    FormPart::Text("isVerified", "true"),
                    FormPart::File {
                        name: "badgeFile",
                        file_name: "badge.png",
                        content_type: "image/png",
                        bytes: &big,
                    },
                ],
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.badges.stored().is_empty());
        assert!(!app.events.get(event.id).unwrap().is_verified);
    }
}
