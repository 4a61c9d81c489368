//! Webhook shared-secret middleware.
//!
//! `server.webhook_secret` is hashed once at startup into `AppState`. When
//! set, every webhook delivery must carry the same value in
//! `X-Webhook-Secret`; when unset, deliveries pass through.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

pub const SECRET_HEADER: &str = "x-webhook-secret";

pub async fn require_webhook_secret(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected_hash) = &state.webhook_secret_hash else {
        return next.run(req).await;
    };

    let provided = req
        .headers()
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    // Fixed-length digests keep the comparison independent of secret length.
    let provided_hash = Sha256::digest(provided.as_bytes());
    if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
        tracing::warn!("webhook rejected: bad or missing shared secret");
        return (
            StatusCode::UNAUTHORIZED,
            axum::Json(serde_json::json!({ "error": "invalid or missing webhook secret" })),
        )
            .into_response();
    }

    next.run(req).await
}
