pub mod auth;
pub mod health;
pub mod webhook;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the API router.
///
/// The health probe is public. The webhook is gated by the shared-secret
/// middleware, which is a no-op when `server.webhook_secret` is unset.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new().route("/api/health", get(health::health));

    let protected = Router::new()
        .route("/api/webhook/manychat", post(webhook::manychat))
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_webhook_secret,
        ));

    public.merge(protected)
}
