//! `POST /api/webhook/manychat`: the messaging platform's delivery endpoint.
//!
//! The body is parsed by hand so any malformed payload gets the same
//! `400 {"error":"Invalid payload"}` shape.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::runtime::turn::{handle_turn, InboundTurn, TurnOutcome, TurnReply};
use crate::state::AppState;

/// Platform payload. Either id field may be a string or a number.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub subscriber_id: Option<Value>,
    #[serde(default)]
    pub manychat_id: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub message_id: Option<Value>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub contact_info: Option<ContactInfo>,
    #[serde(default)]
    pub trigger: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactInfo {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl WebhookPayload {
    /// Normalize into a turn. Fails when no user id is present.
    pub fn into_turn(self) -> Result<InboundTurn, &'static str> {
        let user_id = self
            .subscriber_id
            .as_ref()
            .and_then(id_string)
            .or_else(|| self.manychat_id.as_ref().and_then(id_string))
            .ok_or("Either subscriber_id or manychat_id is required")?;

        let message = self
            .user_message
            .filter(|m| !m.is_empty())
            .or(self.message)
            .unwrap_or_default();

        let contact = self.contact_info.unwrap_or_default();
        Ok(InboundTurn {
            user_id,
            message,
            message_id: self.message_id.as_ref().and_then(id_string),
            contact_name: contact.first_name,
            contact_phone: contact.phone,
        })
    }
}

fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn invalid_payload(details: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": "Invalid payload", "details": details.into() })),
    )
        .into_response()
}

pub async fn manychat(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => return invalid_payload(e.to_string()),
    };
    let turn = match payload.into_turn() {
        Ok(t) => t,
        Err(msg) => return invalid_payload(msg),
    };

    let preview: String = turn.message.chars().take(50).collect();
    tracing::info!(user_id = %turn.user_id, message = %preview, "webhook received");

    // A panic inside the turn surfaces as a JoinError and becomes the
    // support reply instead of a dropped connection.
    let task_state = state.clone();
    let joined = tokio::spawn(async move { handle_turn(&task_state, turn).await }).await;

    match joined {
        Ok(TurnOutcome::Duplicate) => Json(serde_json::json!({ "status": "duplicate" })).into_response(),
        Ok(TurnOutcome::Reply(reply)) => Json(serde_json::json!({ "response": reply })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "webhook turn failed");
            let reply = TurnReply::support(&state.config.brand);
            Json(serde_json::json!({ "response": reply })).into_response()
        }
    }
}
