//! One inbound message → one reply.
//!
//! Order per turn: dedup, empty-message greeting, then under the user's turn
//! lock: load session, capture contact info, respond, append the exchange,
//! persist intents and the compliance-query log.

use std::time::Instant;

use lq_domain::config::BrandConfig;
use lq_domain::trace::TraceEvent;
use lq_domain::LeadPath;
use serde::Serialize;

use crate::runtime::extractor::clean_phone;
use crate::state::AppState;

pub const GREETING: &str = "Assalamu Alaikum! I'm here to help. What would you like to know about \
China Sourcing, Amazon FBA, or Halal Trading?";

const DEFAULT_REPLIES: &[&str] = &["Sourcing Help", "Amazon FBA", "Trading Mentorship", "Hudood App"];

const COMPLIANCE_TOPIC: &str = "Stock Screening";

/// Inbound message after payload parsing.
#[derive(Debug, Clone, Default)]
pub struct InboundTurn {
    pub user_id: String,
    pub message: String,
    pub message_id: Option<String>,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
}

/// What the caller sends back to the messaging platform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    pub reply: String,
    pub quick_replies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TurnMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnMetadata {
    pub session_id: String,
    pub path: Option<String>,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Already seen; acknowledge without replying.
    Duplicate,
    Reply(TurnReply),
}

impl TurnReply {
    pub fn greeting() -> Self {
        Self {
            reply: GREETING.into(),
            quick_replies: quick_replies(None),
            metadata: None,
        }
    }

    /// Canned reply for a turn that failed outside the responder.
    pub fn support(brand: &BrandConfig) -> Self {
        Self {
            reply: format!(
                "I apologize for the inconvenience. Please reach out to our team at {} for \
                 immediate assistance.",
                brand.official_contact
            ),
            quick_replies: vec!["Contact Support".into()],
            metadata: None,
        }
    }
}

/// Suggested buttons for the path the reply moved to.
pub fn quick_replies(path: Option<LeadPath>) -> Vec<String> {
    let replies: &[&str] = match path {
        Some(LeadPath::A) => &["Check Broadcast Channel", "Custom Sourcing", "Pricing Info", "Talk to Team"],
        Some(LeadPath::B) => &["Watch Video", "Course Details", "Check My Budget", "Ready to Enroll"],
        Some(LeadPath::C) => &["Watch Roadmap", "Course Details", "Buy the Book", "Start Learning"],
        Some(LeadPath::D) => &["Open Hudood App", "Learn Trading", "Check Another Stock"],
        Some(LeadPath::E) | None => DEFAULT_REPLIES,
    };
    replies.iter().map(|s| s.to_string()).collect()
}

/// Handle one inbound message end to end.
pub async fn handle_turn(state: &AppState, turn: InboundTurn) -> TurnOutcome {
    let started = Instant::now();

    // Content hashing only covers deliveries that carry no message id.
    let duplicate = match turn.message_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => state.sessions.is_duplicate(Some(id), None, None).await,
        None => {
            state
                .sessions
                .is_duplicate(None, Some(&turn.user_id), Some(&turn.message))
                .await
        }
    };
    if duplicate {
        tracing::info!(user_id = %turn.user_id, message_id = ?turn.message_id, "duplicate delivery, skipping");
        TraceEvent::DuplicateSkipped {
            user_id: turn.user_id.clone(),
            message_id: turn.message_id.clone(),
            by_content: turn.message_id.is_none(),
        }
        .emit();
        return TurnOutcome::Duplicate;
    }

    if turn.message.trim().is_empty() {
        return TurnOutcome::Reply(TurnReply::greeting());
    }

    TurnOutcome::Reply(run_turn(state, turn, started).await)
}

async fn run_turn(state: &AppState, turn: InboundTurn, started: Instant) -> TurnReply {
    let _permit = match state.turn_locks.acquire(&turn.user_id).await {
        Ok(permit) => Some(permit),
        Err(e) => {
            tracing::warn!(user_id = %turn.user_id, error = %e, "turn lock unavailable, continuing unserialized");
            None
        }
    };

    let session = state.sessions.get_session(&turn.user_id).await;
    capture_contact(state, &turn).await;

    let result = state
        .responder
        .generate_response(&state.llm, state.leads.as_ref(), &turn.message, &session)
        .await;

    let updated = state
        .sessions
        .update_session(&turn.user_id, &turn.message, &result.reply, result.detected_path)
        .await;

    if result.intents.any_lead_intent() {
        if let Err(e) = state
            .leads
            .update_intents(&turn.user_id, result.intents.ready_to_pay, result.intents.wants_call)
            .await
        {
            tracing::warn!(user_id = %turn.user_id, stage = "update_intents", error = %e, "intent update failed");
        }
    }

    if result.detected_path == Some(LeadPath::D) && turn.message.to_lowercase().contains("halal") {
        if let Err(e) = state
            .leads
            .log_compliance_query(&turn.user_id, &turn.message, COMPLIANCE_TOPIC)
            .await
        {
            tracing::warn!(user_id = %turn.user_id, stage = "compliance_log", error = %e, "compliance query log failed");
        }
    }

    let latency_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        user_id = %turn.user_id,
        path = ?result.detected_path,
        latency_ms,
        "reply generated"
    );

    TurnReply {
        reply: result.reply,
        quick_replies: quick_replies(result.detected_path),
        metadata: Some(TurnMetadata {
            session_id: updated.lead_id,
            path: result.detected_path.map(|p| p.to_string()),
            latency_ms,
        }),
    }
}

async fn capture_contact(state: &AppState, turn: &InboundTurn) {
    let name = turn.contact_name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let phone = clean_phone(turn.contact_phone.as_deref(), &state.config.brand.default_country_code);
    if name.is_none() && phone.is_none() {
        return;
    }
    if let Err(e) = state.leads.update_contact(&turn.user_id, name, phone.as_deref()).await {
        tracing::warn!(user_id = %turn.user_id, stage = "update_contact", error = %e, "contact update failed");
    }
}
