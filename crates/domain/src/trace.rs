use serde::Serialize;

/// Structured trace events emitted across all leadqual crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionCreated {
        user_id: String,
        lead_id: String,
        source: String,
    },
    SessionUpdated {
        user_id: String,
        path: Option<String>,
        messages: usize,
    },
    DuplicateSkipped {
        user_id: String,
        message_id: Option<String>,
        by_content: bool,
    },
    CacheDegraded {
        operation: String,
        reason: String,
    },
    LlmRequest {
        provider: String,
        model: String,
        role: String,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    ComplianceRefusal {
        user_id: String,
        category: String,
    },
    ExtractionCompleted {
        user_id: String,
        path: String,
        bot_score: u8,
        is_important: bool,
    },
    SweepCompleted {
        inactive: usize,
        extracted: usize,
        failed: usize,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "lq_event");
    }
}
