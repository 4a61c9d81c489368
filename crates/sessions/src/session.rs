use chrono::{DateTime, Utc};
use lq_domain::chat::Role;
use lq_domain::LeadPath;
use serde::{Deserialize, Serialize};

/// Lead id prefix for sessions created without a relational store.
pub const LOCAL_LEAD_PREFIX: &str = "local-";
/// Lead id prefix for the fallback session returned when loading failed.
pub const TEMP_LEAD_PREFIX: &str = "temp-";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One stored transcript entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Message {
    pub fn user(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(at),
        }
    }

    pub fn assistant(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Some(at),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SessionData
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Live conversational state for one external user id.
///
/// Serialized as camelCase JSON into the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub lead_id: String,
    #[serde(alias = "manychatId")]
    pub external_user_id: String,
    #[serde(default)]
    pub current_path: Option<LeadPath>,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub is_processed: bool,
}

impl SessionData {
    pub fn new(external_user_id: &str, lead_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            lead_id: lead_id.into(),
            external_user_id: external_user_id.to_owned(),
            current_path: None,
            messages: Vec::new(),
            last_activity: now,
            is_processed: false,
        }
    }

    /// Fresh session for a store without a relational mirror.
    pub fn local(external_user_id: &str, now: DateTime<Utc>) -> Self {
        Self::new(external_user_id, format!("{LOCAL_LEAD_PREFIX}{external_user_id}"), now)
    }

    /// Minimal safe session handed out when loading failed.
    pub fn temporary(external_user_id: &str, now: DateTime<Utc>) -> Self {
        Self::new(external_user_id, format!("{TEMP_LEAD_PREFIX}{external_user_id}"), now)
    }

    /// Whether this session's lead exists in the relational mirror.
    pub fn is_mirrored(&self) -> bool {
        !self.lead_id.starts_with(LOCAL_LEAD_PREFIX) && !self.lead_id.starts_with(TEMP_LEAD_PREFIX)
    }

    /// Append one user/assistant exchange.
    ///
    /// Keeps only the newest `history_limit` messages, moves the path only
    /// when `detected` is `Some`, bumps `last_activity` and re-arms the
    /// inactivity sweep.
    pub fn record_turn(
        &mut self,
        user_text: &str,
        bot_text: &str,
        detected: Option<LeadPath>,
        history_limit: usize,
        now: DateTime<Utc>,
    ) {
        self.messages.push(Message::user(user_text, now));
        self.messages.push(Message::assistant(bot_text, now));
        if self.messages.len() > history_limit {
            let excess = self.messages.len() - history_limit;
            self.messages.drain(..excess);
        }
        if detected.is_some() {
            self.current_path = detected;
        }
        self.last_activity = now;
        self.is_processed = false;
    }

    /// The newest `k` messages, oldest first.
    pub fn recent(&self, k: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(k);
        &self.messages[start..]
    }

    /// Idle since before `cutoff` and not yet handed to the extractor.
    pub fn is_inactive(&self, cutoff: DateTime<Utc>) -> bool {
        self.last_activity < cutoff && !self.is_processed
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
