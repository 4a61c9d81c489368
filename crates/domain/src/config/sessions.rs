use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Sessions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Live conversation state settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// TTL of `session:<userId>` keys.
    #[serde(default = "d_24")]
    pub ttl_hours: u64,
    /// Idle time after which an unprocessed session is handed to the extractor.
    #[serde(default = "d_15")]
    pub inactivity_minutes: i64,
    /// Messages kept in live state; older ones are dropped on every write.
    #[serde(default = "d_12")]
    pub history_limit: usize,
    /// Recent messages sent to the responder with each turn.
    #[serde(default = "d_12")]
    pub context_window: usize,
    /// TTL of `dedup:<messageId>` markers.
    #[serde(default = "d_300")]
    pub dedup_ttl_secs: u64,
    /// TTL of `dedup:content:<userId>:<hash>` markers.
    #[serde(default = "d_60")]
    pub content_dedup_ttl_secs: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            ttl_hours: d_24(),
            inactivity_minutes: d_15(),
            history_limit: d_12(),
            context_window: d_12(),
            dedup_ttl_secs: d_300(),
            content_dedup_ttl_secs: d_60(),
        }
    }
}

impl SessionsConfig {
    pub fn ttl_secs(&self) -> u64 {
        self.ttl_hours * 3600
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_24() -> u64 {
    24
}
fn d_15() -> i64 {
    15
}
fn d_12() -> usize {
    12
}
fn d_300() -> u64 {
    300
}
fn d_60() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = SessionsConfig::default();
        assert_eq!(cfg.ttl_secs(), 86_400);
        assert_eq!(cfg.inactivity_minutes, 15);
        assert_eq!(cfg.history_limit, 12);
        assert_eq!(cfg.dedup_ttl_secs, 300);
        assert_eq!(cfg.content_dedup_ttl_secs, 60);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: SessionsConfig = toml::from_str("history_limit = 4").unwrap();
        assert_eq!(cfg.history_limit, 4);
        assert_eq!(cfg.context_window, 12);
    }
}
