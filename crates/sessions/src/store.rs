//! Cache-backed session store.
//!
//! Sessions are JSON blobs under `session:<userId>` with the configured TTL.
//! Every method swallows backend failures: callers always get a usable
//! session (or `false` / an empty list) and the failure is logged.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use lq_cache::Cache;
use lq_domain::config::SessionsConfig;
use lq_domain::error::Result;
use lq_domain::trace::TraceEvent;
use lq_domain::LeadPath;

use crate::mirror::SessionMirror;
use crate::session::SessionData;

pub const SESSION_PREFIX: &str = "session:";
pub const DEDUP_PREFIX: &str = "dedup:";

pub fn session_key(user_id: &str) -> String {
    format!("{SESSION_PREFIX}{user_id}")
}

fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(&digest[..8])
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct SessionStore {
    cache: Arc<Cache>,
    mirror: Option<Arc<dyn SessionMirror>>,
    config: SessionsConfig,
}

impl SessionStore {
    pub fn new(cache: Arc<Cache>, config: SessionsConfig) -> Self {
        Self {
            cache,
            mirror: None,
            config,
        }
    }

    pub fn with_mirror(mut self, mirror: Arc<dyn SessionMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn config(&self) -> &SessionsConfig {
        &self.config
    }

    // ── read ───────────────────────────────────────────────────────

    /// Read-through lookup: cache, then the relational mirror, then a fresh
    /// memory-only session. Never fails.
    pub async fn get_session(&self, user_id: &str) -> SessionData {
        match self.load(user_id).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(
                    user_id,
                    stage = "get_session",
                    error = %e,
                    "failed to load session, using temporary session"
                );
                SessionData::temporary(user_id, Utc::now())
            }
        }
    }

    async fn load(&self, user_id: &str) -> Result<SessionData> {
        if let Some(raw) = self.cache.get(&session_key(user_id)).await {
            return Ok(serde_json::from_str(&raw)?);
        }

        if let Some(mirror) = &self.mirror {
            match mirror.load_or_create(user_id).await {
                Ok((session, created)) => {
                    self.save(&session).await;
                    TraceEvent::SessionCreated {
                        user_id: user_id.to_owned(),
                        lead_id: session.lead_id.clone(),
                        source: (if created { "mirror_new" } else { "mirror_rehydrated" }).into(),
                    }
                    .emit();
                    return Ok(session);
                }
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        stage = "mirror_load",
                        error = %e,
                        "relational store unavailable, using memory-only session"
                    );
                }
            }
        }

        let session = SessionData::local(user_id, Utc::now());
        self.save(&session).await;
        TraceEvent::SessionCreated {
            user_id: user_id.to_owned(),
            lead_id: session.lead_id.clone(),
            source: "memory".into(),
        }
        .emit();
        Ok(session)
    }

    // ── write ──────────────────────────────────────────────────────

    /// Write `session` to the cache with the session TTL.
    pub async fn save(&self, session: &SessionData) {
        match serde_json::to_string(session) {
            Ok(json) => {
                self.cache
                    .set(&session_key(&session.external_user_id), &json, Some(self.config.ttl_secs()))
                    .await
            }
            Err(e) => tracing::error!(
                user_id = %session.external_user_id,
                stage = "save",
                error = %e,
                "failed to serialize session"
            ),
        }
    }

    /// Append one exchange to the user's session and persist it.
    ///
    /// Returns the stored session. The relational copy is refreshed in the
    /// background; its failure never reaches the caller.
    pub async fn update_session(
        &self,
        user_id: &str,
        user_text: &str,
        bot_text: &str,
        detected: Option<LeadPath>,
    ) -> SessionData {
        let mut session = self.get_session(user_id).await;
        session.record_turn(user_text, bot_text, detected, self.config.history_limit, Utc::now());
        self.save(&session).await;

        TraceEvent::SessionUpdated {
            user_id: user_id.to_owned(),
            path: session.current_path.map(|p| p.to_string()),
            messages: session.messages.len(),
        }
        .emit();

        self.spawn_sync(&session);
        session
    }

    fn spawn_sync(&self, session: &SessionData) {
        let Some(mirror) = self.mirror.clone() else { return };
        if !session.is_mirrored() {
            return;
        }
        let snapshot = session.clone();
        tokio::spawn(async move {
            if let Err(e) = mirror.sync(&snapshot).await {
                tracing::debug!(
                    user_id = %snapshot.external_user_id,
                    stage = "mirror_sync",
                    error = %e,
                    "session sync failed"
                );
            }
        });
    }

    /// Flag the session as handed to the extractor. A session that already
    /// expired from the cache is left alone.
    pub async fn mark_as_processed(&self, user_id: &str) {
        let Some(mut session) = self.peek(user_id).await else {
            tracing::debug!(user_id, "session expired before it could be marked processed");
            return;
        };
        session.is_processed = true;
        self.save(&session).await;
        self.spawn_sync(&session);
    }

    /// Cached session for `user_id` without creating or rehydrating one.
    pub async fn peek(&self, user_id: &str) -> Option<SessionData> {
        let raw = self.cache.get(&session_key(user_id)).await?;
        match serde_json::from_str::<SessionData>(&raw) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!(user_id, stage = "peek", error = %e, "unreadable cached session");
                None
            }
        }
    }

    // ── dedup ──────────────────────────────────────────────────────

    /// Whether this delivery was already seen.
    ///
    /// Checks `dedup:<messageId>` and then, when both `user_id` and `content`
    /// are given, `dedup:content:<userId>:<hash>`. Markers that were absent
    /// are planted, so an immediate repeat returns `true`.
    pub async fn is_duplicate(
        &self,
        message_id: Option<&str>,
        user_id: Option<&str>,
        content: Option<&str>,
    ) -> bool {
        if let Some(id) = message_id.filter(|id| !id.is_empty()) {
            let key = format!("{DEDUP_PREFIX}{id}");
            if self.cache.exists(&key).await {
                return true;
            }
            self.cache.set(&key, "1", Some(self.config.dedup_ttl_secs)).await;
        }

        if let (Some(user), Some(text)) = (user_id, content.filter(|c| !c.is_empty())) {
            let key = format!("{DEDUP_PREFIX}content:{user}:{}", content_hash(text));
            if self.cache.exists(&key).await {
                return true;
            }
            self.cache.set(&key, "1", Some(self.config.content_dedup_ttl_secs)).await;
        }

        false
    }

    // ── inactivity ─────────────────────────────────────────────────

    /// Sessions idle longer than `inactivity_minutes` and not yet processed.
    pub async fn get_inactive_sessions(&self) -> Vec<SessionData> {
        self.inactive_sessions_at(Utc::now()).await
    }

    pub async fn inactive_sessions_at(&self, now: DateTime<Utc>) -> Vec<SessionData> {
        let cutoff = now - Duration::minutes(self.config.inactivity_minutes);
        let mut inactive = Vec::new();

        for key in self.cache.scan(&format!("{SESSION_PREFIX}*")).await {
            let Some(raw) = self.cache.get(&key).await else { continue };
            match serde_json::from_str::<SessionData>(&raw) {
                Ok(session) if session.is_inactive(cutoff) => inactive.push(session),
                Ok(_) => {}
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping unreadable session"),
            }
        }

        inactive
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
