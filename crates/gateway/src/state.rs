use std::sync::Arc;

use lq_cache::Cache;
use lq_crm::LeadStore;
use lq_domain::config::Config;
use lq_providers::ProviderRegistry;
use lq_sessions::SessionStore;

use crate::runtime::responder::Responder;
use crate::runtime::turn_lock::TurnLockMap;

/// Shared application state passed to handlers, the sweeper and the CLI.
///
/// Fields are grouped by concern:
/// - **Core services**: config, cache, LLM providers
/// - **Conversation**: sessions, lead store, responder, turn locks
/// - **Security**: webhook secret hash
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub cache: Arc<Cache>,
    pub llm: Arc<ProviderRegistry>,

    // ── Conversation ──────────────────────────────────────────────────
    pub sessions: Arc<SessionStore>,
    /// Postgres when configured, otherwise process memory.
    pub leads: Arc<dyn LeadStore>,
    /// Compiled filters, heuristics and sanitizer.
    pub responder: Arc<Responder>,
    pub turn_locks: Arc<TurnLockMap>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of `server.webhook_secret`.
    /// `None` = no shared-secret check on the webhook.
    pub webhook_secret_hash: Option<Vec<u8>>,
}
