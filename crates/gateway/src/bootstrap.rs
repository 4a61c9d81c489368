//! AppState construction and background-task spawning.
//!
//! `serve`, `process-sessions` and `chat` share [`build_app_state`] so every
//! command runs the same pipeline; only `serve` spawns the periodic tasks.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sha2::{Digest, Sha256};

use lq_cache::{Cache, MemoryStore};
use lq_crm::{LeadStore, MemoryLeadStore, PgLeadStore};
use lq_domain::config::{Config, ConfigSeverity};
use lq_providers::ProviderRegistry;
use lq_sessions::{SessionMirror, SessionStore};

use crate::runtime::responder::Responder;
use crate::runtime::sweeper::process_inactive_sessions;
use crate::runtime::turn_lock::TurnLockMap;
use crate::state::AppState;

/// Validate config, connect every backend and return a fully-wired
/// [`AppState`]. Unreachable Redis or Postgres degrade to memory.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let error_count = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if error_count > 0 {
        anyhow::bail!("config validation failed with {error_count} error(s)");
    }

    // ── Cache ────────────────────────────────────────────────────────
    let cache = Arc::new(Cache::connect(&config.cache, Arc::new(MemoryStore::new())).await);
    tracing::info!(mode = cache.mode().as_str(), "cache ready");

    // ── Lead store + session mirror ──────────────────────────────────
    let (leads, mirror): (Arc<dyn LeadStore>, Option<Arc<dyn SessionMirror>>) =
        if config.crm_enabled() {
            match PgLeadStore::connect(&config.crm).await {
                Ok(pg) => {
                    let pg = Arc::new(pg);
                    tracing::info!("postgres lead store ready");
                    (pg.clone(), Some(pg))
                }
                Err(e) => {
                    tracing::error!(error = %e, "postgres unavailable, falling back to in-memory leads");
                    (Arc::new(MemoryLeadStore::new()), None)
                }
            }
        } else {
            tracing::info!("no database configured, using in-memory leads");
            (Arc::new(MemoryLeadStore::new()), None)
        };

    // ── LLM providers ────────────────────────────────────────────────
    let llm = Arc::new(ProviderRegistry::from_config(&config.llm));
    tracing::info!(providers = ?llm.list_providers(), "LLM provider registry ready");

    assemble(config, cache, leads, mirror, llm)
}

/// Wire already-built backends into an [`AppState`].
pub fn assemble(
    config: Arc<Config>,
    cache: Arc<Cache>,
    leads: Arc<dyn LeadStore>,
    mirror: Option<Arc<dyn SessionMirror>>,
    llm: Arc<ProviderRegistry>,
) -> anyhow::Result<AppState> {
    // ── Session store ────────────────────────────────────────────────
    let mut sessions = SessionStore::new(cache.clone(), config.sessions.clone());
    if let Some(mirror) = mirror {
        sessions = sessions.with_mirror(mirror);
    }
    tracing::info!(
        history_limit = config.sessions.history_limit,
        ttl_hours = config.sessions.ttl_hours,
        "session store ready"
    );

    // ── Responder (patterns compiled once) ───────────────────────────
    let responder = Arc::new(Responder::new(&config).context("compiling responder patterns")?);

    // ── Webhook secret (hash for constant-time comparison) ───────────
    let webhook_secret_hash = config
        .server
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| Sha256::digest(s.as_bytes()).to_vec());

    Ok(AppState {
        config,
        cache,
        llm,
        sessions: Arc::new(sessions),
        leads,
        responder,
        turn_locks: Arc::new(TurnLockMap::new()),
        webhook_secret_hash,
    })
}

/// Spawn the long-running background tasks: memory cache purge, turn-lock
/// pruning and the inactivity sweep.
pub fn spawn_background_tasks(state: &AppState) {
    // ── Memory purge + turn lock pruning ─────────────────────────────
    {
        let memory = state.cache.memory().clone();
        let turn_locks = state.turn_locks.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let purged = memory.purge_expired();
                let pruned = turn_locks.prune_idle();
                if purged > 0 || pruned > 0 {
                    tracing::debug!(purged, pruned, "memory housekeeping");
                }
            }
        });
    }

    // ── Inactivity sweep ─────────────────────────────────────────────
    if state.config.scheduler.enabled {
        let sweep_state = state.clone();
        tokio::spawn(async move {
            let scheduler = &sweep_state.config.scheduler;
            tokio::time::sleep(Duration::from_secs(scheduler.startup_delay_secs)).await;
            let mut interval = tokio::time::interval(Duration::from_secs(scheduler.interval_secs));
            loop {
                interval.tick().await;
                let report = process_inactive_sessions(&sweep_state).await;
                if report.inactive > 0 {
                    tracing::info!(
                        inactive = report.inactive,
                        extracted = report.extracted,
                        failed = report.failed,
                        "inactivity sweep finished"
                    );
                }
            }
        });
        tracing::info!(
            interval_secs = state.config.scheduler.interval_secs,
            "inactivity scheduler started"
        );
    } else {
        tracing::info!("inactivity scheduler disabled");
    }

    tracing::info!("background tasks spawned");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{registry_with, ScriptedLlm};
    use chrono::Utc;
    use lq_sessions::SessionData;

    #[tokio::test]
    async fn background_sweep_processes_idle_sessions() {
        let mut config = Config::default();
        config.scheduler.startup_delay_secs = 0;
        config.scheduler.interval_secs = 1;

        let llm = ScriptedLlm::new([r#"{"name":"Sara","path":"Path A"}"#]);
        let leads = Arc::new(MemoryLeadStore::new());
        let state = assemble(
            Arc::new(config),
            Arc::new(Cache::memory_only(Arc::new(MemoryStore::new()))),
            leads.clone() as Arc<dyn LeadStore>,
            None,
            Arc::new(registry_with(llm)),
        )
        .unwrap();

        let at = Utc::now() - chrono::Duration::minutes(30);
        let mut session = SessionData::local("idle", at);
        session.record_turn("I'm Sara", "Welcome!", None, 12, at);
        state.sessions.save(&session).await;

        spawn_background_tasks(&state);

        let processed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if state.sessions.peek("idle").await.is_some_and(|s| s.is_processed) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await;

        assert!(processed.is_ok(), "sweep did not run");
        assert_eq!(leads.get("idle").unwrap().name.as_deref(), Some("Sara"));
    }
}
