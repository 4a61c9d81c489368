//! Inactivity sweep: idle, unprocessed sessions → extractor → CRM.
//!
//! Each session is handled under its turn lock and re-read first, so a
//! message that arrived after selection keeps the session in the live set.

use std::time::Instant;

use lq_domain::trace::TraceEvent;
use lq_sessions::SessionData;

use crate::runtime::extractor::{extract_data, save_to_database};
use crate::state::AppState;

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions selected as inactive.
    pub inactive: usize,
    /// Records written to the CRM.
    pub extracted: usize,
    /// Saves that failed; those sessions stay unprocessed for the next tick.
    pub failed: usize,
}

enum Outcome {
    Saved,
    Empty,
    SaveFailed,
    Skipped,
}

/// Run one sweep over all inactive sessions, sequentially.
pub async fn process_inactive_sessions(state: &AppState) -> SweepReport {
    let started = Instant::now();
    let inactive = state.sessions.get_inactive_sessions().await;
    let mut report = SweepReport {
        inactive: inactive.len(),
        ..SweepReport::default()
    };

    if !inactive.is_empty() {
        tracing::info!(count = inactive.len(), "processing inactive sessions");
    }

    for session in inactive {
        match process_one(state, &session).await {
            Outcome::Saved => report.extracted += 1,
            Outcome::SaveFailed => report.failed += 1,
            Outcome::Empty | Outcome::Skipped => {}
        }
    }

    TraceEvent::SweepCompleted {
        inactive: report.inactive,
        extracted: report.extracted,
        failed: report.failed,
        duration_ms: started.elapsed().as_millis() as u64,
    }
    .emit();
    report
}

async fn process_one(state: &AppState, selected: &SessionData) -> Outcome {
    let user_id = selected.external_user_id.as_str();
    let _permit = match state.turn_locks.acquire(user_id).await {
        Ok(permit) => Some(permit),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "turn lock unavailable, sweeping unserialized");
            None
        }
    };

    // A turn may have landed between selection and locking.
    let current = match state.sessions.peek(user_id).await {
        Some(s) if !s.is_processed && s.last_activity == selected.last_activity => s,
        _ => {
            tracing::debug!(user_id, "session changed since selection, skipping");
            return Outcome::Skipped;
        }
    };

    let outcome = match extract_data(&state.llm, &state.config.brand, &current).await {
        Some(data) => match save_to_database(state.leads.as_ref(), user_id, &data).await {
            Ok(()) => Outcome::Saved,
            Err(e) => {
                tracing::error!(user_id, stage = "save_extracted", error = %e, "failed to save extracted data");
                return Outcome::SaveFailed;
            }
        },
        None => Outcome::Empty,
    };

    state.sessions.mark_as_processed(user_id).await;
    tracing::info!(user_id, "session processed");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{memory_state, registry_with, ScriptedLlm};
    use chrono::{Duration, Utc};
    use lq_cache::{Cache, MemoryStore};
    use lq_crm::{ExtractedData, LeadContext, LeadStore, MemoryLeadStore};
    use lq_domain::config::Config;
    use lq_domain::error::{Error, Result};
    use lq_domain::LeadPath;
    use std::sync::Arc;

    /// Memory store whose upsert fails for one user.
    struct RejectingLeads {
        inner: MemoryLeadStore,
        reject: &'static str,
    }

    #[async_trait::async_trait]
    impl LeadStore for RejectingLeads {
        async fn lead_context(&self, user_id: &str) -> Result<Option<LeadContext>> {
            self.inner.lead_context(user_id).await
        }

        async fn upsert_extracted(&self, user_id: &str, data: &ExtractedData) -> Result<()> {
            if user_id == self.reject {
                return Err(Error::Database("connection reset".into()));
            }
            self.inner.upsert_extracted(user_id, data).await
        }

        async fn update_contact(&self, user_id: &str, name: Option<&str>, phone: Option<&str>) -> Result<()> {
            self.inner.update_contact(user_id, name, phone).await
        }

        async fn update_intents(&self, user_id: &str, ready_to_pay: bool, wants_call: bool) -> Result<()> {
            self.inner.update_intents(user_id, ready_to_pay, wants_call).await
        }

        async fn log_compliance_query(&self, user_id: &str, query: &str, topic: &str) -> Result<()> {
            self.inner.log_compliance_query(user_id, query, topic).await
        }

        fn name(&self) -> &str {
            "rejecting"
        }
    }

    async fn seed(state: &AppState, user: &str, idle_minutes: i64, processed: bool) {
        let at = Utc::now() - Duration::minutes(idle_minutes);
        let mut s = SessionData::local(user, at);
        s.record_turn("I'm Sara from Pune", "Welcome Sara!", Some(LeadPath::A), 12, at);
        s.is_processed = processed;
        state.sessions.save(&s).await;
    }

    #[tokio::test]
    async fn idle_sessions_are_extracted_once() {
        let llm = ScriptedLlm::new([r#"{"name":"Sara","location":"Pune","path":"Path A","bot_score":40}"#]);
        let (state, leads) = memory_state(llm.clone());
        seed(&state, "idle", 20, false).await;
        seed(&state, "fresh", 5, false).await;
        seed(&state, "done", 20, true).await;

        let report = process_inactive_sessions(&state).await;
        assert_eq!(report, SweepReport { inactive: 1, extracted: 1, failed: 0 });
        assert_eq!(llm.calls(), 1);

        let lead = leads.get("idle").unwrap();
        assert_eq!(lead.name.as_deref(), Some("Sara"));
        assert!(state.sessions.peek("idle").await.unwrap().is_processed);
        assert!(leads.get("fresh").is_none());

        let again = process_inactive_sessions(&state).await;
        assert_eq!(again.inactive, 0);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn failed_extraction_still_marks_processed() {
        let llm = ScriptedLlm::new(["definitely not json"]);
        let (state, leads) = memory_state(llm);
        seed(&state, "u1", 30, false).await;

        let report = process_inactive_sessions(&state).await;
        assert_eq!(report, SweepReport { inactive: 1, extracted: 0, failed: 0 });
        assert!(state.sessions.peek("u1").await.unwrap().is_processed);
        assert!(leads.is_empty());
    }

    #[tokio::test]
    async fn new_message_after_selection_is_left_alone() {
        let llm = ScriptedLlm::new(["{}"]);
        let (state, _) = memory_state(llm.clone());
        seed(&state, "u1", 30, false).await;

        let selected = state.sessions.get_inactive_sessions().await.remove(0);
        state.sessions.update_session("u1", "one more thing", "sure", None).await;

        assert!(matches!(process_one(&state, &selected).await, Outcome::Skipped));
        assert_eq!(llm.calls(), 0);
        assert!(!state.sessions.peek("u1").await.unwrap().is_processed);
    }

    #[tokio::test]
    async fn failed_save_is_retried_and_does_not_stop_the_sweep() {
        let llm = ScriptedLlm::new([r#"{"name":"Sara","path":"Path A"}"#]);
        let leads = Arc::new(RejectingLeads {
            inner: MemoryLeadStore::new(),
            reject: "a",
        });
        let state = crate::bootstrap::assemble(
            Arc::new(Config::default()),
            Arc::new(Cache::memory_only(Arc::new(MemoryStore::new()))),
            leads.clone() as Arc<dyn LeadStore>,
            None,
            Arc::new(registry_with(llm.clone())),
        )
        .unwrap();
        for user in ["a", "b", "c"] {
            seed(&state, user, 30, false).await;
        }

        let report = process_inactive_sessions(&state).await;
        assert_eq!(report, SweepReport { inactive: 3, extracted: 2, failed: 1 });
        assert_eq!(llm.calls(), 3);

        assert!(!state.sessions.peek("a").await.unwrap().is_processed);
        assert!(state.sessions.peek("b").await.unwrap().is_processed);
        assert!(state.sessions.peek("c").await.unwrap().is_processed);
        assert!(leads.inner.get("a").is_none());
        assert!(leads.inner.get("b").is_some());

        let retry = process_inactive_sessions(&state).await;
        assert_eq!(retry, SweepReport { inactive: 1, extracted: 0, failed: 1 });
    }
}
