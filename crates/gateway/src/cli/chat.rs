//! `leadqual chat`: interactive REPL against the real pipeline.
//!
//! Runs fully in memory (no Redis, no database, no scheduler) so a
//! conversation can be tried locally with only an LLM key. Lines go through
//! the same turn handler the webhook uses.

use std::sync::Arc;

use lq_domain::config::Config;
use lq_sessions::store::session_key;

use crate::bootstrap;
use crate::runtime::extractor::extract_data;
use crate::runtime::turn::{handle_turn, InboundTurn, TurnOutcome};
use crate::state::AppState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Strip external backends from a config so the REPL never touches them.
pub fn memory_only(mut config: Config) -> Config {
    config.cache.redis_url = None;
    config.crm.database_url = None;
    config.scheduler.enabled = false;
    config
}

pub async fn chat(config: Config, user_id: String) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(Arc::new(memory_only(config))).await?;

    let mut rl = rustyline::DefaultEditor::new()?;

    eprintln!("leadqual interactive chat (in-memory)");
    eprintln!("User: {user_id}  |  Commands: debug, extract, clear, exit");
    eprintln!();

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                rl.add_history_entry(&line).ok();

                match trimmed.to_lowercase().as_str() {
                    "exit" | "quit" => break,
                    "debug" => show_session(&state, &user_id).await,
                    "extract" => run_extraction(&state, &user_id).await,
                    "clear" => {
                        state.cache.del(&session_key(&user_id)).await;
                        eprintln!("Session cleared.");
                    }
                    _ => send_message(&state, &user_id, trimmed).await,
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or exit to quit)");
                continue;
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Each typed line is a fresh delivery, so it carries its own message id
/// and never hits the content-hash dedup.
fn repl_turn(user_id: &str, text: &str) -> InboundTurn {
    InboundTurn {
        user_id: user_id.to_string(),
        message: text.to_string(),
        message_id: Some(format!("cli-{}", uuid::Uuid::new_v4())),
        ..InboundTurn::default()
    }
}

async fn send_message(state: &AppState, user_id: &str, text: &str) {
    match handle_turn(state, repl_turn(user_id, text)).await {
        TurnOutcome::Duplicate => eprintln!("(duplicate message ignored)"),
        TurnOutcome::Reply(reply) => {
            println!("bot> {}", reply.reply);
            if let Some(path) = reply.metadata.as_ref().and_then(|m| m.path.as_deref()) {
                eprintln!("\x1B[2m[path {path}]\x1B[0m");
            }
            if !reply.quick_replies.is_empty() {
                eprintln!("\x1B[2m[{}]\x1B[0m", reply.quick_replies.join(" | "));
            }
            println!();
        }
    }
}

async fn show_session(state: &AppState, user_id: &str) {
    let Some(session) = state.sessions.peek(user_id).await else {
        eprintln!("No session yet.");
        return;
    };
    eprintln!("lead_id:       {}", session.lead_id);
    eprintln!(
        "path:          {}",
        session.current_path.map(|p| p.label()).unwrap_or_else(|| "(none)".into())
    );
    eprintln!("messages:      {}", session.messages.len());
    eprintln!("last_activity: {}", session.last_activity.to_rfc3339());
    eprintln!("processed:     {}", session.is_processed);
    for m in &session.messages {
        eprintln!("  {:>9}: {}", m.role.as_str(), m.content);
    }
}

async fn run_extraction(state: &AppState, user_id: &str) {
    let Some(session) = state.sessions.peek(user_id).await else {
        eprintln!("No session yet.");
        return;
    };
    match extract_data(&state.llm, &state.config.brand, &session).await {
        Some(data) => match serde_json::to_string_pretty(&data) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("\x1B[31mserialize error: {e}\x1B[0m"),
        },
        None => eprintln!("Extraction produced nothing."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{memory_state, ScriptedLlm};

    #[test]
    fn memory_only_drops_backends_and_scheduler() {
        let mut config = Config::default();
        config.cache.redis_url = Some("redis://localhost".into());
        config.crm.database_url = Some("postgres://localhost/leads".into());

        let config = memory_only(config);
        assert!(config.cache.redis_url.is_none());
        assert!(!config.crm_enabled());
        assert!(!config.scheduler.enabled);
    }

    #[tokio::test]
    async fn repeated_lines_are_each_answered() {
        let llm = ScriptedLlm::new(["Sure! [PATH: E]"]);
        let (state, _) = memory_state(llm.clone());

        let first = repl_turn("cli-user", "yes");
        let second = repl_turn("cli-user", "yes");
        assert_ne!(first.message_id, second.message_id);

        assert!(matches!(handle_turn(&state, first).await, TurnOutcome::Reply(_)));
        assert!(matches!(handle_turn(&state, second).await, TurnOutcome::Reply(_)));
        assert_eq!(llm.calls(), 2);
    }
}
