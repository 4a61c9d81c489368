//! Responder: filter → context → prompt → LLM → sanitize → intents.
//!
//! The LLM decides the next path by ending its reply with `[PATH: X]`. The
//! responder only reads that marker back; a reply without one leaves the
//! session's path where it was.

use std::time::Instant;

use lq_crm::LeadStore;
use lq_domain::chat::{ChatMessage, Role};
use lq_domain::config::{BrandConfig, Config};
use lq_domain::error::{Error, Result};
use lq_domain::trace::TraceEvent;
use lq_domain::LeadPath;
use lq_prompts::{build_system_prompt, UserMemory};
use lq_providers::registry::ROLE_RESPONDER;
use lq_providers::{ChatRequest, ProviderRegistry};
use lq_sessions::SessionData;
use regex::Regex;

use crate::runtime::context::{ContextHeuristics, KnownUser};
use crate::runtime::filters::{IntentFilter, Intents};

/// Outcome of one responder call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponderResult {
    pub reply: String,
    pub detected_path: Option<LeadPath>,
    pub intents: Intents,
}

/// Output clean-up applied to every LLM reply.
pub struct Sanitizer {
    path_marker: Regex,
    control_markers: Regex,
    staff_names: Vec<Regex>,
    prefixed_phone: Regex,
    long_digits: Regex,
    official_contact: String,
    official_digits: String,
}

impl Sanitizer {
    pub fn new(brand: &BrandConfig) -> std::result::Result<Self, regex::Error> {
        let staff_names = brand
            .staff_names
            .iter()
            .filter(|n| !n.trim().is_empty())
            .map(|n| Regex::new(&format!(r"(?i)\b{}\b", regex::escape(n.trim()))))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            path_marker: Regex::new(r"(?i)\[PATH:\s*([A-E])\]")?,
            control_markers: Regex::new(r"(?i)\[SWITCH:\s*PATH_[A-E]\]")?,
            staff_names,
            prefixed_phone: Regex::new(r"\+91\s*[0-9]{10}")?,
            long_digits: Regex::new(r"[0-9]{10,}")?,
            official_contact: brand.official_contact.clone(),
            official_digits: brand.official_local_digits(),
        })
    }

    /// Letter from the first `[PATH: X]` marker.
    pub fn detect_path(&self, raw: &str) -> Option<LeadPath> {
        let caps = self.path_marker.captures(raw)?;
        caps.get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(LeadPath::from_letter)
    }

    /// Drop internal markers, mask staff names and force every phone-shaped
    /// number to the official contact.
    pub fn clean(&self, raw: &str) -> String {
        let reply = self.path_marker.replace_all(raw, "");
        let reply = self.control_markers.replace_all(reply.trim(), "");
        let mut reply = reply.trim().to_string();

        for name in &self.staff_names {
            reply = name.replace_all(&reply, "our team").into_owned();
        }

        let reply = self
            .prefixed_phone
            .replace_all(&reply, regex::NoExpand(&self.official_contact))
            .into_owned();
        self.long_digits
            .replace_all(&reply, |caps: &regex::Captures| {
                let digits = &caps[0];
                if digits == self.official_digits {
                    digits.to_string()
                } else {
                    self.official_contact.clone()
                }
            })
            .into_owned()
    }
}

/// Compiled patterns and sampling settings for reply generation.
pub struct Responder {
    filter: IntentFilter,
    heuristics: ContextHeuristics,
    sanitizer: Sanitizer,
    context_window: usize,
    error_reply: String,
}

impl Responder {
    pub fn new(config: &Config) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            filter: IntentFilter::new()?,
            heuristics: ContextHeuristics::new()?,
            sanitizer: Sanitizer::new(&config.brand)?,
            context_window: config.sessions.context_window,
            error_reply: format!(
                "I apologize, I'm experiencing a brief delay. Please try again, or reach out to \
                 our team at {} for immediate assistance.",
                config.brand.official_contact
            ),
        })
    }

    pub fn filter(&self) -> &IntentFilter {
        &self.filter
    }

    pub fn heuristics(&self) -> &ContextHeuristics {
        &self.heuristics
    }

    /// Produce the bot's reply to `user_message`. Never fails: any error
    /// after the safety filter becomes the fixed apology.
    pub async fn generate_response(
        &self,
        llm: &ProviderRegistry,
        leads: &dyn LeadStore,
        user_message: &str,
        session: &SessionData,
    ) -> ResponderResult {
        if let Some(category) = self.filter.check_banned(user_message) {
            TraceEvent::ComplianceRefusal {
                user_id: session.external_user_id.clone(),
                category: category.as_str().into(),
            }
            .emit();
            return ResponderResult {
                reply: category.reply().to_string(),
                detected_path: session.current_path,
                intents: Intents {
                    compliance_risk: true,
                    ..Intents::default()
                },
            };
        }

        match self.respond(llm, leads, user_message, session).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    user_id = %session.external_user_id,
                    stage = "responder",
                    error = %e,
                    "reply generation failed, sending fallback"
                );
                ResponderResult {
                    reply: self.error_reply.clone(),
                    detected_path: session.current_path,
                    intents: Intents::default(),
                }
            }
        }
    }

    async fn respond(
        &self,
        llm: &ProviderRegistry,
        leads: &dyn LeadStore,
        user_message: &str,
        session: &SessionData,
    ) -> Result<ResponderResult> {
        let persisted = match leads.lead_context(&session.external_user_id).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::debug!(
                    user_id = %session.external_user_id,
                    stage = "lead_context",
                    error = %e,
                    "lead lookup failed, continuing without it"
                );
                None
            }
        };

        let fresh = self.heuristics.extract_user_info(&session.messages);
        let known = KnownUser::merge(fresh, persisted);
        let memory = UserMemory {
            conversation_summary: self.heuristics.context_line(&session.messages, &known),
            name: known.name,
            budget: known.budget,
            location: known.location,
        };
        let system_prompt = build_system_prompt(session.current_path, &memory, user_message);

        let mut messages = Vec::with_capacity(self.context_window + 2);
        messages.push(ChatMessage::system(system_prompt));
        for m in session.recent(self.context_window) {
            messages.push(match m.role {
                Role::User => ChatMessage::user(m.content.clone()),
                _ => ChatMessage::assistant(m.content.clone()),
            });
        }
        messages.push(ChatMessage::user(user_message));

        let provider = llm
            .for_role(ROLE_RESPONDER)
            .ok_or_else(|| Error::Config("no provider available for the responder role".into()))?;
        let role = llm
            .role(ROLE_RESPONDER)
            .ok_or_else(|| Error::Config("responder role is not configured".into()))?;
        let req = ChatRequest {
            messages,
            temperature: Some(role.temperature),
            max_tokens: Some(role.max_tokens),
            json_mode: false,
            model: Some(role.model_name().to_string()),
        };

        let started = Instant::now();
        let resp = provider.chat(&req).await?;
        TraceEvent::LlmRequest {
            provider: provider.provider_id().to_string(),
            model: resp.model.clone(),
            role: ROLE_RESPONDER.into(),
            duration_ms: started.elapsed().as_millis() as u64,
            prompt_tokens: resp.usage.map(|u| u.prompt_tokens),
            completion_tokens: resp.usage.map(|u| u.completion_tokens),
        }
        .emit();

        let detected_path = self.sanitizer.detect_path(&resp.content);
        let reply = self.sanitizer.clean(&resp.content);
        if reply.is_empty() {
            return Err(Error::Provider {
                provider: provider.provider_id().to_string(),
                message: "empty reply".into(),
            });
        }

        Ok(ResponderResult {
            reply,
            detected_path,
            intents: self.filter.detect_intents(user_message),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::testing::{registry_with, ScriptedLlm};
    use chrono::Utc;
    use lq_crm::{LeadStore, MemoryLeadStore};
    use std::sync::Arc;

    fn responder() -> Responder {
        Responder::new(&Config::default()).unwrap()
    }

    fn session() -> SessionData {
        let mut s = SessionData::local("u1", Utc::now());
        s.current_path = Some(LeadPath::C);
        s
    }

    #[test]
    fn path_marker_is_read_and_stripped() {
        let s = Sanitizer::new(&BrandConfig::default()).unwrap();
        let raw = "Great choice!\n[PATH: b]";
        assert_eq!(s.detect_path(raw), Some(LeadPath::B));
        assert_eq!(s.clean(raw), "Great choice!");
        assert_eq!(s.detect_path("no marker"), None);
        assert_eq!(s.detect_path("[PATH: F]"), None);
    }

    #[test]
    fn switch_markers_are_stripped() {
        let s = Sanitizer::new(&BrandConfig::default()).unwrap();
        assert_eq!(s.clean("Sure. [SWITCH: PATH_C]\n[PATH: C]"), "Sure.");
    }

    #[test]
    fn staff_names_and_numbers_are_masked() {
        let s = Sanitizer::new(&BrandConfig::default()).unwrap();
        let out = s.clean("Ask Moiz or fatima, or call +91 9999999999 / 12345678901.");
        assert_eq!(
            out,
            "Ask our team or our team, or call +91 8828888664 / +91 8828888664."
        );
        assert_eq!(s.clean("Call +91 8828888664"), "Call +91 8828888664");
        assert_eq!(s.clean("Ahmedabad is fine"), "Ahmedabad is fine");
    }

    #[tokio::test]
    async fn banned_message_short_circuits_without_llm() {
        let llm = ScriptedLlm::new(["unused"]);
        let registry = registry_with(llm.clone());
        let leads = MemoryLeadStore::new();

        let out = responder()
            .generate_response(&registry, &leads, "can I get a first copy of this bag", &session())
            .await;

        assert!(out.reply.contains("replicas is illegal"));
        assert_eq!(out.detected_path, Some(LeadPath::C));
        assert!(out.intents.compliance_risk);
        assert!(!out.intents.ready_to_pay && !out.intents.wants_call);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn reply_and_path_come_from_llm() {
        let llm = ScriptedLlm::new(["Alhamdulillah! Here is the FBA course.\n[PATH: B]"]);
        let registry = registry_with(llm.clone());
        let leads = MemoryLeadStore::new();

        let out = responder()
            .generate_response(&registry, &leads, "I want to join FBA, call me", &session())
            .await;

        assert_eq!(out.reply, "Alhamdulillah! Here is the FBA course.");
        assert_eq!(out.detected_path, Some(LeadPath::B));
        assert!(out.intents.ready_to_pay);
        assert!(out.intents.wants_call);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn prompt_carries_history_window_and_persisted_context() {
        let llm = ScriptedLlm::new(["ok [PATH: C]"]);
        let registry = registry_with(llm.clone());
        let leads = MemoryLeadStore::new();
        leads.update_contact("u1", Some("Sara"), None).await.unwrap();

        let mut config = Config::default();
        config.sessions.context_window = 2;
        let responder = Responder::new(&config).unwrap();

        let mut s = session();
        for i in 0..3 {
            s.record_turn(&format!("q{i}"), &format!("a{i}"), None, 12, Utc::now());
        }
        responder.generate_response(&registry, &leads, "next", &s).await;

        let req = llm.last_request().unwrap();
        assert_eq!(req.messages.len(), 4);
        assert_eq!(req.messages[0].role, Role::System);
        assert!(req.messages[0].content.contains("Name: Sara"));
        assert!(req.messages[0].content.contains("Current Path: C"));
        assert_eq!(req.messages[1].content, "q2");
        assert_eq!(req.messages[2].content, "a2");
        assert_eq!(req.messages[3].content, "next");
        assert!(!req.json_mode);
    }

    #[tokio::test]
    async fn llm_failure_degrades_to_apology() {
        let llm = ScriptedLlm::failing();
        let registry = registry_with(llm.clone());
        let leads: Arc<dyn LeadStore> = Arc::new(MemoryLeadStore::new());

        let out = responder()
            .generate_response(&registry, leads.as_ref(), "I'm ready to pay", &session())
            .await;

        assert!(out.reply.starts_with("I apologize, I'm experiencing a brief delay."));
        assert!(out.reply.contains("+91 8828888664"));
        assert_eq!(out.detected_path, Some(LeadPath::C));
        assert_eq!(out.intents, Intents::default());
    }

    #[tokio::test]
    async fn missing_provider_degrades_to_apology() {
        let llm = lq_domain::config::LlmConfig::default();
        let registry =
            ProviderRegistry::from_parts(Default::default(), llm.responder, llm.extractor);
        let leads = MemoryLeadStore::new();
        let out = responder()
            .generate_response(&registry, &leads, "hello", &session())
            .await;
        assert!(out.reply.starts_with("I apologize"));
    }
}
