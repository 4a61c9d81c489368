//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves authentication (env vars, direct
//! keys), and instantiates the appropriate adapter for each configured provider.

use crate::google::GoogleProvider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use lq_domain::config::{LlmConfig, ProviderKind, RoleConfig};
use std::collections::HashMap;
use std::sync::Arc;

pub const ROLE_RESPONDER: &str = "responder";
pub const ROLE_EXTRACTOR: &str = "extractor";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM providers and role assignments.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    roles: HashMap<String, RoleConfig>,
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`].
    ///
    /// Providers that fail to initialize (typically a missing API key) are
    /// logged and skipped rather than aborting startup; calls for their roles
    /// then fail and degrade to the canned replies.
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();

        for pc in &config.providers {
            let result = match pc.kind {
                ProviderKind::OpenaiCompat => {
                    OpenAiCompatProvider::from_config(pc, config.default_timeout_ms)
                        .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
                ProviderKind::Google => GoogleProvider::from_config(pc, config.default_timeout_ms)
                    .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            };

            match result {
                Ok(provider) => {
                    tracing::info!(provider_id = %pc.id, kind = ?pc.kind, "registered LLM provider");
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider_id = %pc.id,
                        kind = ?pc.kind,
                        error = %e,
                        "failed to initialize LLM provider, skipping"
                    );
                }
            }
        }

        if providers.is_empty() {
            tracing::warn!(
                "no LLM providers initialized; replies will fall back to the \
                 canned support message until auth is configured"
            );
        }

        let roles = HashMap::from([
            (ROLE_RESPONDER.to_string(), config.responder.clone()),
            (ROLE_EXTRACTOR.to_string(), config.extractor.clone()),
        ]);

        Self { providers, roles }
    }

    /// Registry with explicit providers (used by tests and the local REPL).
    pub fn from_parts(
        providers: HashMap<String, Arc<dyn LlmProvider>>,
        responder: RoleConfig,
        extractor: RoleConfig,
    ) -> Self {
        let roles = HashMap::from([
            (ROLE_RESPONDER.to_string(), responder),
            (ROLE_EXTRACTOR.to_string(), extractor),
        ]);
        Self { providers, roles }
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Get the provider assigned to a role. The role's model is
    /// "provider_id/model_name"; the first segment selects the provider.
    pub fn for_role(&self, role: &str) -> Option<Arc<dyn LlmProvider>> {
        let cfg = self.roles.get(role)?;
        self.providers.get(cfg.provider_id()).cloned()
    }

    /// Sampling settings for a role.
    pub fn role(&self, role: &str) -> Option<&RoleConfig> {
        self.roles.get(role)
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// List all registered provider IDs (sorted).
    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }
}
