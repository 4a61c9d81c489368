use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "d_60000u")]
    pub default_timeout_ms: u64,
    /// Registered LLM providers (data-driven: adding a provider = adding config).
    #[serde(default = "d_providers")]
    pub providers: Vec<ProviderConfig>,
    /// Conversational reply generation.
    #[serde(default = "d_responder")]
    pub responder: RoleConfig,
    /// JSON lead-record extraction.
    #[serde(default = "d_extractor")]
    pub extractor: RoleConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: d_60000u(),
            providers: d_providers(),
            responder: d_responder(),
            extractor: d_extractor(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleConfig {
    /// Format: "provider_id/model_name"
    pub model: String,
    #[serde(default = "d_temperature")]
    pub temperature: f32,
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
}

impl RoleConfig {
    /// Provider id part of `model` (everything before the first `/`).
    pub fn provider_id(&self) -> &str {
        self.model.split('/').next().unwrap_or(&self.model)
    }

    /// Model name part of `model`. Falls back to the whole string when there is
    /// no provider prefix.
    pub fn model_name(&self) -> &str {
        self.model
            .split_once('/')
            .map(|(_, m)| m)
            .unwrap_or(&self.model)
    }

    /// Replace the model, keeping the provider prefix unless `model` has one.
    pub fn set_model(&mut self, model: &str) {
        self.model = if model.contains('/') {
            model.to_string()
        } else {
            format!("{}/{}", self.provider_id(), model)
        };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenaiCompat,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Header name (e.g. "Authorization", "x-goog-api-key").
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (e.g. "Bearer ").
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
}

// ── serde default helpers ───────────────────────────────────────────

fn d_60000u() -> u64 {
    60_000
}
fn d_temperature() -> f32 {
    0.7
}
fn d_max_tokens() -> u32 {
    1500
}
fn d_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig {
        id: "openai".into(),
        kind: ProviderKind::OpenaiCompat,
        base_url: "https://api.openai.com/v1".into(),
        auth: AuthConfig {
            env: Some("OPENAI_API_KEY".into()),
            ..Default::default()
        },
        default_model: Some("gpt-4o-mini".into()),
    }]
}
fn d_responder() -> RoleConfig {
    RoleConfig {
        model: "openai/gpt-4o-mini".into(),
        temperature: 0.7,
        max_tokens: 1500,
    }
}
fn d_extractor() -> RoleConfig {
    RoleConfig {
        model: "openai/gpt-4o-mini".into(),
        temperature: 0.2,
        max_tokens: 1000,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
