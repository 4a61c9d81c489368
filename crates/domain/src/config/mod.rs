mod brand;
mod cache;
mod crm;
mod llm;
mod scheduler;
mod server;
mod sessions;

pub use brand::*;
pub use cache::*;
pub use crm::*;
pub use llm::*;
pub use scheduler::*;
pub use server::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub brand: BrandConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

impl Config {
    /// Apply deployment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Vec<ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Blank values are ignored;
    /// unparseable numbers are reported and leave the field untouched.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Vec<ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut issues = Vec::new();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("REDIS_URL") {
            self.cache.redis_url = Some(url);
        }
        if let Some(url) = get("DATABASE_URL") {
            self.crm.database_url = Some(url);
        }
        if let Some(secret) = get("WEBHOOK_SECRET") {
            self.server.webhook_secret = Some(secret);
        }
        if let Some(model) = get("RESPONDER_MODEL") {
            self.llm.responder.set_model(&model);
        }
        if let Some(model) = get("EXTRACTOR_MODEL") {
            self.llm.extractor.set_model(&model);
        }

        parse_into(&get, "PORT", &mut self.server.port, &mut issues);
        parse_into(&get, "SESSION_TTL_HOURS", &mut self.sessions.ttl_hours, &mut issues);
        parse_into(&get, "INACTIVITY_MINUTES", &mut self.sessions.inactivity_minutes, &mut issues);
        parse_into(&get, "CHAT_HISTORY_LIMIT", &mut self.sessions.history_limit, &mut issues);
        parse_into(&get, "RESPONDER_MAX_TOKENS", &mut self.llm.responder.max_tokens, &mut issues);
        parse_into(&get, "EXTRACTOR_MAX_TOKENS", &mut self.llm.extractor.max_tokens, &mut issues);
        parse_into(&get, "RESPONDER_TEMPERATURE", &mut self.llm.responder.temperature, &mut issues);
        parse_into(&get, "EXTRACTOR_TEMPERATURE", &mut self.llm.extractor.temperature, &mut issues);

        issues
    }

    /// Whether the relational lead store should be used.
    pub fn crm_enabled(&self) -> bool {
        self.crm.is_configured()
    }
}

fn parse_into<T, G>(get: &G, key: &str, slot: &mut T, issues: &mut Vec<ConfigError>)
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else { return };
    match raw.parse::<T>() {
        Ok(v) => *slot = v,
        Err(_) => issues.push(ConfigError {
            severity: ConfigSeverity::Warning,
            field: key.into(),
            message: format!("ignoring unparseable value {raw:?}"),
        }),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: &str, message: &str| {
            errors.push(ConfigError {
                severity,
                field: field.into(),
                message: message.into(),
            })
        };

        if self.server.port == 0 {
            push(ConfigSeverity::Error, "server.port", "port must be greater than 0");
        }
        if self.server.host.is_empty() {
            push(ConfigSeverity::Error, "server.host", "host must not be empty");
        }
        if self.server.webhook_secret.is_none() {
            push(
                ConfigSeverity::Warning,
                "server.webhook_secret",
                "not set; webhook deliveries are accepted without authentication",
            );
        }

        if self.sessions.history_limit == 0 {
            push(ConfigSeverity::Error, "sessions.history_limit", "must be at least 1");
        }
        if self.sessions.context_window > self.sessions.history_limit {
            push(
                ConfigSeverity::Warning,
                "sessions.context_window",
                "larger than history_limit; only history_limit messages are ever available",
            );
        }
        if self.sessions.inactivity_minutes <= 0 {
            push(ConfigSeverity::Error, "sessions.inactivity_minutes", "must be positive");
        }
        if self.sessions.ttl_hours == 0 {
            push(ConfigSeverity::Error, "sessions.ttl_hours", "must be positive");
        }

        if self.scheduler.enabled && self.scheduler.interval_secs == 0 {
            push(ConfigSeverity::Error, "scheduler.interval_secs", "must be positive");
        }

        if self.llm.providers.is_empty() {
            push(ConfigSeverity::Warning, "llm.providers", "no LLM providers configured");
        }
        for (i, provider) in self.llm.providers.iter().enumerate() {
            if provider.id.is_empty() {
                push(
                    ConfigSeverity::Error,
                    &format!("llm.providers[{i}].id"),
                    "provider id must not be empty",
                );
            }
            if provider.base_url.is_empty() {
                push(
                    ConfigSeverity::Error,
                    &format!("llm.providers[{i}].base_url"),
                    "provider base_url must not be empty",
                );
            }
        }
        for (field, role) in [("llm.responder", &self.llm.responder), ("llm.extractor", &self.llm.extractor)] {
            if !self.llm.providers.iter().any(|p| p.id == role.provider_id()) {
                push(
                    ConfigSeverity::Warning,
                    &format!("{field}.model"),
                    &format!("provider '{}' is not configured", role.provider_id()),
                );
            }
            if !(0.0..=2.0).contains(&role.temperature) {
                push(ConfigSeverity::Error, &format!("{field}.temperature"), "must be within 0.0..=2.0");
            }
        }

        if !self.crm.is_configured() {
            push(
                ConfigSeverity::Warning,
                "crm.database_url",
                "not configured; leads are kept in memory only",
            );
        }
        if self.brand.official_contact.trim().is_empty() {
            push(ConfigSeverity::Error, "brand.official_contact", "must not be empty");
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn overrides_apply_known_keys() {
        let vars = env(&[
            ("PORT", "8080"),
            ("INACTIVITY_MINUTES", "30"),
            ("CHAT_HISTORY_LIMIT", "20"),
            ("RESPONDER_MODEL", "gpt-4o"),
            ("EXTRACTOR_TEMPERATURE", "0.1"),
            ("REDIS_URL", "redis://localhost:6379"),
        ]);
        let mut cfg = Config::default();
        let issues = cfg.apply_overrides_from(|k| vars.get(k).cloned());
        assert!(issues.is_empty());
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.sessions.inactivity_minutes, 30);
        assert_eq!(cfg.sessions.history_limit, 20);
        assert_eq!(cfg.llm.responder.model, "openai/gpt-4o");
        assert!((cfg.llm.extractor.temperature - 0.1).abs() < 1e-6);
        assert_eq!(cfg.cache.redis_url(), Some("redis://localhost:6379"));
    }

    #[test]
    fn bad_numbers_are_reported_and_ignored() {
        let vars = env(&[("PORT", "eighty"), ("SESSION_TTL_HOURS", "")]);
        let mut cfg = Config::default();
        let issues = cfg.apply_overrides_from(|k| vars.get(k).cloned());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "PORT");
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.sessions.ttl_hours, 24);
    }

    #[test]
    fn default_config_has_no_errors() {
        let issues = Config::default().validate();
        assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn zero_history_limit_is_an_error() {
        let mut cfg = Config::default();
        cfg.sessions.history_limit = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == "sessions.history_limit"));
    }

    #[test]
    fn unknown_role_provider_warns() {
        let mut cfg = Config::default();
        cfg.llm.extractor.model = "missing/model".into();
        let issues = cfg.validate();
        assert!(issues.iter().any(|i| i.field == "llm.extractor.model"));
    }
}
