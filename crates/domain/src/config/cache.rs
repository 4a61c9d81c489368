use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// KeyValue cache
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL. `None` runs the cache in memory-only mode.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Reconnect attempts before the external store is considered down.
    #[serde(default = "d_3")]
    pub max_retries: u32,
    /// Connect timeout for the initial Redis handshake.
    #[serde(default = "d_5000")]
    pub connect_timeout_ms: u64,
    /// TTL applied to memory entries written without an explicit TTL.
    #[serde(default = "d_86400")]
    pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            max_retries: d_3(),
            connect_timeout_ms: d_5000(),
            default_ttl_secs: d_86400(),
        }
    }
}

impl CacheConfig {
    /// The Redis URL, ignoring blank values.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

fn d_3() -> u32 {
    3
}
fn d_5000() -> u64 {
    5_000
}
fn d_86400() -> u64 {
    86_400
}
