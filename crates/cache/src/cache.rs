use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lq_domain::config::CacheConfig;
use lq_domain::trace::TraceEvent;

use crate::memory::MemoryStore;
use crate::redis_store::RedisStore;
use crate::store::ExternalStore;

/// Which backend currently serves reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Redis,
    Memory,
}

impl CacheMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheMode::Redis => "redis",
            CacheMode::Memory => "memory",
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache facade
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// get/set/del/exists/scan over the memory mirror plus an optional external
/// store. No operation ever fails: external errors trip the degraded flag and
/// the memory mirror answers instead.
pub struct Cache {
    memory: Arc<MemoryStore>,
    external: Option<Arc<dyn ExternalStore>>,
    degraded: AtomicBool,
    default_ttl: Duration,
}

impl Cache {
    pub fn memory_only(memory: Arc<MemoryStore>) -> Self {
        Self {
            memory,
            external: None,
            degraded: AtomicBool::new(false),
            default_ttl: Duration::from_secs(86_400),
        }
    }

    pub fn with_external(memory: Arc<MemoryStore>, external: Arc<dyn ExternalStore>) -> Self {
        Self {
            external: Some(external),
            ..Self::memory_only(memory)
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Build from config: connect to Redis when a URL is set, falling back to
    /// memory-only mode when the connection cannot be established.
    pub async fn connect(config: &CacheConfig, memory: Arc<MemoryStore>) -> Self {
        let ttl = Duration::from_secs(config.default_ttl_secs);
        let Some(url) = config.redis_url() else {
            tracing::info!("no redis url configured, cache running in memory mode");
            return Self::memory_only(memory).with_default_ttl(ttl);
        };

        match RedisStore::connect(url, config).await {
            Ok(store) => {
                tracing::info!("redis connected");
                Self::with_external(memory, Arc::new(store)).with_default_ttl(ttl)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, cache running in memory mode");
                let cache = Self::memory_only(memory).with_default_ttl(ttl);
                cache.degraded.store(true, Ordering::SeqCst);
                cache
            }
        }
    }

    /// Whether reads and writes are served by memory alone.
    pub fn is_using_memory(&self) -> bool {
        self.active_external().is_none()
    }

    pub fn mode(&self) -> CacheMode {
        if self.is_using_memory() {
            CacheMode::Memory
        } else {
            CacheMode::Redis
        }
    }

    pub fn memory(&self) -> &Arc<MemoryStore> {
        &self.memory
    }

    fn active_external(&self) -> Option<&Arc<dyn ExternalStore>> {
        if self.degraded.load(Ordering::SeqCst) {
            return None;
        }
        self.external.as_ref()
    }

    fn trip(&self, operation: &str, reason: &lq_domain::Error) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!(operation, error = %reason, "external cache failed, switching to memory mode");
            TraceEvent::CacheDegraded {
                operation: operation.into(),
                reason: reason.to_string(),
            }
            .emit();
        }
    }

    // ── operations ─────────────────────────────────────────────────

    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(ext) = self.active_external() {
            match ext.get(key).await {
                Ok(value) => return value,
                Err(e) => self.trip("get", &e),
            }
        }
        self.memory.get(key)
    }

    /// Write to memory (default TTL when `ttl_secs` is `None`) and, when
    /// healthy, to the external store.
    pub async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) {
        let ttl = ttl_secs.map(Duration::from_secs).unwrap_or(self.default_ttl);
        self.memory.set(key, value, ttl);

        if let Some(ext) = self.active_external() {
            if let Err(e) = ext.set(key, value, ttl_secs).await {
                self.trip("set", &e);
            }
        }
    }

    pub async fn del(&self, key: &str) {
        self.memory.del(key);
        if let Some(ext) = self.active_external() {
            if let Err(e) = ext.del(key).await {
                self.trip("del", &e);
            }
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        if let Some(ext) = self.active_external() {
            match ext.exists(key).await {
                Ok(found) => return found,
                Err(e) => self.trip("exists", &e),
            }
        }
        self.memory.exists(key)
    }

    pub async fn scan(&self, pattern: &str) -> Vec<String> {
        if let Some(ext) = self.active_external() {
            match ext.scan(pattern).await {
                Ok(keys) => return keys,
                Err(e) => self.trip("scan", &e),
            }
        }
        self.memory.scan(pattern)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use lq_domain::error::{Error, Result};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Healthy external store backed by a map.
    #[derive(Default)]
    struct MapStore {
        data: Mutex<HashMap<String, String>>,
    }

    #[async_trait::async_trait]
    impl ExternalStore for MapStore {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.data.lock().get(key).cloned())
        }
        async fn set(&self, key: &str, value: &str, _ttl: Option<u64>) -> Result<()> {
            self.data.lock().insert(key.into(), value.into());
            Ok(())
        }
        async fn del(&self, key: &str) -> Result<()> {
            self.data.lock().remove(key);
            Ok(())
        }
        async fn exists(&self, key: &str) -> Result<bool> {
            Ok(self.data.lock().contains_key(key))
        }
        async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
            let prefix = pattern.trim_end_matches('*');
            Ok(self.data.lock().keys().filter(|k| k.starts_with(prefix)).cloned().collect())
        }
        fn name(&self) -> &str {
            "map"
        }
    }

    /// External store that fails every call.
    #[derive(Default)]
    struct FailingStore {
        calls: AtomicUsize,
    }

    impl FailingStore {
        fn fail<T>(&self) -> Result<T> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Cache("connection refused".into()))
        }
    }

    #[async_trait::async_trait]
    impl ExternalStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            self.fail()
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Option<u64>) -> Result<()> {
            self.fail()
        }
        async fn del(&self, _key: &str) -> Result<()> {
            self.fail()
        }
        async fn exists(&self, _key: &str) -> Result<bool> {
            self.fail()
        }
        async fn scan(&self, _pattern: &str) -> Result<Vec<String>> {
            self.fail()
        }
        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn set_writes_memory_and_external() {
        let memory = Arc::new(MemoryStore::new());
        let external = Arc::new(MapStore::default());
        let cache = Cache::with_external(memory.clone(), external.clone());

        cache.set("session:u1", "{}", Some(60)).await;

        assert_eq!(memory.get("session:u1").as_deref(), Some("{}"));
        assert!(external.data.lock().contains_key("session:u1"));
        assert_eq!(cache.mode(), CacheMode::Redis);
    }

    #[tokio::test]
    async fn first_failure_degrades_permanently() {
        let memory = Arc::new(MemoryStore::new());
        let failing = Arc::new(FailingStore::default());
        let cache = Cache::with_external(memory, failing.clone());

        cache.set("k", "v", None).await;
        assert!(cache.is_using_memory());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);

        // Subsequent operations never touch the failed store.
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert!(cache.exists("k").await);
        assert_eq!(cache.scan("*").await, vec!["k".to_string()]);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_read_falls_back_to_memory_value() {
        let memory = Arc::new(MemoryStore::new());
        memory.set("k", "from-memory", Duration::from_secs(60));
        let cache = Cache::with_external(memory, Arc::new(FailingStore::default()));

        assert_eq!(cache.get("k").await.as_deref(), Some("from-memory"));
        assert_eq!(cache.mode(), CacheMode::Memory);
    }

    #[tokio::test]
    async fn absence_is_none_and_false() {
        let cache = Cache::memory_only(Arc::new(MemoryStore::new()));
        assert!(cache.get("missing").await.is_none());
        assert!(!cache.exists("missing").await);
        assert!(cache.scan("session:*").await.is_empty());
    }

    #[tokio::test]
    async fn del_removes_from_both() {
        let memory = Arc::new(MemoryStore::new());
        let external = Arc::new(MapStore::default());
        let cache = Cache::with_external(memory.clone(), external.clone());

        cache.set("k", "v", Some(60)).await;
        cache.del("k").await;

        assert!(!memory.exists("k"));
        assert!(!cache.exists("k").await);
    }
}
