use lq_domain::error::Result;

/// An out-of-process key/value backend.
///
/// Absence is never an error: `get` returns `None` and `exists` returns
/// `false`. Errors mean the backend itself is unhealthy.
#[async_trait::async_trait]
pub trait ExternalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value`; `ttl_secs = None` stores without expiry.
    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()>;

    async fn del(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// All keys matching a glob `pattern`, fully paginated.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    /// Short backend name for logs and health output.
    fn name(&self) -> &str;
}
