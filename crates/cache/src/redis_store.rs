//! Redis backend for the cache.

use std::time::Duration;

use lq_domain::config::CacheConfig;
use lq_domain::error::{Error, Result};
use redis::aio::ConnectionManager;

use crate::store::ExternalStore;

/// Keys fetched per `SCAN` round trip.
const SCAN_BATCH: usize = 100;

/// Redis-backed [`ExternalStore`] using a multiplexed, auto-reconnecting
/// connection.
pub struct RedisStore {
    conn: ConnectionManager,
}

fn from_redis(e: redis::RedisError) -> Error {
    Error::Cache(e.to_string())
}

impl RedisStore {
    /// Connect to `url`. Reconnects are retried `config.max_retries` times
    /// with exponential backoff before an operation reports failure.
    pub async fn connect(url: &str, config: &CacheConfig) -> Result<Self> {
        let client = redis::Client::open(url).map_err(from_redis)?;
        let retries = config.max_retries as usize;
        let connect = ConnectionManager::new_with_backoff(client, 2, 100, retries);
        let conn = tokio::time::timeout(Duration::from_millis(config.connect_timeout_ms), connect)
            .await
            .map_err(|_| Error::Timeout(format!("redis connect to {url}")))?
            .map_err(from_redis)?;
        Ok(Self { conn })
    }
}

#[async_trait::async_trait]
impl ExternalStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(from_redis)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl_secs: Option<u64>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl_secs {
            cmd.arg("EX").arg(ttl.max(1));
        }
        let _: () = cmd.query_async(&mut conn).await.map_err(from_redis)?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(from_redis)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let count: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(from_redis)?;
        Ok(count > 0)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(from_redis)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn name(&self) -> &str {
        "redis"
    }
}
