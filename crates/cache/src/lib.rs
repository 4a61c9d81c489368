//! KeyValue cache with an always-on in-memory mirror.
//!
//! Every write lands in the process-wide [`MemoryStore`]; when an external
//! store (Redis) is attached and healthy it is written too. The first
//! external failure flips the cache into memory-only mode for the rest of
//! the process lifetime.

pub mod cache;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use cache::{Cache, CacheMode};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;
pub use store::ExternalStore;
