//! Per-user conversation state for leadqual.
//!
//! Live sessions sit in the KeyValue cache under `session:<userId>`; a
//! relational mirror (when configured) rehydrates sessions after cache
//! expiry and receives a best-effort copy after every turn.

pub mod mirror;
pub mod session;
pub mod store;

pub use mirror::SessionMirror;
pub use session::{Message, SessionData};
pub use store::SessionStore;
