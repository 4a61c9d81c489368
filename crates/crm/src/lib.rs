//! CRM collaborator: where extracted lead records end up.
//!
//! [`LeadStore`] is keyed by the external (messaging platform) user id.
//! [`MemoryLeadStore`] backs local runs; [`PgLeadStore`] writes Postgres and
//! doubles as the relational session mirror.

pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use memory::MemoryLeadStore;
pub use postgres::PgLeadStore;
pub use record::{budget_tier, ExtractedData};
pub use store::{LeadContext, LeadStore};
