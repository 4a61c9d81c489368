pub mod chat;
pub mod config;
pub mod error;
pub mod lead;
pub mod trace;

pub use error::{Error, Result};
pub use lead::LeadPath;
