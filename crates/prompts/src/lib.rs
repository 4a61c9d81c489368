//! Prompt assembly: core rules template, per-path scripts and the
//! extraction prompt. Template bodies live in `templates/` and are compiled in.

pub mod builder;
pub mod script;
pub mod template;

pub use builder::{build_system_prompt, extraction_prompt, UserMemory};
pub use script::Script;
