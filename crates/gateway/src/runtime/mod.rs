//! Conversation runtime: the per-turn pipeline and the background sweep.
//!
//! [`turn::handle_turn`] is the entry point for inbound messages;
//! [`sweeper::process_inactive_sessions`] drives idle sessions through the
//! extractor.

pub mod context;
pub mod extractor;
pub mod filters;
pub mod responder;
pub mod sweeper;
pub mod turn;
pub mod turn_lock;

pub use responder::{Responder, ResponderResult};
pub use sweeper::{process_inactive_sessions, SweepReport};
pub use turn::{handle_turn, InboundTurn, TurnOutcome, TurnReply};
pub use turn_lock::TurnLockMap;
