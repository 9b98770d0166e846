//! ARIA: intent and dialogue core for a conversational assistant.
//!
//! Turns free-form utterances (typed or voice-transcribed) into
//! confidence-scored [`Decision`](types::Decision)s: an intent, typed
//! entities and a verdict (`EXECUTE`, `CONFIRM` or `REJECT`) that gates
//! what a downstream [`ActionDispatcher`](dispatch::ActionDispatcher) may do.
//!
//! The pipeline lives in [`resolver`]; per-conversation state lives in
//! [`context`] and is owned by one [`session`] actor per conversation.
//!
//! See `DESIGN.md` for the architecture.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod logging;
pub mod text;
pub mod types;

pub mod applications;
pub mod classifier;
pub mod extractors;
pub mod patterns;
pub mod vocabulary;

pub mod context;
pub mod resolver;
pub mod session;

pub mod dispatch;
pub mod suggest;
