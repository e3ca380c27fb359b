//! Guardrail policy for agent tool calls.
//!
//! Wraps the call tracker and turns loop detections into an escalating
//! warn / inject / abort response.

mod config;
/// Guidance texts and transcript notices
pub mod messages;
mod policy;

pub use self::config::{GuardrailMode, GuardrailsConfig, OnLoopAction};
pub use policy::{create_guardrails, GuardrailAction, GuardrailStats, Guardrails};
