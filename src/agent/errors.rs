//! Error types for guardrail configuration and event decoding.
//!
//! The detection path itself never fails; these errors only surface while
//! loading settings or decoding raw session events.

use thiserror::Error;

/// Errors produced by the guardrail subsystem.
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A threshold is outside its allowed range.
    #[error("invalid guardrail config: {0}")]
    InvalidConfig(String),

    /// Mode name is not one of `standard`, `deep`, `strict`.
    #[error("unknown guardrail mode: {0}")]
    UnknownMode(String),

    /// Loop action is not one of `warn`, `inject`, `abort`.
    #[error("unknown loop action: {0}")]
    UnknownLoopAction(String),

    /// Layered config sources could not be read or deserialized.
    #[error("failed to load guardrail config: {0}")]
    Config(#[from] config::ConfigError),

    /// A session event envelope or its payload is malformed.
    #[error("malformed {kind} event: {source}")]
    EventPayload {
        /// Event type string from the envelope (empty if the envelope itself failed).
        kind: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}
