//! Session events consumed by the event handler.
//!
//! Events arrive as a `{"type": ..., "data": {...}}` envelope. Only the
//! `deltaContent`, `content`, `toolName` and `arguments` payload fields are
//! read; anything else is ignored.

use crate::agent::errors::GuardrailError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Streaming text chunk from the assistant.
pub const MESSAGE_DELTA: &str = "assistant.message_delta";
/// Complete assistant message.
pub const MESSAGE: &str = "assistant.message";
/// A tool call is starting.
pub const TOOL_EXECUTION_START: &str = "tool.execution_start";
/// A tool call finished.
pub const TOOL_EXECUTION_COMPLETE: &str = "tool.execution_complete";
/// The session has nothing left to do.
pub const SESSION_IDLE: &str = "session.idle";

/// Undecoded event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSessionEvent {
    /// Event type string.
    #[serde(rename = "type")]
    pub kind: String,
    /// Event payload.
    #[serde(default)]
    pub data: Value,
}

/// A decoded session event.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// `assistant.message_delta`
    MessageDelta {
        /// Text chunk.
        delta_content: String,
    },
    /// `assistant.message`
    Message {
        /// Full message text.
        content: String,
    },
    /// `tool.execution_start`
    ToolExecutionStart {
        /// Tool being invoked.
        tool_name: String,
        /// Call arguments.
        arguments: Value,
    },
    /// `tool.execution_complete`
    ToolExecutionComplete {
        /// Tool that finished.
        tool_name: String,
    },
    /// `session.idle`
    SessionIdle,
    /// Any other event type; ignored by the handler.
    Unknown {
        /// Event type string as received.
        kind: String,
    },
}

impl SessionEvent {
    /// Decode one JSON envelope.
    ///
    /// # Errors
    ///
    /// Returns `GuardrailError::EventPayload` if the line is not an envelope
    /// or a known event's payload has the wrong shape.
    pub fn from_json(line: &str) -> Result<Self, GuardrailError> {
        let raw: RawSessionEvent =
            serde_json::from_str(line).map_err(|source| GuardrailError::EventPayload {
                kind: String::new(),
                source,
            })?;
        Self::from_raw(raw)
    }

    /// Decode an already parsed envelope.
    ///
    /// # Errors
    ///
    /// Returns `GuardrailError::EventPayload` if the field a known event reads
    /// is not a string. Other payload fields are never looked at, and unknown
    /// types never fail.
    pub fn from_raw(raw: RawSessionEvent) -> Result<Self, GuardrailError> {
        let kind = raw.kind.as_str();
        let data = &raw.data;
        Ok(match kind {
            MESSAGE_DELTA => Self::MessageDelta {
                delta_content: text_field(kind, data, "deltaContent")?,
            },
            MESSAGE => Self::Message {
                content: text_field(kind, data, "content")?,
            },
            TOOL_EXECUTION_START => Self::ToolExecutionStart {
                tool_name: text_field(kind, data, "toolName")?,
                arguments: data.get("arguments").cloned().unwrap_or(Value::Null),
            },
            TOOL_EXECUTION_COMPLETE => Self::ToolExecutionComplete {
                tool_name: text_field(kind, data, "toolName")?,
            },
            SESSION_IDLE => Self::SessionIdle,
            _ => Self::Unknown {
                kind: kind.to_string(),
            },
        })
    }

    /// Shorthand for a `tool.execution_start` event.
    #[must_use]
    pub fn tool_start(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolExecutionStart {
            tool_name: tool_name.into(),
            arguments,
        }
    }

    /// Shorthand for an `assistant.message_delta` event.
    #[must_use]
    pub fn delta(text: impl Into<String>) -> Self {
        Self::MessageDelta {
            delta_content: text.into(),
        }
    }

    /// Event type string.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::MessageDelta { .. } => MESSAGE_DELTA,
            Self::Message { .. } => MESSAGE,
            Self::ToolExecutionStart { .. } => TOOL_EXECUTION_START,
            Self::ToolExecutionComplete { .. } => TOOL_EXECUTION_COMPLETE,
            Self::SessionIdle => SESSION_IDLE,
            Self::Unknown { kind } => kind,
        }
    }
}

/// Read one string field of a payload; missing or `null` reads as empty.
fn text_field(kind: &str, data: &Value, key: &str) -> Result<String, GuardrailError> {
    let Some(value) = data.get(key) else {
        return Ok(String::new());
    };
    serde_json::from_value::<Option<String>>(value.clone())
        .map(Option::unwrap_or_default)
        .map_err(|source| GuardrailError::EventPayload {
            kind: kind.to_string(),
            source,
        })
}
