//! Agent supervision module
//!
//! This module watches an agent session from the outside:
//! - Records tool invocations and detects repetition loops
//! - Escalates detections through a warn / inject / abort ladder
//! - Consumes session events and tracks analysis progress

/// Errors produced while configuring guardrails or decoding events
pub mod errors;
/// Session event decoding
pub mod events;
/// Guardrail policy and configuration
pub mod guardrails;
/// Event handler driving guardrails and progress
pub mod handler;
/// Tool call tracking and loop detection
pub mod loop_detection;
/// Analysis phase tracking
pub mod progress;

pub use errors::GuardrailError;
pub use events::SessionEvent;
pub use guardrails::{
    create_guardrails, GuardrailAction, GuardrailMode, GuardrailStats, Guardrails,
    GuardrailsConfig, OnLoopAction,
};
pub use handler::{EventHandlerState, SessionEventHandler, SessionReport};
pub use loop_detection::{CallTracker, LoopDetectionResult, LoopKind, TrackerConfig};
pub use progress::{AnalysisPhase, PhaseBoard, PhaseStatus};
