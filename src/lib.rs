#![deny(missing_docs)]
//! Oxide guardrails library.
//!
//! Loop detection, escalation policy and session event handling for
//! supervising an agent's tool calls.
//!
//! Every type here is single-threaded state owned by one analysis session.
//! Callers must not drive the same instance from two threads at once; no
//! internal locking is done.

/// Agent supervision: loop detection, guardrails, progress and events.
pub mod agent;
/// Configuration constants.
pub mod config;

pub use agent::{
    create_guardrails, AnalysisPhase, CallTracker, EventHandlerState, GuardrailAction,
    GuardrailError, GuardrailMode, GuardrailStats, Guardrails, GuardrailsConfig,
    LoopDetectionResult, LoopKind, OnLoopAction, PhaseStatus, SessionEvent, SessionEventHandler,
    SessionReport, TrackerConfig,
};
