//! Guidance texts produced by the guardrails.
//!
//! Replan messages are sent back to the agent; notices are appended to the
//! session transcript.

use crate::agent::loop_detection::{LoopDetectionResult, LoopKind};

const EXACT_REPEAT_GUIDANCE: &str = "You are repeating the same tool call with identical arguments. Stop calling it again. Either proceed with the data you already have, or try a different approach: another tool or different arguments.";

const SEQUENCE_LOOP_GUIDANCE: &str = "You are cycling through the same sequence of tools without making progress. Stop exploring and produce your output now with the information you have already gathered.";

/// Corrective guidance for a detected loop. Empty for `none` and `step-limit`.
#[must_use]
pub fn replan_message(result: &LoopDetectionResult) -> String {
    match result.kind {
        LoopKind::ExactRepeat => EXACT_REPEAT_GUIDANCE.to_string(),
        LoopKind::SequenceLoop => SEQUENCE_LOOP_GUIDANCE.to_string(),
        LoopKind::None | LoopKind::StepLimit => String::new(),
    }
}

/// Transcript block recording that the session was stopped.
#[must_use]
pub fn abort_notice(reason: &str) -> String {
    format!("\n\n---\n⛔ Analysis stopped by guardrails: {reason}\n---\n\n")
}

/// Transcript block carrying injected guidance.
#[must_use]
pub fn injected_guidance(message: &str) -> String {
    format!("\n\n> ⚠️ Guardrail: {message}\n\n")
}
