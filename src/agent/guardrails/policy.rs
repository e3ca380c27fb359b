//! Escalation policy over loop detections.

use super::config::{GuardrailMode, GuardrailsConfig, OnLoopAction};
use super::messages::replan_message;
use crate::agent::loop_detection::{CallTracker, LoopDetectionResult, LoopKind, ToolUsage};
use crate::config::GUARDRAIL_ABORT_WARNINGS;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// What the agent driver should do after a tool call starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum GuardrailAction {
    /// No loop; keep going.
    Continue,
    /// First loop occurrence; log it.
    Warn {
        /// Detector message.
        message: String,
    },
    /// Second loop occurrence; tell the agent to replan.
    InjectMessage {
        /// Guidance for the agent.
        message: String,
    },
    /// Stop issuing tool calls; keep whatever output was produced.
    Abort {
        /// Why the session was stopped.
        reason: String,
    },
}

impl GuardrailAction {
    /// Whether this action ends the session.
    #[must_use]
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Abort { .. })
    }
}

/// Diagnostic snapshot of the guardrails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailStats {
    /// Tool calls recorded this session.
    pub total_calls: usize,
    /// Loop occurrences escalated so far.
    pub warning_count: usize,
    /// Result of the most recent detection.
    pub last_loop_type: LoopKind,
    /// Per-tool call counts, most used first.
    pub tool_usage: Vec<ToolUsage>,
}

/// Guardrails for one agent session.
#[derive(Debug)]
pub struct Guardrails {
    config: GuardrailsConfig,
    tracker: CallTracker,
    warning_count: usize,
    last_loop_result: LoopDetectionResult,
}

/// Guardrails with the thresholds of a named preset.
#[must_use]
pub fn create_guardrails(mode: GuardrailMode) -> Guardrails {
    Guardrails::new(GuardrailsConfig::preset(mode))
}

impl Guardrails {
    /// Create guardrails from explicit settings.
    #[must_use]
    pub fn new(config: GuardrailsConfig) -> Self {
        Self {
            tracker: CallTracker::new(config.tracker),
            config,
            warning_count: 0,
            last_loop_result: LoopDetectionResult::none(),
        }
    }

    /// Settings in effect.
    #[must_use]
    pub const fn config(&self) -> &GuardrailsConfig {
        &self.config
    }

    /// Record a tool call starting now and decide how to respond.
    pub fn on_tool_start<A>(&mut self, tool: &str, args: &A) -> GuardrailAction
    where
        A: Serialize + Debug + ?Sized,
    {
        self.on_tool_start_at(tool, args, Utc::now())
    }

    /// Record a tool call starting at `at` and decide how to respond.
    pub fn on_tool_start_at<A>(&mut self, tool: &str, args: &A, at: DateTime<Utc>) -> GuardrailAction
    where
        A: Serialize + Debug + ?Sized,
    {
        self.tracker.record_call_at(tool, args, at);
        let result = self.tracker.detect_loop_at(at);

        if self.config.verbose {
            info!(
                tool_name = tool,
                total_calls = self.tracker.call_count(),
                loop_type = %result.kind,
                "guardrails: tool call"
            );
        } else {
            debug!(
                tool_name = tool,
                total_calls = self.tracker.call_count(),
                loop_type = %result.kind,
                "guardrails: tool call"
            );
        }

        let action = self.decide(&result);
        self.last_loop_result = result;
        action
    }

    fn decide(&mut self, result: &LoopDetectionResult) -> GuardrailAction {
        match result.kind {
            LoopKind::None => GuardrailAction::Continue,
            LoopKind::StepLimit => {
                warn!(
                    total_calls = self.tracker.call_count(),
                    max_tool_calls = self.config.tracker.max_tool_calls,
                    "guardrails: step limit reached, aborting"
                );
                GuardrailAction::Abort {
                    reason: result.message.clone(),
                }
            }
            LoopKind::ExactRepeat | LoopKind::SequenceLoop => self.escalate(result),
        }
    }

    fn escalate(&mut self, result: &LoopDetectionResult) -> GuardrailAction {
        self.warning_count = self.warning_count.saturating_add(1);
        warn!(
            loop_type = %result.kind,
            warning_count = self.warning_count,
            message = %result.message,
            "guardrails: loop detected"
        );

        if self.warning_count == 1 {
            return GuardrailAction::Warn {
                message: result.message.clone(),
            };
        }

        if self.warning_count < GUARDRAIL_ABORT_WARNINGS
            && self.config.on_loop_action != OnLoopAction::Abort
        {
            return GuardrailAction::InjectMessage {
                message: self.replan_message(result),
            };
        }

        GuardrailAction::Abort {
            reason: format!(
                "Loop persisted after {} warnings: {}",
                self.warning_count, result.message
            ),
        }
    }

    /// Corrective guidance for a detection; empty for `none` and `step-limit`.
    #[must_use]
    pub fn replan_message(&self, result: &LoopDetectionResult) -> String {
        replan_message(result)
    }

    /// Diagnostic snapshot.
    #[must_use]
    pub fn stats(&self) -> GuardrailStats {
        GuardrailStats {
            total_calls: self.tracker.call_count(),
            warning_count: self.warning_count,
            last_loop_type: self.last_loop_result.kind,
            tool_usage: self.tracker.summary(),
        }
    }

    /// Whether the session should stop, independent of the last action returned.
    #[must_use]
    pub fn should_abort(&self) -> bool {
        self.warning_count >= GUARDRAIL_ABORT_WARNINGS
            || self.last_loop_result.kind == LoopKind::StepLimit
    }

    /// Loop occurrences escalated so far.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Result of the most recent detection.
    #[must_use]
    pub const fn last_loop_result(&self) -> &LoopDetectionResult {
        &self.last_loop_result
    }

    /// Tool calls recorded this session.
    #[must_use]
    pub const fn call_count(&self) -> usize {
        self.tracker.call_count()
    }

    /// Start over: clears the tracker and both counters.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.warning_count = 0;
        self.last_loop_result = LoopDetectionResult::none();
    }
}
