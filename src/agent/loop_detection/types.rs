//! Types for loop detection.

use crate::config::{
    DEFAULT_TIME_WINDOW_MS, STANDARD_MAX_CONSECUTIVE_REPEATS, STANDARD_MAX_TOOL_CALLS,
    STANDARD_MIN_SEQUENCE_LENGTH,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One recorded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    /// Tool name.
    pub tool: String,
    /// SHA-256 hex digest of the tool name and canonical arguments.
    pub args_hash: String,
    /// When the call was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Thresholds for a [`CallTracker`](super::CallTracker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Total calls per session before the step limit fires.
    pub max_tool_calls: usize,
    /// Identical calls in a row before an exact repeat is reported.
    pub max_consecutive_repeats: usize,
    /// Shortest tool-name sequence checked for cycling.
    pub min_sequence_length: usize,
    /// Sliding window for repeat and sequence checks.
    pub time_window_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: STANDARD_MAX_TOOL_CALLS,
            max_consecutive_repeats: STANDARD_MAX_CONSECUTIVE_REPEATS,
            min_sequence_length: STANDARD_MIN_SEQUENCE_LENGTH,
            time_window_ms: DEFAULT_TIME_WINDOW_MS,
        }
    }
}

/// Which detector (if any) fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopKind {
    /// No loop.
    #[default]
    None,
    /// The same tool with the same arguments, many times in a row.
    ExactRepeat,
    /// The same ordered run of tool names, twice back to back.
    SequenceLoop,
    /// Total call ceiling reached.
    StepLimit,
}

impl LoopKind {
    /// Kebab-case name used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ExactRepeat => "exact-repeat",
            Self::SequenceLoop => "sequence-loop",
            Self::StepLimit => "step-limit",
        }
    }
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single `detect_loop` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopDetectionResult {
    /// Detector that fired.
    #[serde(rename = "type")]
    pub kind: LoopKind,
    /// Human-readable description (empty for `none`).
    pub message: String,
    /// Length of the identical-call run; 0 unless `kind` is `exact-repeat`.
    pub consecutive_repeats: usize,
}

impl LoopDetectionResult {
    /// No loop found.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// `tool` was called `repeats` times in a row with identical arguments.
    #[must_use]
    pub fn exact_repeat(tool: &str, repeats: usize) -> Self {
        Self {
            kind: LoopKind::ExactRepeat,
            message: format!(
                "Tool '{tool}' called {repeats} times in a row with identical arguments"
            ),
            consecutive_repeats: repeats,
        }
    }

    /// The tool names in `sequence` repeated back to back.
    #[must_use]
    pub fn sequence_loop(sequence: &[&str]) -> Self {
        Self {
            kind: LoopKind::SequenceLoop,
            message: format!(
                "Repeating tool sequence detected: {}",
                sequence.join(" → ")
            ),
            consecutive_repeats: 0,
        }
    }

    /// The session recorded `count` calls against a ceiling of `max`.
    #[must_use]
    pub fn step_limit(count: usize, max: usize) -> Self {
        Self {
            kind: LoopKind::StepLimit,
            message: format!("Step limit reached: {count} tool calls (max {max})"),
            consecutive_repeats: 0,
        }
    }

    /// Whether any detector fired.
    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.kind != LoopKind::None
    }
}

/// Invocation count for one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUsage {
    /// Tool name.
    pub tool: String,
    /// Calls recorded this session.
    pub count: usize,
}
