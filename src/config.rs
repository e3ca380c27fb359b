//! Configuration constants
//!
//! Preset thresholds for the guardrail modes and fixed names of the analysis phases.

/// Longest tool-name sequence the sequence detector compares
pub const MAX_SEQUENCE_LENGTH: usize = 4;

/// Minimum number of calls the tracker keeps in its ring buffer
pub const MIN_LOG_CAPACITY: usize = MAX_SEQUENCE_LENGTH * 2;

/// Sliding window used by every preset (5 minutes)
pub const DEFAULT_TIME_WINDOW_MS: u64 = 300_000;

/// Loop occurrences after which the ladder always aborts
pub const GUARDRAIL_ABORT_WARNINGS: usize = 3;

/// `standard` preset: maximum tool calls per session
pub const STANDARD_MAX_TOOL_CALLS: usize = 50;
/// `standard` preset: identical calls in a row before a loop is reported
pub const STANDARD_MAX_CONSECUTIVE_REPEATS: usize = 5;
/// `standard` preset: shortest repeating tool sequence
pub const STANDARD_MIN_SEQUENCE_LENGTH: usize = 3;

/// `deep` preset: maximum tool calls per session
pub const DEEP_MAX_TOOL_CALLS: usize = 80;
/// `deep` preset: identical calls in a row before a loop is reported
pub const DEEP_MAX_CONSECUTIVE_REPEATS: usize = 6;
/// `deep` preset: shortest repeating tool sequence
pub const DEEP_MIN_SEQUENCE_LENGTH: usize = 4;

/// `strict` preset: maximum tool calls per session
pub const STRICT_MAX_TOOL_CALLS: usize = 30;
/// `strict` preset: identical calls in a row before a loop is reported
pub const STRICT_MAX_CONSECUTIVE_REPEATS: usize = 3;
/// `strict` preset: shortest repeating tool sequence
pub const STRICT_MIN_SEQUENCE_LENGTH: usize = 2;

/// Names of the six analysis phases, in order
pub const PHASE_NAMES: [&str; 6] = [
    "metadata",
    "file-tree",
    "file-selection",
    "file-reading",
    "analysis",
    "report",
];
