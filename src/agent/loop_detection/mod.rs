//! Loop detection subsystem for agent execution.
//!
//! Records tool calls and reports exact repeats, cycling tool sequences and
//! the hard step ceiling.

mod tracker;
mod types;

pub use tracker::CallTracker;
pub use types::{LoopDetectionResult, LoopKind, ToolCall, ToolUsage, TrackerConfig};
