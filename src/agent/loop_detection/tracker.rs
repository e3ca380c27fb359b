//! Tool call tracker.

use super::types::{LoopDetectionResult, ToolCall, ToolUsage, TrackerConfig};
use crate::config::{MAX_SEQUENCE_LENGTH, MIN_LOG_CAPACITY};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use tracing::{debug, warn};

/// Records tool calls for one session and detects loops over them.
///
/// The log is a ring buffer large enough for every detector; the total call
/// count and per-tool counts are running totals, so they cover the whole
/// session even after old entries are evicted.
#[derive(Debug)]
pub struct CallTracker {
    config: TrackerConfig,
    log: VecDeque<ToolCall>,
    capacity: usize,
    total_calls: usize,
    usage: HashMap<String, usize>,
}

impl CallTracker {
    /// Create a tracker. Thresholds below their minimum are clamped.
    #[must_use]
    pub fn new(requested: TrackerConfig) -> Self {
        let config = TrackerConfig {
            max_tool_calls: requested.max_tool_calls.max(1),
            max_consecutive_repeats: requested.max_consecutive_repeats.max(1),
            min_sequence_length: requested.min_sequence_length.max(2),
            time_window_ms: requested.time_window_ms.max(1),
        };
        if config != requested {
            warn!(
                ?requested,
                effective = ?config,
                "call_tracker: thresholds below their minimum, clamped"
            );
        }
        let capacity = config
            .max_tool_calls
            .max(config.max_consecutive_repeats)
            .max(MIN_LOG_CAPACITY);

        Self {
            config,
            log: VecDeque::with_capacity(capacity),
            capacity,
            total_calls: 0,
            usage: HashMap::new(),
        }
    }

    /// Thresholds in effect.
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Record a call made now.
    pub fn record_call<A>(&mut self, tool: &str, args: &A)
    where
        A: Serialize + Debug + ?Sized,
    {
        self.record_call_at(tool, args, Utc::now());
    }

    /// Record a call made at `at`. Never fails, whatever `args` is.
    pub fn record_call_at<A>(&mut self, tool: &str, args: &A, at: DateTime<Utc>)
    where
        A: Serialize + Debug + ?Sized,
    {
        let args_hash = hash_tool_call(tool, args);
        if self.log.len() == self.capacity {
            self.log.pop_front();
        }
        self.log.push_back(ToolCall {
            tool: tool.to_string(),
            args_hash,
            timestamp: at,
        });
        self.total_calls = self.total_calls.saturating_add(1);
        *self.usage.entry(tool.to_string()).or_default() += 1;

        debug!(
            tool_name = tool,
            total_calls = self.total_calls,
            "call_tracker: recorded call"
        );
    }

    /// Calls recorded since creation or the last reset.
    #[must_use]
    pub const fn call_count(&self) -> usize {
        self.total_calls
    }

    /// Check for a loop as of now.
    #[must_use]
    pub fn detect_loop(&self) -> LoopDetectionResult {
        self.detect_loop_at(Utc::now())
    }

    /// Check for a loop as of `now`.
    ///
    /// Priority: step limit, then exact repeat, then sequence loop.
    #[must_use]
    pub fn detect_loop_at(&self, now: DateTime<Utc>) -> LoopDetectionResult {
        if self.total_calls >= self.config.max_tool_calls {
            return LoopDetectionResult::step_limit(self.total_calls, self.config.max_tool_calls);
        }

        let recent = self.recent_calls(now);
        if let Some(result) = self.exact_repeat(&recent) {
            return result;
        }
        if let Some(result) = self.sequence_loop(&recent) {
            return result;
        }

        LoopDetectionResult::none()
    }

    /// Per-tool call counts, most used first.
    #[must_use]
    pub fn summary(&self) -> Vec<ToolUsage> {
        let mut usage: Vec<ToolUsage> = self
            .usage
            .iter()
            .map(|(tool, count)| ToolUsage {
                tool: tool.clone(),
                count: *count,
            })
            .collect();
        usage.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tool.cmp(&b.tool)));
        usage
    }

    /// Forget every recorded call.
    pub fn reset(&mut self) {
        self.log.clear();
        self.total_calls = 0;
        self.usage.clear();
    }

    fn recent_calls(&self, now: DateTime<Utc>) -> Vec<&ToolCall> {
        let window = i64::try_from(self.config.time_window_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);

        self.log
            .iter()
            .filter(|call| now.signed_duration_since(call.timestamp) < window)
            .collect()
    }

    fn exact_repeat(&self, recent: &[&ToolCall]) -> Option<LoopDetectionResult> {
        let threshold = self.config.max_consecutive_repeats;
        if recent.len() < threshold {
            return None;
        }

        let last = recent.last()?;
        let run = recent
            .iter()
            .rev()
            .take_while(|call| call.tool == last.tool && call.args_hash == last.args_hash)
            .count();

        (run >= threshold).then(|| LoopDetectionResult::exact_repeat(&last.tool, run))
    }

    // Compares tool names only; arguments may differ between cycles.
    fn sequence_loop(&self, recent: &[&ToolCall]) -> Option<LoopDetectionResult> {
        let len = recent.len();
        for seq_len in self.config.min_sequence_length..=MAX_SEQUENCE_LENGTH {
            if len < seq_len * 2 {
                break;
            }

            let tail = &recent[len - seq_len..];
            let previous = &recent[len - seq_len * 2..len - seq_len];
            let repeats = tail
                .iter()
                .zip(previous)
                .all(|(current, earlier)| current.tool == earlier.tool);

            if repeats {
                let names: Vec<&str> = tail.iter().map(|call| call.tool.as_str()).collect();
                return Some(LoopDetectionResult::sequence_loop(&names));
            }
        }

        None
    }
}

fn hash_tool_call<A>(tool: &str, args: &A) -> String
where
    A: Serialize + Debug + ?Sized,
{
    let mut hasher = Sha256::new();
    hasher.update(tool.as_bytes());
    hasher.update(b":");
    hasher.update(canonical_args(args).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn canonical_args<A>(args: &A) -> String
where
    A: Serialize + Debug + ?Sized,
{
    match serde_json::to_value(args) {
        Ok(Value::String(raw)) => serde_json::from_str::<Value>(&raw)
            .map(|value| canonicalize(value).to_string())
            .unwrap_or(raw),
        Ok(value) => canonicalize(value).to_string(),
        Err(err) => {
            debug!(error = %err, "call_tracker: arguments not serializable, hashing debug form");
            format!("{args:?}")
        }
    }
}

/// Rebuild objects with sorted keys so key order never affects the hash.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
