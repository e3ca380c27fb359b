//! Session event handler.
//!
//! Consumes session events one at a time, runs the guardrails on every tool
//! start, tracks analysis phases and accumulates the assistant's output.
//! Once an abort is applied, tool events are skipped but text and the idle
//! signal are still processed so no output is lost.

use crate::agent::events::SessionEvent;
use crate::agent::guardrails::messages::{abort_notice, injected_guidance};
use crate::agent::guardrails::{GuardrailAction, GuardrailStats, Guardrails, GuardrailsConfig};
use crate::agent::progress::{AnalysisPhase, PhaseBoard};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Mutable state of one analysis session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventHandlerState {
    /// Assistant text plus guardrail notices, in arrival order.
    pub output_buffer: String,
    /// Tool starts processed before the session was aborted.
    pub tool_call_count: usize,
    /// Analysis phases.
    pub progress: PhaseBoard,
    /// Set once by an abort action; never cleared.
    pub aborted: bool,
    /// Why the session was aborted.
    pub abort_reason: Option<String>,
}

impl EventHandlerState {
    /// Phases in order.
    #[must_use]
    pub fn phases(&self) -> &[AnalysisPhase] {
        self.progress.phases()
    }

    /// Index of the furthest phase reached.
    #[must_use]
    pub const fn current_phase_index(&self) -> usize {
        self.progress.current_index()
    }
}

/// Final snapshot of a session for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Session identifier used in logs.
    pub session_id: Uuid,
    /// Accumulated output.
    pub output: String,
    /// Tool starts processed.
    pub tool_call_count: usize,
    /// Final phase list.
    pub phases: Vec<AnalysisPhase>,
    /// Whether the guardrails stopped the session.
    pub aborted: bool,
    /// Why the session was stopped.
    pub abort_reason: Option<String>,
    /// Guardrail diagnostics.
    pub guardrails: GuardrailStats,
}

/// Drives guardrails and progress from a stream of session events.
#[derive(Debug)]
pub struct SessionEventHandler {
    session_id: Uuid,
    guardrails: Guardrails,
    state: EventHandlerState,
}

impl SessionEventHandler {
    /// Create a handler for a new session.
    #[must_use]
    pub fn new(guardrails: Guardrails) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            guardrails,
            state: EventHandlerState::default(),
        }
    }

    /// Create a handler with guardrails built from `config`.
    #[must_use]
    pub fn with_config(config: GuardrailsConfig) -> Self {
        Self::new(Guardrails::new(config))
    }

    /// Session identifier.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &EventHandlerState {
        &self.state
    }

    /// Guardrails driven by this handler.
    #[must_use]
    pub const fn guardrails(&self) -> &Guardrails {
        &self.guardrails
    }

    /// Process one event now.
    ///
    /// Returns the guardrail action for a processed tool start, `None` otherwise.
    pub fn handle(&mut self, event: &SessionEvent) -> Option<GuardrailAction> {
        self.handle_at(event, Utc::now())
    }

    /// Process one event received at `at`.
    pub fn handle_at(&mut self, event: &SessionEvent, at: DateTime<Utc>) -> Option<GuardrailAction> {
        match event {
            SessionEvent::MessageDelta { delta_content } => {
                self.state.output_buffer.push_str(delta_content);
                None
            }
            SessionEvent::Message { content } => {
                self.state.output_buffer.push_str(content);
                None
            }
            SessionEvent::ToolExecutionStart {
                tool_name,
                arguments,
            } => self.on_tool_start(tool_name, arguments, at),
            SessionEvent::ToolExecutionComplete { tool_name } => {
                if !self.state.aborted {
                    debug!(session_id = %self.session_id, tool_name = %tool_name, "handler: tool completed");
                }
                None
            }
            SessionEvent::SessionIdle => {
                self.state.progress.finish();
                info!(
                    session_id = %self.session_id,
                    tool_calls = self.state.tool_call_count,
                    aborted = self.state.aborted,
                    "handler: session idle"
                );
                None
            }
            SessionEvent::Unknown { kind } => {
                debug!(session_id = %self.session_id, kind = %kind, "handler: ignoring unknown event");
                None
            }
        }
    }

    /// Process events in order.
    pub fn handle_all<'a, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'a SessionEvent>,
    {
        for event in events {
            self.handle(event);
        }
    }

    /// Mark the running phase as failed. Returns whether a phase changed.
    pub fn fail_current_phase(&mut self) -> bool {
        self.state.progress.fail_current()
    }

    /// Snapshot for reporting; the output buffer is kept.
    #[must_use]
    pub fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.session_id,
            output: self.state.output_buffer.clone(),
            tool_call_count: self.state.tool_call_count,
            phases: self.state.phases().to_vec(),
            aborted: self.state.aborted,
            abort_reason: self.state.abort_reason.clone(),
            guardrails: self.guardrails.stats(),
        }
    }

    fn on_tool_start(
        &mut self,
        tool_name: &str,
        arguments: &Value,
        at: DateTime<Utc>,
    ) -> Option<GuardrailAction> {
        if self.state.aborted {
            debug!(session_id = %self.session_id, tool_name, "handler: aborted, skipping tool start");
            return None;
        }

        self.state.tool_call_count += 1;
        let action = self.guardrails.on_tool_start_at(tool_name, arguments, at);
        self.apply(&action);
        self.state.progress.advance_for_tool(tool_name);
        Some(action)
    }

    fn apply(&mut self, action: &GuardrailAction) {
        match action {
            GuardrailAction::Continue => {}
            GuardrailAction::Warn { message } => {
                warn!(session_id = %self.session_id, message = %message, "handler: guardrail warning");
            }
            GuardrailAction::InjectMessage { message } => {
                info!(session_id = %self.session_id, "handler: injecting replan guidance");
                self.state.output_buffer.push_str(&injected_guidance(message));
            }
            GuardrailAction::Abort { reason } => {
                warn!(session_id = %self.session_id, reason = %reason, "handler: session aborted");
                self.state.aborted = true;
                self.state.abort_reason = Some(reason.clone());
                self.state.output_buffer.push_str(&abort_notice(reason));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SessionEventHandler;
    use crate::agent::events::SessionEvent;
    use crate::agent::guardrails::{GuardrailAction, GuardrailsConfig, OnLoopAction};
    use crate::agent::loop_detection::TrackerConfig;
    use crate::agent::progress::PhaseStatus;
    use chrono::{TimeDelta, Utc};
    use serde_json::json;

    fn handler(repeats: usize, max_calls: usize) -> SessionEventHandler {
        SessionEventHandler::with_config(GuardrailsConfig {
            tracker: TrackerConfig {
                max_tool_calls: max_calls,
                max_consecutive_repeats: repeats,
                min_sequence_length: 4,
                time_window_ms: 60_000,
            },
            verbose: true,
            on_loop_action: OnLoopAction::Warn,
        })
    }

    fn repeat_read(handler: &mut SessionEventHandler, times: usize) {
        let event = SessionEvent::tool_start("read_repo_file", json!({"path": "README.md"}));
        for _ in 0..times {
            handler.handle(&event);
        }
    }

    #[test]
    fn text_accumulates() {
        let mut handler = handler(5, 50);
        handler.handle(&SessionEvent::delta("Hello, "));
        handler.handle(&SessionEvent::Message {
            content: "world".to_string(),
        });
        assert_eq!(handler.state().output_buffer, "Hello, world");
        assert_eq!(handler.state().tool_call_count, 0);
    }

    #[test]
    fn inject_appends_guidance() {
        let mut handler = handler(2, 50);
        repeat_read(&mut handler, 2);
        assert!(!handler.state().output_buffer.contains("Guardrail"));
        repeat_read(&mut handler, 1);
        assert!(handler.state().output_buffer.contains("Guardrail"));
        assert!(!handler.state().aborted);
    }

    #[test]
    fn abort_latches_and_freezes_tool_count() {
        let mut handler = handler(2, 50);
        handler.handle(&SessionEvent::delta("partial report"));
        repeat_read(&mut handler, 4);

        let state = handler.state();
        assert!(state.aborted);
        assert_eq!(state.tool_call_count, 4);
        assert!(state.abort_reason.is_some());
        assert!(state.output_buffer.starts_with("partial report"));
        assert!(state.output_buffer.contains("Analysis stopped"));

        let action = handler.handle(&SessionEvent::tool_start("list_repo_files", json!({})));
        assert!(action.is_none());
        handler.handle(&SessionEvent::ToolExecutionComplete {
            tool_name: "list_repo_files".to_string(),
        });
        handler.handle(&SessionEvent::delta(" more"));

        assert_eq!(handler.state().tool_call_count, 4);
        assert!(handler.state().aborted);
        assert!(handler.state().output_buffer.ends_with(" more"));
        assert_eq!(handler.guardrails().call_count(), 4);
    }

    #[test]
    fn step_limit_aborts_session() {
        let mut handler = handler(5, 3);
        let mut actions = Vec::new();
        for tool in ["get_repo_meta", "list_repo_files", "read_repo_file"] {
            actions.push(handler.handle(&SessionEvent::tool_start(tool, json!({}))));
        }
        assert_eq!(actions[0], Some(GuardrailAction::Continue));
        assert!(matches!(actions[2], Some(GuardrailAction::Abort { .. })));
        assert!(handler.state().aborted);
        assert_eq!(handler.state().current_phase_index(), 3);
    }

    #[test]
    fn phases_follow_tools_and_idle_finishes() {
        let mut handler = handler(5, 50);
        handler.handle(&SessionEvent::tool_start("get_repo_meta", json!({})));
        assert_eq!(handler.state().phases()[0].status, PhaseStatus::Running);

        handler.handle(&SessionEvent::tool_start("list_repo_files", json!({})));
        handler.handle(&SessionEvent::tool_start("read_repo_file", json!({"path": "a"})));
        assert_eq!(handler.state().current_phase_index(), 3);
        assert_eq!(handler.state().phases()[2].status, PhaseStatus::Done);

        handler.handle(&SessionEvent::SessionIdle);
        assert!(handler
            .state()
            .phases()
            .iter()
            .all(|phase| phase.status == PhaseStatus::Done));
    }

    #[test]
    fn idle_after_abort_still_finalizes() {
        let mut handler = handler(2, 50);
        handler.handle(&SessionEvent::tool_start("list_repo_files", json!({})));
        assert!(handler.fail_current_phase());
        repeat_read(&mut handler, 4);
        handler.handle(&SessionEvent::SessionIdle);

        let phases = handler.state().phases();
        assert_eq!(phases[1].status, PhaseStatus::Error);
        assert_eq!(phases[0].status, PhaseStatus::Done);
        assert_eq!(phases[5].status, PhaseStatus::Done);
    }

    #[test]
    fn spaced_tool_starts_fall_out_of_window() {
        let mut handler = handler(2, 50);
        let event = SessionEvent::tool_start("read_repo_file", json!({"path": "README.md"}));
        let start = Utc::now();

        let first = handler.handle_at(&event, start);
        let second = handler.handle_at(&event, start + TimeDelta::seconds(61));
        assert_eq!(first, Some(GuardrailAction::Continue));
        assert_eq!(second, Some(GuardrailAction::Continue));

        let third = handler.handle_at(&event, start + TimeDelta::seconds(62));
        assert!(matches!(third, Some(GuardrailAction::Warn { .. })));
        assert_eq!(handler.state().tool_call_count, 3);
        assert_eq!(handler.guardrails().warning_count(), 1);
    }

    #[test]
    fn unknown_events_are_ignored() {
        let mut handler = handler(5, 50);
        let action = handler.handle(&SessionEvent::Unknown {
            kind: "session.usage".to_string(),
        });
        assert!(action.is_none());
        assert!(handler.state().output_buffer.is_empty());
        assert_eq!(handler.state().tool_call_count, 0);
    }

    #[test]
    fn report_keeps_output() {
        let mut handler = handler(2, 50);
        handler.handle_all(&[
            SessionEvent::delta("summary so far"),
            SessionEvent::tool_start("search", json!({"q": 1})),
        ]);
        let report = handler.report();
        assert_eq!(report.output, "summary so far");
        assert_eq!(report.tool_call_count, 1);
        assert_eq!(report.guardrails.total_calls, 1);
        assert_eq!(report.session_id, handler.session_id());
        assert_eq!(handler.state().output_buffer, "summary so far");
    }
}
