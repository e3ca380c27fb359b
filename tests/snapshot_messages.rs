use insta::assert_snapshot;
use oxide_guardrails::agent::guardrails::messages::replan_message;
use oxide_guardrails::{GuardrailAction, LoopDetectionResult};

#[test]
fn test_exact_repeat_guidance_snapshot() {
    let result = LoopDetectionResult::exact_repeat("read_repo_file", 5);
    assert_snapshot!(replan_message(&result), @"You are repeating the same tool call with identical arguments. Stop calling it again. Either proceed with the data you already have, or try a different approach: another tool or different arguments.");
}

#[test]
fn test_sequence_loop_guidance_snapshot() {
    let result = LoopDetectionResult::sequence_loop(&["get_repo_meta", "list_repo_files"]);
    assert_snapshot!(replan_message(&result), @"You are cycling through the same sequence of tools without making progress. Stop exploring and produce your output now with the information you have already gathered.");
}

#[test]
fn test_detector_messages_snapshot() {
    let exact = LoopDetectionResult::exact_repeat("read_repo_file", 3);
    assert_snapshot!(exact.message, @"Tool 'read_repo_file' called 3 times in a row with identical arguments");

    let sequence = LoopDetectionResult::sequence_loop(&["a", "b", "c"]);
    assert_snapshot!(sequence.message, @"Repeating tool sequence detected: a → b → c");

    let limit = LoopDetectionResult::step_limit(10, 10);
    assert_snapshot!(limit.message, @"Step limit reached: 10 tool calls (max 10)");
}

#[test]
fn test_action_wire_format_snapshot() -> serde_json::Result<()> {
    let inject = GuardrailAction::InjectMessage {
        message: "stop".to_string(),
    };
    assert_snapshot!(serde_json::to_string(&inject)?, @r#"{"action":"inject-message","message":"stop"}"#);
    assert_snapshot!(serde_json::to_string(&GuardrailAction::Continue)?, @r#"{"action":"continue"}"#);
    Ok(())
}
