use anyhow::Result;
use dotenvy::dotenv;
use oxide_guardrails::{GuardrailsConfig, SessionEvent, SessionEventHandler};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_tracing();

    let config = GuardrailsConfig::from_env();
    info!(
        max_tool_calls = config.tracker.max_tool_calls,
        max_consecutive_repeats = config.tracker.max_consecutive_repeats,
        min_sequence_length = config.tracker.min_sequence_length,
        on_loop_action = %config.on_loop_action,
        "Replaying session events"
    );

    let mut handler = SessionEventHandler::with_config(config);
    let mut lines = BufReader::new(io::stdin()).lines();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }
        match SessionEvent::from_json(&line) {
            Ok(event) => {
                handler.handle(&event);
            }
            Err(err) => warn!(line = line_number, error = %err, "Skipping undecodable event"),
        }
    }

    let report = handler.report();
    info!(
        session_id = %report.session_id,
        tool_calls = report.tool_call_count,
        aborted = report.aborted,
        "Replay finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
