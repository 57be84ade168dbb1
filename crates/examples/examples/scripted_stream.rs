//! Scripted stream example
//!
//! Drives the full pipeline without any agent CLI installed: a shell script
//! replays a short NDJSON session, and the activity it produces is collected
//! in an in-memory log.

use anyhow::Result;
use futures_util::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use glyx_core::{
    ActivityContext, ActivityLog, ActivityPublisher, AgentConfig, ArgSpec, ComposableAgent,
    StreamOptions, TaskConfig,
};
use glyx_examples::init_tracing;

const SESSION: &str = r#"
printf '%s\n' '{"type":"system","subtype":"init","cwd":"/tmp","model":"demo","session_id":"demo-1"}'
printf '%s\n' '{"type":"thinking","subtype":"delta","text":"Looking at "}'
printf '%s\n' '{"type":"thinking","subtype":"delta","text":"the repository"}'
printf '%s\n' '{"type":"thinking","subtype":"completed"}'
printf '%s\n' '{"type":"tool_call","subtype":"started","tool_call":{"shellToolCall":{"args":{"command":"cargo test"}}}}'
echo 'compiling...'
echo 'warning: unused variable' 1>&2
printf '%s\n' '{"type":"assistant","message":{"content":[{"type":"text","text":"All tests pass."}]}}'
printf '%s\n' '{"type":"result","subtype":"success","result":"done","duration_ms":1200}'
"#;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AgentConfig::new("scripted", "sh")
        .with_description("Replays a recorded NDJSON session")
        .with_arg(ArgSpec::flag("script", "-c"));
    let agent = ComposableAgent::new(config)?;

    let mut task = TaskConfig::new();
    task.insert("prompt".to_string(), json!("Run the test suite"));
    task.insert("script".to_string(), json!(SESSION));

    let log = ActivityLog::new();
    let (publisher, worker) = ActivityPublisher::spawn(Arc::new(log.clone()), 64);
    let options = StreamOptions::new()
        .with_timeout(Duration::from_secs(10))
        .with_context(ActivityContext::new("demo-org"))
        .with_publisher(publisher);

    let mut events = agent.execute_stream(&task, options)?;
    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event)?);
    }
    drop(events);
    worker.await?;

    println!("\n=== Activity ===");
    for record in log.records().await {
        println!("{:?}: {}", record.record_type, record.content);
    }

    Ok(())
}
