//! Unit tests for agent module

use super::*;
use crate::activity::{
    ActivityContext, ActivityLog, ActivityPublisher, ActivityRecord, ActivitySink, ActivityType,
    SinkError,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::{json, Value};
use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

fn task(value: Value) -> TaskConfig {
    match value {
        Value::Object(map) => map,
        _ => panic!("task must be an object"),
    }
}

/// Agent running `sh -c <script>`
fn shell_agent() -> ComposableAgent {
    let config = AgentConfig::new("shell", "sh").with_arg(ArgSpec::flag("script", "-c"));
    ComposableAgent::new(config).unwrap()
}

fn script(script: &str) -> TaskConfig {
    task(json!({ "script": script }))
}

async fn collect(agent: &ComposableAgent, task: &TaskConfig, options: StreamOptions) -> Vec<StreamEvent> {
    agent.execute_stream(task, options).unwrap().collect().await
}

#[cfg(unix)]
fn is_running(pid: &str) -> bool {
    std::process::Command::new("kill")
        .args(["-0", pid])
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[test]
fn test_builtin_configs_load() {
    for key in AgentKey::ALL {
        let config = AgentConfig::builtin(key).unwrap();
        assert_eq!(config.agent_key, key.as_str());
        assert!(!config.command.is_empty());
        assert!(config.args.iter().any(|a| a.name == "prompt"), "{key} has no prompt arg");
    }
}

#[test]
fn test_builtin_cursor_command() {
    let agent = ComposableAgent::from_key(AgentKey::Cursor).unwrap();
    let command = agent
        .build_command(&task(json!({"prompt": "Fix it", "model": "sonnet-4.5"})))
        .unwrap();

    assert_eq!(command[0], "cursor-agent");
    assert_eq!(command[1], "Fix it");
    assert!(command.contains(&"--print".to_string()));
    assert!(command.windows(2).any(|w| w == ["--output-format", "stream-json"]));
    assert!(command.windows(2).any(|w| w == ["--model", "sonnet-4.5"]));
}

#[test]
fn test_agent_key_aliases() {
    assert_eq!(AgentKey::from_agent_type("claude-code"), Some(AgentKey::Claude));
    assert_eq!(AgentKey::from_agent_type("Cursor-Agent"), Some(AgentKey::Cursor));
    assert_eq!("codex".parse::<AgentKey>().unwrap(), AgentKey::Codex);
    assert!(matches!(
        "gemini".parse::<AgentKey>(),
        Err(ConfigError::UnknownAgentKey(key)) if key == "gemini"
    ));
}

#[test]
fn test_config_from_file_with_map_args() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "mytool": {{
                "command": "mytool",
                "description": "A test tool",
                "args": {{
                    "prompt": {{"flag": "--message", "required": true}},
                    "model": {{"flag": "--model", "default": "gpt-4"}},
                    "yes": {{"flag": "--yes", "type": "bool", "default": true}}
                }}
            }}
        }}"#
    )
    .unwrap();

    let agent = ComposableAgent::from_file(file.path()).unwrap();
    assert_eq!(agent.agent_key(), "mytool");
    assert_eq!(agent.config().description, "A test tool");

    let names: Vec<&str> = agent.config().args.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["prompt", "model", "yes"]);

    let command = agent.build_command(&task(json!({"prompt": "hi"}))).unwrap();
    assert_eq!(command, vec!["mytool", "--message", "hi", "--model", "gpt-4", "--yes"]);
}

#[test]
fn test_config_from_file_with_list_args() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"lister": {{"command": "ls", "args": [{{"name": "path", "positional": true}}]}}}}"#
    )
    .unwrap();

    let config = AgentConfig::from_file(file.path()).unwrap();
    assert_eq!(config.args.len(), 1);
    assert!(config.args[0].positional);
}

#[test]
fn test_config_errors() {
    let missing = AgentConfig::from_file("/definitely/not/here.json");
    assert!(matches!(missing, Err(ConfigError::Read { .. })));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{{ not json").unwrap();
    assert!(matches!(
        AgentConfig::from_file(file.path()),
        Err(ConfigError::Parse { .. })
    ));

    let bad_type = AgentConfig::from_value(json!({
        "agent_key": "x",
        "command": "x",
        "args": {"a": {"flag": "-a", "type": "list"}}
    }));
    assert!(matches!(bad_type, Err(ConfigError::Parse { .. })));

    let empty = ComposableAgent::from_value(json!({"agent_key": "empty", "command": ""}));
    assert!(matches!(
        empty,
        Err(AgentError::Config(ConfigError::EmptyCommand { .. }))
    ));
}

#[test]
fn test_config_from_row_value() {
    let agent = ComposableAgent::from_value(json!({
        "agent_key": "row_agent",
        "command": "echo",
        "args": {"text": {"flag": ""}},
        "capabilities": ["chat"]
    }))
    .unwrap();

    assert_eq!(agent.config().capabilities, vec!["chat"]);
    assert_eq!(
        agent.build_command(&task(json!({"text": "hello"}))).unwrap(),
        vec!["echo", "hello"]
    );
}

#[test]
fn test_agent_result_success_and_output() {
    let mut result = AgentResult {
        stdout: "done".to_string(),
        stderr: String::new(),
        exit_code: 0,
        timed_out: false,
        execution_time: 0.1,
        command: vec!["x".to_string()],
    };
    assert!(result.success());
    assert_eq!(result.output(), "done");

    result.stderr = "warning".to_string();
    assert_eq!(result.output(), "done\nSTDERR: warning");

    result.timed_out = true;
    assert!(!result.success());

    result.timed_out = false;
    result.exit_code = 1;
    assert!(!result.success());
}

#[test]
fn test_agent_error_display() {
    let err = AgentError::from(ConfigError::InvalidChoice {
        arg: "mode".to_string(),
        value: "yolo".to_string(),
        choices: vec!["plan".to_string()],
    });
    assert_eq!(
        err.to_string(),
        "Configuration error: Invalid value 'yolo' for mode. Must be one of: [\"plan\"]"
    );

    let err = AgentError::SpawnError("no such file".to_string());
    assert_eq!(err.to_string(), "Agent spawn failed: no such file");
}

#[tokio::test]
async fn test_choice_violation_fails_before_spawn() {
    let config = AgentConfig::new("picky", "definitely-not-a-real-binary-glyx").with_arg(
        ArgSpec::flag("mode", "--mode").with_choices(["a", "b"]),
    );
    let agent = ComposableAgent::new(config).unwrap();

    let result = agent.execute_stream(&task(json!({"mode": "c"})), StreamOptions::new());
    assert!(matches!(
        result,
        Err(AgentError::Config(ConfigError::InvalidChoice { .. }))
    ));
}

#[tokio::test]
async fn test_missing_binary_is_reported_before_streaming() {
    let agent =
        ComposableAgent::new(AgentConfig::new("ghost", "definitely-not-a-real-binary-glyx")).unwrap();
    let result = agent.execute_stream(&TaskConfig::new(), StreamOptions::new());
    assert!(matches!(result, Err(AgentError::SpawnError(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn test_silent_process_yields_single_complete() {
    let events = collect(&shell_agent(), &script("exit 0"), StreamOptions::new()).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::AgentComplete { exit_code, model, .. } => {
            assert_eq!(*exit_code, 0);
            assert_eq!(model, "gpt-5");
        }
        other => panic!("Expected agent_complete, got {other:?}"),
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_stream_classifies_each_line() {
    let script = script(
        r#"printf '%s\n' '{"type":"tool_call","subtype":"started","tool_call":{"shellToolCall":{"args":{"command":"ls -la"}}}}'
echo 'plain text line'
echo 'something went wrong' 1>&2
exit 3"#,
    );
    let events = collect(&shell_agent(), &script, StreamOptions::new()).await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events.last(), Some(StreamEvent::AgentComplete { exit_code: 3, .. })));

    let tool = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::AgentEvent { event: crate::events::AgentEvent::ToolCall(call), .. } => Some(call),
            _ => None,
        })
        .unwrap();
    assert_eq!(tool.tool_name(), "shell: ls -la");

    assert!(events.iter().any(|e| matches!(
        e,
        StreamEvent::AgentOutput { content, .. } if content == "plain text line"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        StreamEvent::AgentError { content, .. } if content == "something went wrong"
    )));
}

#[cfg(unix)]
#[tokio::test]
async fn test_stdout_order_is_preserved() {
    let events = collect(
        &shell_agent(),
        &script("for i in 1 2 3 4 5 6 7 8 9 10; do echo line-$i; done"),
        StreamOptions::new(),
    )
    .await;

    let lines: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::AgentOutput { content, .. } => Some(content.clone()),
            _ => None,
        })
        .collect();
    let expected: Vec<String> = (1..=10).map(|i| format!("line-{i}")).collect();
    assert_eq!(lines, expected);
}

#[cfg(unix)]
#[tokio::test]
async fn test_timeout_kills_process() {
    let options = StreamOptions::new().with_timeout(Duration::from_millis(500));
    let events = collect(&shell_agent(), &script("echo $$; exec sleep 30"), options).await;

    let pid = match &events[0] {
        StreamEvent::AgentOutput { content, .. } => content.clone(),
        other => panic!("Expected pid output, got {other:?}"),
    };
    match events.last() {
        Some(StreamEvent::AgentTimeout { timeout_secs, .. }) => assert_eq!(*timeout_secs, 0.5),
        other => panic!("Expected agent_timeout, got {other:?}"),
    }
    assert!(!events.iter().any(|e| matches!(e, StreamEvent::AgentComplete { .. })));
    assert!(!is_running(&pid));
}

#[cfg(unix)]
#[tokio::test]
async fn test_dropping_stream_kills_process() {
    let mut stream = shell_agent()
        .execute_stream(&script("echo $$; exec sleep 30"), StreamOptions::new())
        .unwrap();

    let pid = match stream.next().await {
        Some(StreamEvent::AgentOutput { content, .. }) => content,
        other => panic!("Expected pid output, got {other:?}"),
    };
    drop(stream);

    let mut stopped = false;
    for _ in 0..50 {
        if !is_running(&pid) {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(stopped, "process {pid} still running after the stream was dropped");
}

#[cfg(unix)]
#[tokio::test]
async fn test_stream_publishes_activity() {
    let log = ActivityLog::new();
    let (publisher, worker) = ActivityPublisher::spawn(Arc::new(log.clone()), 16);
    let options = StreamOptions::new()
        .with_context(ActivityContext::new("org-1").with_org_name("Acme"))
        .with_publisher(publisher);

    let task = task(json!({
        "prompt": "Refactor the parser\nwith details",
        "script": r#"printf '%s\n' '{"type":"thinking","subtype":"delta","text":"a"}' '{"type":"thinking","subtype":"delta","text":"b"}' '{"type":"thinking","subtype":"completed"}' '{"type":"result","subtype":"success","result":"merged","duration_ms":2000}'"#,
    }));
    let agent = ComposableAgent::new(
        AgentConfig::new("shell", "sh").with_arg(ArgSpec::flag("script", "-c")),
    )
    .unwrap();

    let events = collect(&agent, &task, options).await;
    assert_eq!(events.len(), 5);
    worker.await.unwrap();

    let records = log.records().await;
    let summary: Vec<(ActivityType, &str)> = records
        .iter()
        .map(|r| (r.record_type, r.content.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (ActivityType::Message, "Refactor the parser"),
            (ActivityType::Thinking, "ab"),
            (ActivityType::Deployment, "merged"),
        ]
    );
    assert!(records.iter().all(|r| r.actor == "shell" && r.org_name.as_deref() == Some("Acme")));
}

#[cfg(unix)]
#[tokio::test]
async fn test_extra_env_reaches_child() {
    let options = StreamOptions::new().with_github_token("ghp_test");
    let events = collect(&shell_agent(), &script("echo $GITHUB_TOKEN $GH_TOKEN"), options).await;

    assert!(matches!(
        &events[0],
        StreamEvent::AgentOutput { content, .. } if content == "ghp_test ghp_test"
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_execute_collects_output() {
    let result = shell_agent()
        .execute(&script("echo one; echo two; echo oops 1>&2"), ExecuteOptions::new())
        .await
        .unwrap();

    assert!(result.success());
    assert_eq!(result.stdout, "one\ntwo");
    assert_eq!(result.stderr, "oops");
    assert_eq!(result.command[0], "sh");
}

#[cfg(unix)]
#[tokio::test]
async fn test_execute_reports_exit_code() {
    let result = shell_agent()
        .execute(&script("exit 7"), ExecuteOptions::new())
        .await
        .unwrap();

    assert_eq!(result.exit_code, 7);
    assert!(!result.timed_out);
    assert!(!result.success());
}

#[cfg(unix)]
#[tokio::test]
async fn test_execute_timeout_keeps_partial_output() {
    let options = ExecuteOptions::new().with_timeout(Duration::from_millis(500));
    let result = shell_agent()
        .execute(&script("echo started; exec sleep 30"), options)
        .await
        .unwrap();

    assert!(result.timed_out);
    assert_eq!(result.exit_code, -1);
    assert_eq!(result.stdout, "started");
    assert!(!result.success());
    assert!(result.execution_time < 5.0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_working_dir_from_task() {
    let dir = tempfile::tempdir().unwrap();
    let task = task(json!({
        "script": "pwd",
        "working_dir": dir.path().to_str().unwrap(),
    }));

    let result = shell_agent().execute(&task, ExecuteOptions::new()).await.unwrap();
    assert_eq!(
        std::fs::canonicalize(&result.stdout).unwrap(),
        std::fs::canonicalize(dir.path()).unwrap()
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_unbounded_timeout_runs_to_completion() {
    let options = StreamOptions::new().with_timeout(Duration::MAX);
    let events = collect(&shell_agent(), &script("echo hi"), options).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], StreamEvent::AgentOutput { content, .. } if content == "hi"));
    assert!(matches!(events[1], StreamEvent::AgentComplete { exit_code: 0, .. }));

    let result = shell_agent()
        .execute(&script("echo hi"), ExecuteOptions::new().with_timeout(Duration::MAX))
        .await
        .unwrap();
    assert_eq!(result.stdout, "hi");
    assert!(!result.timed_out);
}

struct SlowSink;

#[async_trait]
impl ActivitySink for SlowSink {
    async fn record(&self, _record: ActivityRecord) -> Result<(), SinkError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(())
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_slow_sink_does_not_delay_stream() {
    let (publisher, _worker) = ActivityPublisher::spawn(Arc::new(SlowSink), 16);
    let options = StreamOptions::new()
        .with_context(ActivityContext::new("org-1"))
        .with_publisher(publisher);
    let task = task(json!({
        "prompt": "Summarize",
        "script": r#"printf '%s\n' '{"type":"assistant","message":{"content":[{"type":"text","text":"one"}]}}' '{"type":"assistant","message":{"content":[{"type":"text","text":"two"}]}}' '{"type":"result","subtype":"success","result":"done","duration_ms":10}'"#,
    }));

    let started = std::time::Instant::now();
    let events = collect(&shell_agent(), &task, options).await;

    assert_eq!(events.len(), 4);
    assert!(matches!(events.last(), Some(StreamEvent::AgentComplete { exit_code: 0, .. })));
    assert!(started.elapsed() < Duration::from_secs(3));
}
