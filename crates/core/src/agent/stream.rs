//! The execution stream: drains a spawned agent, classifies its output and
//! fans significant events out to the activity publisher.

use std::time::Duration;

use async_stream::stream;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde_json::json;
use tokio::time::Instant;

use super::collector::{LineSource, RawLine};
use super::spawned::{ExitResult, SpawnedAgent};
use crate::activity::{ActivityContext, ActivityPublisher, ActivityRecord, ActivityType};
use crate::events::tools::truncate;
use crate::events::{classify_line, AgentEvent, Classified, StreamEvent, ThinkingAction, ThinkingSpan};

/// How long one poll of the line queue may wait before re-checking exit and deadline
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Everything the stream needs besides the process itself
pub(super) struct StreamRun {
    pub agent_key: String,
    pub model: String,
    pub timeout: Duration,
    pub started: Instant,
    pub tap: ActivityTap,
}

/// Deadline used when `started + timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(started: Instant, timeout: Duration) -> Instant {
    started
        .checked_add(timeout)
        .unwrap_or_else(|| started + FAR_FUTURE)
}

pub(super) fn into_stream(spawned: SpawnedAgent, run: StreamRun) -> BoxStream<'static, StreamEvent> {
    let guard = spawned.token().drop_guard();

    stream! {
        let _guard = guard;
        let StreamRun { agent_key, model, timeout, started, mut tap } = run;
        let mut spawned = spawned;
        let deadline = deadline_after(started, timeout);
        let mut exit: Option<ExitResult> = None;

        loop {
            let now = Instant::now();
            if now >= deadline {
                tracing::warn!(agent = %agent_key, timeout_secs = timeout.as_secs_f64(), "Agent timed out, killing process group");
                spawned.terminate().await;
                yield StreamEvent::timeout(timeout, started.elapsed(), model);
                return;
            }

            let wait = POLL_INTERVAL.min(deadline.saturating_duration_since(now));
            match tokio::time::timeout(wait, spawned.lines.recv()).await {
                Ok(Some(line)) => {
                    yield tap.handle_line(&agent_key, line);
                }
                Ok(None) => {
                    if exit.is_none() {
                        match tokio::time::timeout_at(deadline, &mut spawned.exit_signal).await {
                            Ok(result) => exit = Some(result.unwrap_or(ExitResult::Interrupted)),
                            Err(_) => continue,
                        }
                    }
                    break;
                }
                Err(_) => {
                    if exit.is_none() {
                        exit = spawned.exit_signal.try_recv().ok();
                    }
                    if exit.is_some() && spawned.lines.is_empty() {
                        break;
                    }
                }
            }
        }

        let exit_code = exit.map_or(-1, |e| e.code_or_sentinel());
        let elapsed = started.elapsed();
        tracing::info!(
            agent = %agent_key,
            model = %model,
            exit_code,
            execution_time = elapsed.as_secs_f64(),
            "Agent stream complete"
        );
        yield StreamEvent::complete(exit_code, elapsed, model);
    }
    .boxed()
}

/// Turns stream items into activity records
///
/// Inactive without a context. Owns the thinking span for one execution.
pub(super) struct ActivityTap {
    context: Option<ActivityContext>,
    publisher: ActivityPublisher,
    span: ThinkingSpan,
}

impl ActivityTap {
    pub fn new(context: Option<ActivityContext>, publisher: ActivityPublisher) -> Self {
        Self {
            context,
            publisher,
            span: ThinkingSpan::new(),
        }
    }

    /// Record the task title before the process starts
    pub fn started(&self, agent_key: &str, title: Option<String>) {
        if let Some(context) = &self.context {
            let content = title.unwrap_or_else(|| "Task started".to_string());
            self.publisher.publish(ActivityRecord::new(
                ActivityType::Message,
                content,
                context,
                agent_key,
            ));
        }
    }

    fn handle_line(&mut self, agent_key: &str, line: RawLine) -> StreamEvent {
        match line.source {
            LineSource::Stderr => {
                tracing::warn!(agent = %agent_key, line = %truncate(&line.text, 100), "Agent stderr");
                StreamEvent::error(line.text)
            }
            LineSource::Stdout => match classify_line(&line.text) {
                Classified::Event(event) => {
                    if matches!(event, AgentEvent::Thinking(_)) {
                        tracing::debug!(agent = %agent_key, "Agent event: thinking");
                    } else {
                        tracing::info!(agent = %agent_key, event_type = %event.event_type(), "Agent event");
                    }
                    self.observe(agent_key, &event, std::time::Instant::now());
                    StreamEvent::event(event)
                }
                Classified::Raw(text) => {
                    tracing::info!(agent = %agent_key, line = %truncate(&text, 100), "Agent output");
                    StreamEvent::output(text)
                }
            },
        }
    }

    /// Publish the record (if any) for one classified event
    pub fn observe(&mut self, agent_key: &str, event: &AgentEvent, now: std::time::Instant) {
        let Some(context) = &self.context else {
            return;
        };

        let record = match event {
            AgentEvent::ToolCall(call) => {
                let name = call.tool_name();
                Some(
                    ActivityRecord::new(ActivityType::ToolCall, name.clone(), context, agent_key)
                        .with_metadata(json!({"tool_name": name, "file_path": call.preview()})),
                )
            }
            AgentEvent::Thinking(thinking) => match self.span.advance(thinking, now) {
                ThinkingAction::Flush { text, duration } => {
                    tracing::info!(
                        agent = %agent_key,
                        duration_secs = duration.as_secs_f64(),
                        chars = text.chars().count(),
                        "Thinking complete"
                    );
                    Some(
                        ActivityRecord::new(ActivityType::Thinking, text, context, agent_key)
                            .with_metadata(json!({"duration_seconds": duration.as_secs_f64()})),
                    )
                }
                ThinkingAction::Buffer | ThinkingAction::Ignore => None,
            },
            AgentEvent::Assistant(assistant) => {
                let text = assistant.text();
                (!text.is_empty())
                    .then(|| ActivityRecord::new(ActivityType::Message, text, context, agent_key))
            }
            AgentEvent::Result(result) => {
                let record_type = if result.is_error {
                    ActivityType::Error
                } else {
                    ActivityType::Deployment
                };
                Some(
                    ActivityRecord::new(record_type, result.result.clone(), context, agent_key)
                        .with_metadata(json!({"duration_seconds": result.duration_ms as f64 / 1000.0})),
                )
            }
            AgentEvent::System(_) | AgentEvent::User(_) | AgentEvent::Unknown(_) => None,
        };

        if let Some(record) = record {
            tracing::debug!(agent = %agent_key, record_type = ?record.record_type, "Publishing activity");
            self.publisher.publish(record);
        }
    }
}
