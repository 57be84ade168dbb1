//! Public items yielded by [`ComposableAgent::execute_stream`](crate::ComposableAgent::execute_stream)

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::AgentEvent;

/// Model reported when the task does not name one
pub const DEFAULT_MODEL: &str = "gpt-5";

/// One item of the execution stream
///
/// Serializes to a flat mapping tagged by `type`; structured agent events are
/// nested under `event` in their wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Stdout line that is not a JSON object
    AgentOutput { content: String, timestamp: String },

    /// Classified NDJSON event
    AgentEvent { event: AgentEvent, timestamp: String },

    /// Stderr line
    AgentError { content: String, timestamp: String },

    /// Process exited on its own; always the last item of a normal run
    AgentComplete {
        exit_code: i32,
        execution_time: f64,
        model: String,
        timestamp: String,
    },

    /// Deadline passed and the process group was killed
    AgentTimeout {
        timeout_secs: f64,
        execution_time: f64,
        model: String,
        timestamp: String,
    },
}

impl StreamEvent {
    pub fn output(content: impl Into<String>) -> Self {
        Self::AgentOutput {
            content: content.into(),
            timestamp: now(),
        }
    }

    pub fn event(event: AgentEvent) -> Self {
        Self::AgentEvent {
            event,
            timestamp: now(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::AgentError {
            content: content.into(),
            timestamp: now(),
        }
    }

    pub fn complete(exit_code: i32, elapsed: Duration, model: impl Into<String>) -> Self {
        Self::AgentComplete {
            exit_code,
            execution_time: elapsed.as_secs_f64(),
            model: model.into(),
            timestamp: now(),
        }
    }

    pub fn timeout(limit: Duration, elapsed: Duration, model: impl Into<String>) -> Self {
        Self::AgentTimeout {
            timeout_secs: limit.as_secs_f64(),
            execution_time: elapsed.as_secs_f64(),
            model: model.into(),
            timestamp: now(),
        }
    }

    /// The serialized `type` tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AgentOutput { .. } => "agent_output",
            Self::AgentEvent { .. } => "agent_event",
            Self::AgentError { .. } => "agent_error",
            Self::AgentComplete { .. } => "agent_complete",
            Self::AgentTimeout { .. } => "agent_timeout",
        }
    }

    /// Whether this item ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::AgentComplete { .. } | Self::AgentTimeout { .. })
    }

    pub fn timestamp(&self) -> &str {
        match self {
            Self::AgentOutput { timestamp, .. }
            | Self::AgentEvent { timestamp, .. }
            | Self::AgentError { timestamp, .. }
            | Self::AgentComplete { timestamp, .. }
            | Self::AgentTimeout { timestamp, .. } => timestamp,
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
