//! # glyx-core
//!
//! Runs CLI coding agents (Cursor, Claude, Aider, Codex, Grok, ...) as
//! subprocesses and turns their output into a typed, cancellable event stream.
//!
//! ## Features
//!
//! - Declarative agent configs (JSON) compiled into command lines, with
//!   positional, boolean, variadic, choice-checked and env-backed arguments
//! - Concurrent stdout/stderr draining from a managed process group
//! - NDJSON classification into [`AgentEvent`] with raw-text fallback
//! - Thinking-span aggregation
//! - Activity records delivered to an injected [`ActivitySink`] without
//!   blocking the stream
//!
//! ## Quick Start
//!
//! ```ignore
//! use futures_util::StreamExt;
//! use glyx_core::{AgentKey, ComposableAgent, StreamOptions};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let agent = ComposableAgent::from_key(AgentKey::Cursor)?;
//!
//!     let mut task = serde_json::Map::new();
//!     task.insert("prompt".into(), "Fix the failing test".into());
//!
//!     let options = StreamOptions::new().with_timeout(Duration::from_secs(600));
//!     let mut events = agent.execute_stream(&task, options)?;
//!     while let Some(event) = events.next().await {
//!         println!("{}", serde_json::to_string(&event)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ### Recording activity
//!
//! ```ignore
//! use glyx_core::{ActivityContext, ActivityLog, ActivityPublisher, StreamOptions};
//! use std::sync::Arc;
//!
//! let log = ActivityLog::new();
//! let options = StreamOptions::new()
//!     .with_context(ActivityContext::new("org-123"))
//!     .with_publisher(ActivityPublisher::new(Arc::new(log.clone())));
//! ```

pub mod activity;
pub mod agent;
pub mod events;

pub use activity::{
    ActivityContext, ActivityLog, ActivityPublisher, ActivityRecord, ActivitySink, ActivityType,
    SinkError,
};

pub use agent::{
    AgentConfig, AgentError, AgentKey, AgentResult, ArgSpec, ArgType, ComposableAgent,
    ConfigError, ExecuteOptions, ExitResult, StreamOptions, TaskConfig,
};

pub use events::{
    classify_line, AgentEvent, Classified, StreamEvent, ThinkingAction, ThinkingSpan,
    ToolCallPayload, ToolKind,
};
