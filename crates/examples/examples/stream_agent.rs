//! Streaming agent example
//!
//! Runs a built-in agent (or one loaded from a config file) and prints every
//! stream item as one JSON line on stdout. Logs and activity go to stderr.
//!
//! ```text
//! cargo run --bin stream_agent -- cursor "Fix the failing test" --timeout 600 --org my-org
//! ```

use anyhow::Result;
use clap::Parser;
use futures_util::StreamExt;
use std::sync::Arc;

use glyx_core::activity::publisher::DEFAULT_QUEUE_CAPACITY;
use glyx_core::{ActivityPublisher, ActivitySink, StreamEvent, StreamOptions};
use glyx_examples::{init_tracing, Invocation, JsonlFileSink, StderrSink};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let invocation = Invocation::parse();
    let agent = invocation.load_agent()?;

    let sink: Arc<dyn ActivitySink> = match &invocation.activity_log {
        Some(path) => Arc::new(JsonlFileSink::new(path.clone())),
        None => Arc::new(StderrSink),
    };

    let (publisher, worker) = ActivityPublisher::spawn(sink, DEFAULT_QUEUE_CAPACITY);
    let mut options = StreamOptions::new()
        .with_timeout(invocation.timeout)
        .with_publisher(publisher);
    if let Some(context) = invocation.context() {
        options = options.with_context(context);
    }
    if let Ok(token) = std::env::var("GITHUB_TOKEN") {
        options = options.with_github_token(token);
    }

    let mut events = agent.execute_stream(&invocation.task(), options)?;
    let mut exit_code = 0;
    while let Some(event) = events.next().await {
        println!("{}", serde_json::to_string(&event)?);
        match event {
            StreamEvent::AgentComplete { exit_code: code, .. } => exit_code = code,
            StreamEvent::AgentTimeout { .. } => exit_code = 124,
            _ => {}
        }
    }
    drop(events);
    worker.await?;

    std::process::exit(exit_code);
}
