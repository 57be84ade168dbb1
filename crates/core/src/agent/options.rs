//! Per-call execution options

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use super::config::TaskConfig;
use crate::activity::{ActivityContext, ActivityPublisher};
use crate::events::stream::DEFAULT_MODEL;

/// Wall-clock budget used when the caller does not set one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for [`ComposableAgent::execute`](super::ComposableAgent::execute)
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    pub timeout: Duration,

    /// Extra variables for the child, layered over the inherited environment
    pub env: BTreeMap<String, String>,
}

impl ExecuteOptions {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            env: BTreeMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn add_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Expose a GitHub token to the child as `GITHUB_TOKEN` and `GH_TOKEN`
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        insert_github_token(&mut self.env, token.into());
        self
    }
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Options for [`ComposableAgent::execute_stream`](super::ComposableAgent::execute_stream)
#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub timeout: Duration,

    /// Scope for activity records; nothing is published without it
    pub context: Option<ActivityContext>,

    pub env: BTreeMap<String, String>,

    pub publisher: ActivityPublisher,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            context: None,
            env: BTreeMap::new(),
            publisher: ActivityPublisher::disabled(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_context(mut self, context: ActivityContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_publisher(mut self, publisher: ActivityPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn add_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Expose a GitHub token to the child as `GITHUB_TOKEN` and `GH_TOKEN`
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        insert_github_token(&mut self.env, token.into());
        self
    }
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_github_token(env: &mut BTreeMap<String, String>, token: String) {
    env.insert("GITHUB_TOKEN".to_string(), token.clone());
    env.insert("GH_TOKEN".to_string(), token);
}

/// Model name reported in terminal events
pub(crate) fn task_model(task: &TaskConfig) -> String {
    match task.get("model") {
        Some(Value::String(model)) if !model.is_empty() => model.clone(),
        _ => DEFAULT_MODEL.to_string(),
    }
}

/// First line of the prompt, at most 100 characters
pub(crate) fn task_title(task: &TaskConfig) -> Option<String> {
    let prompt = task.get("prompt")?.as_str()?;
    let first_line = prompt.lines().next().unwrap_or_default();
    let title: String = first_line.chars().take(100).collect();
    (!title.is_empty()).then_some(title)
}

/// `working_dir` from the task with a leading `~` expanded
pub(crate) fn task_working_dir(task: &TaskConfig) -> Option<PathBuf> {
    let dir = task.get("working_dir")?.as_str()?;
    if dir.is_empty() {
        return None;
    }
    Some(expand_home(dir, std::env::var("HOME").ok().as_deref()))
}

fn expand_home(path: &str, home: Option<&str>) -> PathBuf {
    match (path, home) {
        ("~", Some(home)) => PathBuf::from(home),
        (path, Some(home)) if path.starts_with("~/") => PathBuf::from(home).join(&path[2..]),
        (path, _) => PathBuf::from(path),
    }
}
