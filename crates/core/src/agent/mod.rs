//! Config-driven agent execution
//!
//! A [`ComposableAgent`] wraps one CLI tool described by an [`AgentConfig`].
//! Each call builds the command line from the task values, spawns the tool as a
//! process group and either collects its output ([`ComposableAgent::execute`])
//! or streams classified events as they arrive
//! ([`ComposableAgent::execute_stream`]).

use std::collections::BTreeMap;
use std::path::Path;

use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

pub mod collector;
pub mod command;
pub mod config;
pub mod error;
pub mod options;
pub mod spawned;
mod stream;

pub use collector::{LineCollector, LineSource, RawLine};
pub use config::{AgentConfig, AgentKey, ArgSpec, ArgType, TaskConfig};
pub use error::{AgentError, ConfigError};
pub use options::{ExecuteOptions, StreamOptions, DEFAULT_TIMEOUT};
pub use spawned::{ExitResult, SpawnOptions, SpawnedAgent};
pub use stream::POLL_INTERVAL;

use crate::events::StreamEvent;
use stream::{ActivityTap, StreamRun};

/// Outcome of a non-streaming execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Stdout lines joined with `\n`
    pub stdout: String,

    /// Stderr lines joined with `\n`
    pub stderr: String,

    /// `-1` when the process was killed or produced no code
    pub exit_code: i32,

    pub timed_out: bool,

    /// Wall-clock seconds from build to exit
    pub execution_time: f64,

    /// Resolved command vector, executable first
    pub command: Vec<String>,
}

impl AgentResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }

    /// Stdout followed by stderr, when there is any
    pub fn output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\nSTDERR: {}", self.stdout, self.stderr)
        }
    }
}

/// A CLI agent driven by a declarative configuration
#[derive(Debug, Clone)]
pub struct ComposableAgent {
    config: AgentConfig,
}

impl ComposableAgent {
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        Ok(Self {
            config: AgentConfig::from_file(path)?,
        })
    }

    /// Agent from one of the embedded configurations
    pub fn from_key(key: AgentKey) -> Result<Self, AgentError> {
        Ok(Self {
            config: AgentConfig::builtin(key)?,
        })
    }

    /// Agent from a row-like mapping (`agent_key`, `command`, `args`, ...)
    pub fn from_value(value: serde_json::Value) -> Result<Self, AgentError> {
        Ok(Self {
            config: AgentConfig::from_value(value)?,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn agent_key(&self) -> &str {
        &self.config.agent_key
    }

    /// The full command line for `task`, executable first
    pub fn build_command(&self, task: &TaskConfig) -> Result<Vec<String>, AgentError> {
        Ok(command::build_command(&self.config, task)?)
    }

    fn spawn_options(task: &TaskConfig, env: BTreeMap<String, String>) -> SpawnOptions {
        SpawnOptions {
            working_dir: options::task_working_dir(task),
            env,
        }
    }

    /// Run to completion and collect output
    ///
    /// A timeout kills the process group and still returns `Ok` with
    /// `timed_out` set and whatever output arrived before the kill.
    pub async fn execute(
        &self,
        task: &TaskConfig,
        options: ExecuteOptions,
    ) -> Result<AgentResult, AgentError> {
        let started = std::time::Instant::now();
        let model = options::task_model(task);
        let command = self.build_command(task)?;

        tracing::info!(
            agent = %self.agent_key(),
            model = %model,
            command = %command.join(" "),
            "Executing agent"
        );

        let mut spawned = SpawnedAgent::spawn(&command, &Self::spawn_options(task, options.env))?;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        let collected = tokio::time::timeout(options.timeout, async {
            while let Some(line) = spawned.lines.recv().await {
                match line.source {
                    LineSource::Stdout => stdout.push(line.text),
                    LineSource::Stderr => stderr.push(line.text),
                }
            }
            (&mut spawned.exit_signal).await
        })
        .await;

        let (exit_code, timed_out) = match collected {
            Ok(exit) => (exit.map_or(-1, |e| e.code_or_sentinel()), false),
            Err(_) => {
                tracing::warn!(
                    agent = %self.agent_key(),
                    timeout_secs = options.timeout.as_secs_f64(),
                    "Agent timed out, killing process group"
                );
                spawned.terminate().await;
                (-1, true)
            }
        };

        let result = AgentResult {
            stdout: stdout.join("\n"),
            stderr: stderr.join("\n"),
            exit_code,
            timed_out,
            execution_time: started.elapsed().as_secs_f64(),
            command,
        };

        tracing::info!(
            agent = %self.agent_key(),
            model = %model,
            exit_code,
            timed_out,
            execution_time = result.execution_time,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "Agent execution finished"
        );

        Ok(result)
    }

    /// Spawn the agent and stream its output as it arrives
    ///
    /// Configuration and spawn failures are returned before the stream exists.
    /// Afterwards every failure mode travels through the stream, which always
    /// ends with exactly one `agent_complete` or `agent_timeout` item. Dropping
    /// the stream early kills the process group.
    pub fn execute_stream(
        &self,
        task: &TaskConfig,
        options: StreamOptions,
    ) -> Result<BoxStream<'static, StreamEvent>, AgentError> {
        let started = tokio::time::Instant::now();
        let model = options::task_model(task);
        let command = self.build_command(task)?;

        tracing::info!(
            agent = %self.agent_key(),
            model = %model,
            command = %command.join(" "),
            "Starting agent stream"
        );

        let tap = ActivityTap::new(options.context, options.publisher);
        tap.started(self.agent_key(), options::task_title(task));

        if options.env.contains_key("GITHUB_TOKEN") {
            tracing::info!(agent = %self.agent_key(), "GitHub token injected");
        }
        let spawned = SpawnedAgent::spawn(&command, &Self::spawn_options(task, options.env))?;
        tracing::info!(agent = %self.agent_key(), pid = ?spawned.pid, "Agent process started");

        Ok(stream::into_stream(
            spawned,
            StreamRun {
                agent_key: self.agent_key().to_string(),
                model,
                timeout: options.timeout,
                started,
                tap,
            },
        ))
    }
}

#[cfg(test)]
mod tests;
