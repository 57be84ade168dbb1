//! Command-line arguments shared by the example binaries

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glyx_core::{ActivityContext, AgentKey, ComposableAgent, TaskConfig};

#[derive(Parser, Debug, Clone)]
#[command(about = "Run a CLI coding agent on a prompt")]
pub struct Invocation {
    /// Built-in agent key (cursor, claude, aider, codex, grok) or path to a config file
    pub agent: String,

    /// Task prompt
    pub prompt: String,

    /// Timeout in seconds
    #[arg(long, default_value = "600", value_parser = parse_timeout)]
    pub timeout: Duration,

    /// Model passed to the agent
    #[arg(long)]
    pub model: Option<String>,

    /// Working directory for the agent process
    #[arg(long)]
    pub cwd: Option<String>,

    /// Organization id; enables activity records
    #[arg(long)]
    pub org: Option<String>,

    #[arg(long)]
    pub org_name: Option<String>,

    /// Append activity records to this JSONL file instead of stderr
    #[arg(long)]
    pub activity_log: Option<PathBuf>,

    /// Extra task value; VALUE is parsed as JSON, falling back to a plain string
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_task_value)]
    pub values: Vec<(String, Value)>,
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw.parse().map_err(|_| format!("not a number: {raw}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

fn parse_task_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw}"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

impl Invocation {
    /// Task values: the prompt, `--model`, `--cwd`, then every `--set` in order
    pub fn task(&self) -> TaskConfig {
        let mut task = TaskConfig::new();
        task.insert("prompt".to_string(), Value::String(self.prompt.clone()));
        if let Some(model) = &self.model {
            task.insert("model".to_string(), Value::String(model.clone()));
        }
        if let Some(cwd) = &self.cwd {
            task.insert("working_dir".to_string(), Value::String(cwd.clone()));
        }
        for (key, value) in &self.values {
            task.insert(key.clone(), value.clone());
        }
        task
    }

    pub fn context(&self) -> Option<ActivityContext> {
        let context = ActivityContext::new(self.org.clone()?);
        Some(match &self.org_name {
            Some(name) => context.with_org_name(name.clone()),
            None => context,
        })
    }

    /// Load the agent from a config file if `agent` names one, else from the built-ins
    pub fn load_agent(&self) -> Result<ComposableAgent> {
        let path = Path::new(&self.agent);
        if path.extension().is_some_and(|ext| ext == "json") || path.is_file() {
            return ComposableAgent::from_file(path)
                .with_context(|| format!("loading agent config {}", path.display()));
        }
        let key: AgentKey = self.agent.parse()?;
        Ok(ComposableAgent::from_key(key)?)
    }
}
