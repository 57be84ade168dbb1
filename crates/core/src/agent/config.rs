use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;

use super::error::ConfigError;

/// Per-invocation values (prompt, model, files, working directory, ...)
///
/// Keys are matched against [`ArgSpec::name`] when building the command line.
pub type TaskConfig = serde_json::Map<String, Value>;

/// Value type of a CLI argument
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    #[default]
    String,
    Bool,
    Int,
    Float,
}

/// Declarative description of one command-line argument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArgSpec {
    /// Key looked up in the task config
    pub name: String,

    /// Flag string; empty means the value is appended bare
    pub flag: String,

    #[serde(rename = "type")]
    pub arg_type: ArgType,

    pub required: bool,

    /// Fallback value; falsy defaults (`false`, `""`, `0`, `null`) count as unset
    pub default: Option<Value>,

    pub description: String,

    pub short_flag: String,

    /// Emitted before all flag arguments, ordered by `position`
    pub positional: bool,

    pub position: u32,

    /// Allowed values; empty means unrestricted
    pub choices: Vec<String>,

    /// List values repeat the flag once per element
    pub variadic: bool,

    /// Environment variable consulted when the task config has no value
    pub env_var: Option<String>,
}

impl ArgSpec {
    /// Create a string argument emitted as `flag value`
    pub fn flag(name: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flag: flag.into(),
            ..Default::default()
        }
    }

    /// Create a positional argument
    pub fn positional(name: impl Into<String>, position: u32) -> Self {
        Self {
            name: name.into(),
            positional: true,
            position,
            ..Default::default()
        }
    }

    /// Set the value type
    pub fn with_type(mut self, arg_type: ArgType) -> Self {
        self.arg_type = arg_type;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Restrict values to a fixed set
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    /// Read the value from an environment variable when the task has none
    pub fn with_env_var(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = Some(env_var.into());
        self
    }

    /// Mark the argument as variadic
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Mark the argument as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Name of the environment fallback, ignoring empty names
    pub fn env_var_name(&self) -> Option<&str> {
        self.env_var.as_deref().filter(|name| !name.is_empty())
    }
}

/// Full description of one wrapped CLI tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent_key: String,

    /// Executable name or path
    pub command: String,

    /// Arguments in declaration order; accepts a `{name: spec}` map or a list
    #[serde(default, deserialize_with = "deserialize_args")]
    pub args: Vec<ArgSpec>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl AgentConfig {
    /// Create a configuration with no arguments
    pub fn new(agent_key: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            agent_key: agent_key.into(),
            command: command.into(),
            args: Vec::new(),
            description: String::new(),
            version: String::new(),
            capabilities: Vec::new(),
        }
    }

    /// Append an argument
    pub fn with_arg(mut self, arg: ArgSpec) -> Self {
        self.args.push(arg);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand {
                agent_key: self.agent_key.clone(),
            });
        }
        Ok(())
    }

    /// Load a config file of the form `{"<agent_key>": {"command": ..., "args": ...}}`
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Loading agent config");
        Self::from_keyed_json(&text, &path.display().to_string())
    }

    /// Build a config from a flat mapping that carries its own `agent_key`
    ///
    /// This is the shape of a stored agent row.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(value).map_err(|source| ConfigError::Parse {
            origin: "value".to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load one of the configs embedded in the crate
    pub fn builtin(key: AgentKey) -> Result<Self, ConfigError> {
        Self::from_keyed_json(key.builtin_json(), &format!("builtin:{key}"))
    }

    fn from_keyed_json(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let parsed: Value = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            origin: origin.to_string(),
            source,
        })?;

        let Value::Object(root) = parsed else {
            return Err(ConfigError::Invalid(format!(
                "{origin}: expected an object keyed by agent name"
            )));
        };
        let Some((agent_key, body)) = root.into_iter().next() else {
            return Err(ConfigError::Invalid(format!("{origin}: no agent defined")));
        };
        let Value::Object(mut body) = body else {
            return Err(ConfigError::Invalid(format!(
                "{origin}: agent '{agent_key}' is not an object"
            )));
        };
        body.insert("agent_key".to_string(), Value::String(agent_key));

        let config: Self =
            serde_json::from_value(Value::Object(body)).map_err(|source| ConfigError::Parse {
                origin: origin.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}

fn deserialize_args<'de, D>(deserializer: D) -> Result<Vec<ArgSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(D::Error::custom))
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(name, item)| {
                let mut spec: ArgSpec = serde_json::from_value(item).map_err(D::Error::custom)?;
                spec.name = name;
                Ok(spec)
            })
            .collect(),
        other => Err(D::Error::custom(format!(
            "args must be a map or a list, got {other}"
        ))),
    }
}

/// Agents that ship with an embedded configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKey {
    Cursor,
    Claude,
    Aider,
    Codex,
    Grok,
}

impl AgentKey {
    pub const ALL: [AgentKey; 5] = [
        AgentKey::Cursor,
        AgentKey::Claude,
        AgentKey::Aider,
        AgentKey::Codex,
        AgentKey::Grok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cursor => "cursor",
            Self::Claude => "claude",
            Self::Aider => "aider",
            Self::Codex => "codex",
            Self::Grok => "grok",
        }
    }

    /// Map an agent type string (as stored on tasks) to a key
    ///
    /// Accepts the aliases used by task producers, e.g. `claude-code`.
    pub fn from_agent_type(agent_type: &str) -> Option<Self> {
        match agent_type.trim().to_ascii_lowercase().as_str() {
            "cursor" | "cursor-agent" => Some(Self::Cursor),
            "claude" | "claude-code" => Some(Self::Claude),
            "aider" => Some(Self::Aider),
            "codex" => Some(Self::Codex),
            "grok" => Some(Self::Grok),
            _ => None,
        }
    }

    fn builtin_json(&self) -> &'static str {
        match self {
            Self::Cursor => include_str!("../../configs/cursor.json"),
            Self::Claude => include_str!("../../configs/claude.json"),
            Self::Aider => include_str!("../../configs/aider.json"),
            Self::Codex => include_str!("../../configs/codex.json"),
            Self::Grok => include_str!("../../configs/grok.json"),
        }
    }
}

impl fmt::Display for AgentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AgentKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_agent_type(s).ok_or_else(|| ConfigError::UnknownAgentKey(s.to_string()))
    }
}
