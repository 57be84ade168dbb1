use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during agent operations
#[derive(Debug, Error)]
pub enum AgentError {
    /// Invalid agent configuration or task values, detected before spawning
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Agent spawn failed
    #[error("Agent spawn failed: {0}")]
    SpawnError(String),
}

/// Errors raised while loading an agent configuration or building its command line
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configured command is empty
    #[error("Agent '{agent_key}' has an empty command")]
    EmptyCommand { agent_key: String },

    /// A resolved argument value is not one of the declared choices
    #[error("Invalid value '{value}' for {arg}. Must be one of: {choices:?}")]
    InvalidChoice {
        arg: String,
        value: String,
        choices: Vec<String>,
    },

    /// No built-in configuration exists for the requested agent
    #[error("Unknown agent key: {0}")]
    UnknownAgentKey(String),

    /// Config file could not be read
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config contents are not valid JSON for the expected shape
    #[error("Failed to parse config {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Structurally valid JSON that does not describe an agent
    #[error("Invalid agent config: {0}")]
    Invalid(String),
}
