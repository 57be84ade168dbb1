//! Tool-call payloads nested inside `tool_call` events
//!
//! The wire object carries exactly one key naming the tool family
//! (`shellToolCall`, `readToolCall`, ...). The payload keeps the raw object so
//! it re-serializes unchanged, and derives a [`ToolKind`] used for naming.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Character limit for tool names derived from shell commands
pub const NAME_LIMIT: usize = 50;

/// Character limit for previews of file contents and MCP arguments
pub const PREVIEW_LIMIT: usize = 100;

/// Truncate to `limit` characters, appending `…` when anything was cut
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => format!("{}…", &text[..byte_index]),
        None => text.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellArgs {
    pub command: String,

    #[serde(rename = "workingDirectory", default)]
    pub working_directory: String,

    #[serde(default = "default_shell_timeout")]
    pub timeout: u64,
}

fn default_shell_timeout() -> u64 {
    300_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellToolCall {
    #[serde(default)]
    pub args: Option<ShellArgs>,
    #[serde(default)]
    pub result: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileArgs {
    pub path: String,
}

/// Shared shape of read, write and edit calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileToolCall {
    #[serde(default)]
    pub args: Option<FileArgs>,
    #[serde(default)]
    pub result: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolCall {
    #[serde(rename = "serverLabel", default)]
    pub server_label: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub result: Option<Map<String, Value>>,
}

/// Tool family identified by the nested key
#[derive(Debug, Clone, PartialEq)]
pub enum ToolKind {
    Shell(ShellToolCall),
    Read(FileToolCall),
    Write(FileToolCall),
    Edit(FileToolCall),
    Mcp(McpToolCall),
    /// A nested key outside the known families
    Other { key: String },
    /// No nested key, or a known key whose payload failed validation
    Missing,
}

impl ToolKind {
    fn detect(raw: &Map<String, Value>) -> Self {
        if let Some(value) = present(raw, "shellToolCall") {
            return parse_with_args_or_result::<ShellToolCall>(value, |c| {
                c.args.is_some() || c.result.is_some()
            })
            .map_or(Self::Missing, Self::Shell);
        }
        let file_families: [(&str, fn(FileToolCall) -> Self); 3] = [
            ("readToolCall", Self::Read),
            ("writeToolCall", Self::Write),
            ("editToolCall", Self::Edit),
        ];
        for (key, wrap) in file_families {
            if let Some(value) = present(raw, key) {
                return parse_with_args_or_result::<FileToolCall>(value, |c| {
                    c.args.is_some() || c.result.is_some()
                })
                .map_or(Self::Missing, wrap);
            }
        }
        if let Some(value) = present(raw, "mcpToolCall") {
            return serde_json::from_value::<McpToolCall>(value.clone())
                .map_or(Self::Missing, Self::Mcp);
        }

        raw.iter()
            .find(|(_, value)| !value.is_null())
            .map_or(Self::Missing, |(key, _)| Self::Other { key: key.clone() })
    }
}

fn present<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    raw.get(key).filter(|value| !value.is_null())
}

fn parse_with_args_or_result<T>(value: &Value, valid: impl Fn(&T) -> bool) -> Option<T>
where
    T: for<'de> Deserialize<'de>,
{
    match serde_json::from_value::<T>(value.clone()) {
        Ok(call) if valid(&call) => Some(call),
        Ok(_) => {
            tracing::debug!("Tool call payload has neither args nor result");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "Malformed tool call payload");
            None
        }
    }
}

/// The `tool_call` object of a tool-call event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ToolCallPayload {
    raw: Map<String, Value>,
    kind: ToolKind,
}

impl ToolCallPayload {
    pub fn kind(&self) -> &ToolKind {
        &self.kind
    }

    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Short label for activity feeds, e.g. `shell: ls -la` or `read: src/main.rs`
    pub fn tool_name(&self) -> String {
        match &self.kind {
            ToolKind::Shell(call) => match &call.args {
                Some(args) => format!("shell: {}", truncate(&args.command, NAME_LIMIT)),
                None => "shell".to_string(),
            },
            ToolKind::Read(call) => file_tool_name("read", call),
            ToolKind::Write(call) => file_tool_name("write", call),
            ToolKind::Edit(call) => file_tool_name("edit", call),
            ToolKind::Mcp(call) => match (call.server_label.is_empty(), call.name.is_empty()) {
                (false, false) => format!("{}:{}", call.server_label, call.name),
                (true, false) => call.name.clone(),
                (false, true) => call.server_label.clone(),
                (true, true) => "mcp_tool".to_string(),
            },
            ToolKind::Other { key } => other_tool_name(key),
            ToolKind::Missing => "tool_call".to_string(),
        }
    }

    /// Human-readable detail shown next to the name
    pub fn preview(&self) -> String {
        match &self.kind {
            ToolKind::Shell(call) => call
                .args
                .as_ref()
                .map(|args| args.command.clone())
                .unwrap_or_default(),
            ToolKind::Read(call) => match (&call.args, &call.result) {
                (Some(args), _) => args.path.clone(),
                (None, Some(result)) => result
                    .get("content")
                    .map(|content| match content {
                        Value::String(s) => truncate(s, PREVIEW_LIMIT),
                        Value::Null => String::new(),
                        other => truncate(&other.to_string(), PREVIEW_LIMIT),
                    })
                    .unwrap_or_default(),
                (None, None) => String::new(),
            },
            ToolKind::Write(call) | ToolKind::Edit(call) => call
                .args
                .as_ref()
                .map(|args| args.path.clone())
                .unwrap_or_default(),
            ToolKind::Mcp(call) if call.args.is_empty() => String::new(),
            ToolKind::Mcp(call) => serde_json::to_string(&call.args)
                .map(|json| truncate(&json, PREVIEW_LIMIT))
                .unwrap_or_default(),
            ToolKind::Other { .. } | ToolKind::Missing => String::new(),
        }
    }
}

impl Default for ToolCallPayload {
    fn default() -> Self {
        Self::from(Map::new())
    }
}

impl From<Map<String, Value>> for ToolCallPayload {
    fn from(raw: Map<String, Value>) -> Self {
        let kind = ToolKind::detect(&raw);
        Self { raw, kind }
    }
}

impl From<ToolCallPayload> for Map<String, Value> {
    fn from(payload: ToolCallPayload) -> Self {
        payload.raw
    }
}

fn file_tool_name(verb: &str, call: &FileToolCall) -> String {
    match &call.args {
        Some(args) => format!("{verb}: {}", args.path),
        None => format!("{verb}_file"),
    }
}

/// `listDirToolCall` -> `list_dir`
fn other_tool_name(key: &str) -> String {
    let stem = key.strip_suffix("ToolCall").unwrap_or(key);
    if stem.is_empty() {
        return "tool_call".to_string();
    }

    let mut name = String::with_capacity(stem.len() + 4);
    for (i, ch) in stem.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                name.push('_');
            }
            name.extend(ch.to_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}
