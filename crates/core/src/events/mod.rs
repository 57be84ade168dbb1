//! Typed model of the NDJSON protocol spoken by agent CLIs
//!
//! Every stdout line is either a JSON object with a `type` field or plain
//! text. [`classify_line`] turns a line into a [`Classified`] value without
//! ever failing: unknown or malformed objects degrade to
//! [`AgentEvent::Unknown`], and non-JSON lines pass through as raw text.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub mod stream;
pub mod thinking;
pub mod tools;

pub use stream::StreamEvent;
pub use thinking::{ThinkingAction, ThinkingSpan};
pub use tools::{ToolCallPayload, ToolKind};

/// Session metadata emitted once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemEvent {
    pub subtype: String,
    pub cwd: String,
    pub model: String,
    #[serde(rename = "apiKeySource")]
    pub api_key_source: String,
    #[serde(rename = "permissionMode")]
    pub permission_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Default for SystemEvent {
    fn default() -> Self {
        Self {
            subtype: "init".to_string(),
            cwd: String::new(),
            model: String::new(),
            api_key_source: String::new(),
            permission_mode: "default".to_string(),
            session_id: None,
        }
    }
}

/// Echo of the prompt sent to the agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserEvent {
    pub message: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingSubtype {
    #[default]
    Delta,
    Completed,
}

/// Fragment or end marker of a reasoning stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkingEvent {
    pub subtype: ThinkingSubtype,
    pub text: String,
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Assistant message with content blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantEvent {
    pub message: Map<String, Value>,
    pub model_call_id: String,
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl AssistantEvent {
    /// Concatenated `text` of every content block
    pub fn text(&self) -> String {
        let Some(Value::Array(blocks)) = self.message.get("content") else {
            return String::new();
        };
        blocks
            .iter()
            .filter_map(|block| block.get("text").and_then(Value::as_str))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallSubtype {
    #[default]
    Started,
    Completed,
}

/// Start or completion of one tool invocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCallEvent {
    pub subtype: ToolCallSubtype,
    pub call_id: String,
    pub tool_call: ToolCallPayload,
    pub model_call_id: String,
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ToolCallEvent {
    pub fn tool_name(&self) -> String {
        self.tool_call.tool_name()
    }

    pub fn preview(&self) -> String {
        self.tool_call.preview()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSubtype {
    #[default]
    Success,
    Error,
}

/// Final outcome reported by the agent before it exits
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultEvent {
    pub subtype: ResultSubtype,
    pub result: String,
    pub is_error: bool,
    pub duration_ms: u64,
    pub duration_api_ms: u64,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Minimal record for objects that match no known shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseEvent {
    pub event_type: String,
    pub session_id: Option<String>,
}

/// One classified line of agent output
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    System(SystemEvent),
    User(UserEvent),
    Thinking(ThinkingEvent),
    Assistant(AssistantEvent),
    ToolCall(ToolCallEvent),
    Result(ResultEvent),
    Unknown(BaseEvent),
}

impl AgentEvent {
    /// Dispatch a parsed JSON object on its `type` field
    pub fn from_value(value: Value) -> Self {
        let base = BaseEvent {
            event_type: value
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            session_id: value
                .get("session_id")
                .and_then(Value::as_str)
                .map(str::to_string),
        };

        let parsed = match base.event_type.as_str() {
            "system" => serde_json::from_value(value).map(Self::System),
            "user" => serde_json::from_value(value).map(Self::User),
            "thinking" => serde_json::from_value(value).map(Self::Thinking),
            "assistant" => serde_json::from_value(value).map(Self::Assistant),
            "tool_call" => serde_json::from_value(value).map(Self::ToolCall),
            "result" => serde_json::from_value(value).map(Self::Result),
            _ => return Self::Unknown(base),
        };

        parsed.unwrap_or_else(|e| {
            tracing::debug!(event_type = %base.event_type, error = %e, "Event does not match its schema");
            Self::Unknown(base)
        })
    }

    /// The wire `type` string
    pub fn event_type(&self) -> &str {
        match self {
            Self::System(_) => "system",
            Self::User(_) => "user",
            Self::Thinking(_) => "thinking",
            Self::Assistant(_) => "assistant",
            Self::ToolCall(_) => "tool_call",
            Self::Result(_) => "result",
            Self::Unknown(base) => &base.event_type,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::System(e) => e.session_id.as_deref(),
            Self::User(e) => e.session_id.as_deref(),
            Self::Thinking(e) => e.session_id.as_deref(),
            Self::Assistant(e) => e.session_id.as_deref(),
            Self::ToolCall(e) => e.session_id.as_deref(),
            Self::Result(e) => e.session_id.as_deref(),
            Self::Unknown(e) => e.session_id.as_deref(),
        }
    }

    /// Plain nested mapping in wire shape, `type` first
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        let body = match self {
            Self::System(e) => serde_json::to_value(e)?,
            Self::User(e) => serde_json::to_value(e)?,
            Self::Thinking(e) => serde_json::to_value(e)?,
            Self::Assistant(e) => serde_json::to_value(e)?,
            Self::ToolCall(e) => serde_json::to_value(e)?,
            Self::Result(e) => serde_json::to_value(e)?,
            Self::Unknown(e) => {
                let mut body = Map::new();
                if let Some(session_id) = &e.session_id {
                    body.insert("session_id".to_string(), Value::String(session_id.clone()));
                }
                Value::Object(body)
            }
        };

        let mut object = Map::new();
        object.insert("type".to_string(), Value::String(self.event_type().to_string()));
        if let Value::Object(fields) = body {
            object.extend(fields);
        }
        Ok(Value::Object(object))
    }
}

impl Serialize for AgentEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error as _;
        let value = self.to_value().map_err(S::Error::custom)?;
        value.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AgentEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

/// Result of classifying one stdout line
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Event(AgentEvent),
    /// Not a JSON object; the trimmed line as written
    Raw(String),
}

/// Classify one line of stdout
pub fn classify_line(line: &str) -> Classified {
    let line = line.trim_end();
    match serde_json::from_str::<Value>(line) {
        Ok(value @ Value::Object(_)) => Classified::Event(AgentEvent::from_value(value)),
        _ => Classified::Raw(line.to_string()),
    }
}
