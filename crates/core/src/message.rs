//! Message and Session domain types.
//!
//! A session is an ordered, append-only log of [`Message`]s. Callers build
//! [`NewMessage`] values; the session store turns them into [`Message`]s by
//! assigning the next sequence number. Nothing else may assign one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// A fresh random session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The agent (model output surfaced to the user)
    Agent,
    /// Tool execution output
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::Tool => "tool",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "agent" => Some(Self::Agent),
            "tool" => Some(Self::Tool),
            _ => None,
        }
    }
}

/// What the payload of a message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    /// Key of a page image (path, URL or index key)
    ImageReference,
    /// JSON-encoded tool call
    ToolCall,
    /// Rendered tool observation
    ToolResult,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::ImageReference => "image_reference",
            Self::ToolCall => "tool_call",
            Self::ToolResult => "tool_result",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image_reference" => Some(Self::ImageReference),
            "tool_call" => Some(Self::ToolCall),
            "tool_result" => Some(Self::ToolResult),
            _ => None,
        }
    }
}

/// A message that has not been written yet. It has no sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMessage {
    pub role: Role,
    pub kind: MessageKind,
    pub content: String,
}

impl NewMessage {
    pub fn new(role: Role, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            role,
            kind,
            content: content.into(),
        }
    }

    /// A user question.
    pub fn user_text(content: impl Into<String>) -> Self {
        Self::new(Role::User, MessageKind::Text, content)
    }

    /// An agent answer.
    pub fn agent_text(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, MessageKind::Text, content)
    }

    /// A page image attached by the user.
    pub fn image_reference(key: impl Into<String>) -> Self {
        Self::new(Role::User, MessageKind::ImageReference, key)
    }

    /// A tool call issued by the agent.
    pub fn tool_call(content: impl Into<String>) -> Self {
        Self::new(Role::Agent, MessageKind::ToolCall, content)
    }

    /// The observation a tool produced.
    pub fn tool_result(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, MessageKind::ToolResult, content)
    }

    /// Seal this message into the log of `session_id` at `sequence_number`.
    ///
    /// Only session stores should call this.
    pub fn into_message(self, session_id: &SessionId, sequence_number: u64) -> Message {
        Message {
            session_id: session_id.clone(),
            sequence_number,
            role: self.role,
            kind: self.kind,
            content: self.content,
            timestamp: Utc::now(),
        }
    }
}

/// A message persisted in a session log. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Owning session
    pub session_id: SessionId,

    /// Position in the session log, assigned by the store (starts at 1)
    pub sequence_number: u64,

    /// Who sent this message
    pub role: Role,

    /// What the payload represents
    pub kind: MessageKind,

    /// Opaque payload
    pub content: String,

    /// Write time (informational only; ordering uses `sequence_number`)
    pub timestamp: DateTime<Utc>,
}
