//! Message and chat history types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ToolCall;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System message (instructions to the LLM)
    System,
    /// User message
    User,
    /// Assistant (LLM) message
    Assistant,
    /// Tool result message
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Message content (text)
    pub content: String,
    /// Tool calls requested by the model (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// ID of the tool call this message is responding to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create an assistant message with tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        let mut message = Self::with_role(Role::Assistant, content);
        if !tool_calls.is_empty() {
            message.tool_calls = Some(tool_calls);
        }
        message
    }

    /// Create a tool result message
    pub fn tool_result(tool_call_id: impl Into<String>, result: &Value) -> Self {
        let mut message = Self::with_role(
            Role::Tool,
            serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string()),
        );
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    /// Tool calls carried by this message, empty when it is plain text
    pub fn calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

/// Ordered, role-tagged list of messages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    messages: Vec<Message>,
}

impl ChatHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message
    pub fn add(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a user turn
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.add(Message::user(content));
    }

    /// Append an assistant turn
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.add(Message::assistant(content));
    }

    /// Append a system turn
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.add(Message::system(content));
    }

    /// Replace every message with a single one
    pub fn replace_all(&mut self, message: Message) {
        self.messages = vec![message];
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Render as `role: content` lines
    pub fn transcript(&self) -> String {
        self.messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Vec<Message>> for ChatHistory {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}
