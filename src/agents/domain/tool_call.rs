//! Function call types exchanged with the completion service

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call
    pub id: String,
    /// Name of the function being called
    pub name: String,
    /// Arguments passed to the function (as a JSON object)
    pub arguments: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a tool call with a generated id
    pub fn named(name: impl Into<String>, arguments: Value) -> Self {
        Self::new(Self::generate_id(), name, arguments)
    }

    /// Generate a unique ID for a tool call
    pub fn generate_id() -> String {
        let raw = uuid::Uuid::new_v4().simple().to_string();
        format!("call_{}", &raw[..24])
    }
}

/// Definition of a function offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Function name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema defining the function's parameters
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
