//! Error types for the orchestration system

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while orchestrating assistants
#[derive(Debug, Error)]
pub enum AgentError {
    /// The model asked for a function that no assistant exposes
    #[error("Function not found: {0}")]
    FunctionNotFound(String),

    /// A registered function failed while executing
    #[error("Function {function} failed with arguments {arguments}: {source}")]
    ExecutorFailure {
        function: String,
        arguments: String,
        #[source]
        source: Box<AgentError>,
    },

    /// A property was read through a throwing accessor but is not set
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    /// Completion service error
    #[error("Completion service error: {0}")]
    Llm(#[from] LlmError),

    /// Two assistants expose the same function name in one cycle
    #[error("Function {function} is exposed by both {first} and {second}")]
    DuplicateFunction {
        function: String,
        first: String,
        second: String,
    },

    /// An assistant with the same name is already registered
    #[error("Assistant already registered: {0}")]
    DuplicateAssistant(String),

    /// Function arguments did not match the declared parameters
    #[error("Invalid arguments for {function}: {reason}")]
    InvalidArguments { function: String, reason: String },

    /// Max iterations reached
    #[error("Max iterations ({0}) reached without completion")]
    MaxIterations(u32),

    /// Timeout
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Cancelled
    #[error("Operation was cancelled")]
    Cancelled,

    /// The assistant is not bound, or its orchestrator was dropped
    #[error("Orchestrator unavailable for assistant {0}")]
    OrchestratorUnavailable(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// External tool error (ffmpeg, whisper, ...)
    #[error("Media toolkit error: {0}")]
    Media(String),

    /// Expression evaluation error
    #[error("Script error: {0}")]
    Script(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors specific to completion service operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider not found
    #[error("LLM provider not found: {0}")]
    ProviderNotFound(String),

    /// API error
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Authentication error
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl AgentError {
    /// Errors that abort the whole cycle and must not be wrapped as executor failures
    pub fn is_interruption(&self) -> bool {
        matches!(self, AgentError::Cancelled | AgentError::Timeout(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::Network(format!("Connection error: {}", err))
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for AgentError {
    fn from(err: std::io::Error) -> Self {
        AgentError::Internal(format!("IO error: {}", err))
    }
}

impl From<sqlx::Error> for AgentError {
    fn from(err: sqlx::Error) -> Self {
        AgentError::Database(err.to_string())
    }
}

impl From<tera::Error> for AgentError {
    fn from(err: tera::Error) -> Self {
        AgentError::Internal(format!("Template error: {}", err))
    }
}

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Result type alias for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;
