//! Completion service abstraction
//!
//! The orchestrator only talks to models through [`LlmProvider`]:
//! - `OpenAiProvider` for the OpenAI chat completions API (and compatible endpoints)
//! - `ScriptedProvider` replaying canned completions, used by tests and dry runs
//!
//! A [`ProviderRegistry`] holds the named connections assistants pick from.
//!
//! Providers never execute functions themselves; a response is either plain
//! text or a list of function calls that the orchestrator dispatches.

mod openai;
mod registry;
mod scripted;

pub use openai::OpenAiProvider;
pub use registry::{ProviderRegistry, DEFAULT_PROVIDER};
pub use scripted::ScriptedProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::agents::config::{LlmProviderConfig, LlmProviderType};
use crate::agents::domain::{Message, ToolCall, ToolDefinition};
use crate::agents::error::LlmResult;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Complete a request
    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse>;
}

/// Request for LLM completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Messages in the conversation
    pub messages: Vec<Message>,
    /// Model to use (overrides provider default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Functions available for calling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    /// Tool choice mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl CompletionRequest {
    /// Create a request from a single user prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            ..Default::default()
        }
    }

    /// Create a request over existing messages
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Offer functions to the model with the given choice mode
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>, choice: ToolChoice) -> Self {
        if !tools.is_empty() {
            self.tools = Some(tools);
            self.tool_choice = Some(choice);
        }
        self
    }
}

/// Tool choice mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Let the model decide
    Auto,
    /// Don't use tools
    None,
    /// Must use a tool
    Required,
    /// Use a specific tool
    Tool { name: String },
}

/// Response from LLM completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Generated message
    pub message: Message,
    /// Reason the completion stopped
    pub finish_reason: FinishReason,
    /// Token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Model that actually served the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CompletionResponse {
    /// Create a plain text response
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(content),
            finish_reason: FinishReason::Stop,
            usage: None,
            model: None,
        }
    }

    /// Create a response requesting function calls
    pub fn calls(calls: Vec<ToolCall>) -> Self {
        Self {
            message: Message::assistant_with_tools("", calls),
            finish_reason: FinishReason::ToolCalls,
            usage: None,
            model: None,
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Function calls requested by the model, in order
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message.calls()
    }

    /// Text content of the response
    pub fn content(&self) -> &str {
        &self.message.content
    }
}

/// Reason completion stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop
    Stop,
    /// Hit max tokens
    Length,
    /// Tool call requested
    ToolCalls,
    /// Content filtered
    ContentFilter,
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Create an LLM provider from configuration
pub fn create_provider(config: &LlmProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    match config.provider {
        LlmProviderType::OpenAI => {
            let provider = OpenAiProvider::new(config)?;
            Ok(Arc::new(provider))
        }
        LlmProviderType::Ollama => {
            // Ollama doesn't require an API key
            let provider = OpenAiProvider::ollama(config);
            Ok(Arc::new(provider))
        }
    }
}
