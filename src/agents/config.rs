//! Configuration types for the orchestration system

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmProviderConfig {
    /// Provider type
    #[serde(default)]
    pub provider: LlmProviderType,
    /// Model name/identifier
    pub model: String,
    /// Environment variable containing the API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Custom base URL (for self-hosted or proxied endpoints)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default temperature for completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Default max tokens for completions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProviderType::OpenAI,
            model: default_model(),
            api_key_env: None,
            base_url: None,
            temperature: None,
            max_tokens: None,
        }
    }
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderType {
    /// OpenAI chat completions API
    #[default]
    OpenAI,
    /// Ollama through its OpenAI compatible endpoint
    Ollama,
}

impl std::fmt::Display for LlmProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmProviderType::OpenAI => write!(f, "openai"),
            LlmProviderType::Ollama => write!(f, "ollama"),
        }
    }
}

/// Limits applied to every `ask`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrchestratorConfig {
    /// Maximum model round trips in one cycle
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Deadline for a whole cycle in seconds (0 disables it)
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    /// Deadline for a single completion call in seconds (0 disables it)
    #[serde(default = "default_completion_timeout")]
    pub completion_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            timeout_seconds: default_timeout(),
            completion_timeout_seconds: default_completion_timeout(),
        }
    }
}

fn default_max_iterations() -> u32 {
    10
}

fn default_timeout() -> u64 {
    300
}

fn default_completion_timeout() -> u64 {
    120
}

/// Conversation history configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConversationConfig {
    /// Token ceiling above which the history is summarised
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> u32 {
    2000
}

/// Hook limits
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LimitsConfig {
    /// Completion calls allowed per session before the call limiter answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_calls: Option<u32>,
}

/// Which named provider each consumer uses; unset entries use `[llm]`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelRoutingConfig {
    /// Orchestration rounds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orchestrator: Option<String>,
    /// History summaries of the token limited conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// The SQL assistant's own cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    /// Schema explanations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_schema: Option<String>,
    /// Natural language to SQL rewriting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
}

impl ModelRoutingConfig {
    /// Every routed name with the key it was configured under
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("orchestrator", &self.orchestrator),
            ("conversation", &self.conversation),
            ("summary", &self.summary),
            ("sql", &self.sql),
            ("sql_schema", &self.sql_schema),
            ("sql_query", &self.sql_query),
        ]
        .into_iter()
        .filter_map(|(key, name)| name.as_deref().map(|name| (key, name)))
        .collect()
    }
}

/// A database reachable by the SQL assistant
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Name shown to the model
    pub name: String,
    /// Connection URL (sqlite://...)
    pub url: String,
}

/// External media tools
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: PathBuf,
    #[serde(default = "default_whisper")]
    pub whisper: PathBuf,
    #[serde(default = "default_whisper_model")]
    pub whisper_model: String,
    /// Directory receiving transcripts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            whisper: default_whisper(),
            whisper_model: default_whisper_model(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_ffmpeg() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_whisper() -> PathBuf {
    PathBuf::from("whisper")
}

fn default_whisper_model() -> String {
    "tiny".to_string()
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("orchestrator-media")
}
