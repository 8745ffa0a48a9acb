//! Assistant orchestration core
//!
//! An [`Orchestrator`](orchestration::Orchestrator) answers questions by
//! letting a completion model call functions exposed by pluggable
//! assistants, until one of them (or the model) produces the answer.
//!
//! ## Architecture
//!
//! - `domain/` - Messages, function calls, assistant responses
//! - `llm/` - Completion providers (OpenAI-compatible HTTP, scripted)
//! - `session/` - Per-request sessions with wrapping and observation hooks
//! - `assistant/` - The assistant contract, properties, function registry
//! - `orchestration/` - The function-calling cycle and the orchestrator
//! - `memory/` - Conversation histories (simple, token limited)
//! - `token/` - Token counting

pub mod assistant;
pub mod chat;
pub mod config;
pub mod domain;
pub mod error;
pub mod interaction;
pub mod llm;
pub mod memory;
pub mod orchestration;
pub mod session;
pub mod token;

// Re-export commonly used types
pub use assistant::{Assistant, AssistantContext, FunctionContext, FunctionDescriptor, FunctionRegistry};
pub use chat::ChatAssistant;
pub use config::*;
pub use domain::*;
pub use error::*;
pub use interaction::{ConsoleUserInteraction, ScriptedUserInteraction, UserInteraction};
pub use llm::{
    create_provider, CompletionRequest, CompletionResponse, LlmProvider, ProviderRegistry, ScriptedProvider,
};
pub use memory::{create_conversation, Conversation, SimpleConversation, TokenLimitedConversation};
pub use orchestration::{AskOptions, Orchestrator};
pub use session::{CallLimiter, HookRegistry, Session, TokenUsageCounter};
