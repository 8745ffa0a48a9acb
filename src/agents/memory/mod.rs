//! Conversation history backends
//!
//! - `SimpleConversation` keeps every turn
//! - `TokenLimitedConversation` summarises the history once it grows past a
//!   token ceiling

mod simple;
mod token_limited;

pub use simple::SimpleConversation;
pub use token_limited::{TokenLimitedConversation, SUMMARY_PROMPT};

use async_trait::async_trait;
use std::sync::Arc;

use crate::agents::config::ConversationConfig;
use crate::agents::domain::{ChatHistory, Message};
use crate::agents::error::AgentResult;
use crate::agents::llm::LlmProvider;
use crate::agents::session::Session;

/// Append-only conversation visible to the model
#[async_trait]
pub trait Conversation: Send + Sync {
    /// Append a message; completion calls made while doing so go through `session`
    async fn add_message(&mut self, session: &Session, message: Message) -> AgentResult<()>;

    /// Current history
    fn history(&self) -> &ChatHistory;

    async fn add_user_message(&mut self, session: &Session, content: &str) -> AgentResult<()> {
        self.add_message(session, Message::user(content)).await
    }

    async fn add_assistant_message(&mut self, session: &Session, content: &str) -> AgentResult<()> {
        self.add_message(session, Message::assistant(content)).await
    }
}

/// Create a conversation from configuration
///
/// A zero token ceiling keeps the whole history.
pub fn create_conversation(
    config: &ConversationConfig,
    provider: Arc<dyn LlmProvider>,
) -> Box<dyn Conversation> {
    if config.max_tokens == 0 {
        Box::new(SimpleConversation::new())
    } else {
        Box::new(TokenLimitedConversation::new(provider, config.max_tokens))
    }
}
