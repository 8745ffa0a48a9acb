//! Conversation compressed by summarisation

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use super::Conversation;
use crate::agents::domain::{ChatHistory, Message, Role};
use crate::agents::error::AgentResult;
use crate::agents::llm::{CompletionRequest, LlmProvider};
use crate::agents::orchestration::prompt::render;
use crate::agents::session::Session;
use crate::agents::token::TokenCounter;

/// Prompt used to summarise the history
pub const SUMMARY_PROMPT: &str =
    "Summarize this conversation between a user and an assistant while keeping the most important points: {{ input }}";

/// Replaces the whole history with a summary once it exceeds `max_tokens`
///
/// The check runs after each assistant turn, so the next user message lands
/// after the summary.
pub struct TokenLimitedConversation {
    provider: Arc<dyn LlmProvider>,
    counter: TokenCounter,
    max_tokens: u32,
    history: ChatHistory,
}

impl TokenLimitedConversation {
    pub fn new(provider: Arc<dyn LlmProvider>, max_tokens: u32) -> Self {
        let counter = TokenCounter::for_model(provider.model());
        Self::with_counter(provider, max_tokens, counter)
    }

    pub fn with_counter(provider: Arc<dyn LlmProvider>, max_tokens: u32, counter: TokenCounter) -> Self {
        Self {
            provider,
            counter,
            max_tokens,
            history: ChatHistory::new(),
        }
    }

    /// Tokens of every message content
    pub fn token_count(&self) -> u32 {
        self.counter.count_messages(self.history.messages())
    }

    async fn compress_if_needed(&mut self, session: &Session) -> AgentResult<()> {
        if self.history.is_empty() {
            return Ok(());
        }

        let tokens = self.token_count();
        if tokens <= self.max_tokens {
            return Ok(());
        }

        let prompt = render(
            SUMMARY_PROMPT,
            &serde_json::json!({ "input": self.history.transcript() }),
        )?;
        let response = session
            .complete(self.provider.as_ref(), CompletionRequest::from_prompt(prompt))
            .await?;

        info!(tokens, max = self.max_tokens, "Conversation compressed into a summary");
        self.history.replace_all(Message::system(format!(
            "Conversation so far:\n{}\n\n",
            response.content()
        )));
        Ok(())
    }
}

#[async_trait]
impl Conversation for TokenLimitedConversation {
    async fn add_message(&mut self, session: &Session, message: Message) -> AgentResult<()> {
        let compress = message.role == Role::Assistant;
        self.history.add(message);
        if compress {
            self.compress_if_needed(session).await?;
        }
        Ok(())
    }

    fn history(&self) -> &ChatHistory {
        &self.history
    }
}
