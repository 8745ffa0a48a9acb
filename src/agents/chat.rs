//! Plain chat over a pluggable conversation

use std::sync::Arc;
use tracing::debug;

use crate::agents::error::AgentResult;
use crate::agents::llm::{CompletionRequest, LlmProvider};
use crate::agents::memory::Conversation;
use crate::agents::session::Session;

/// One completion call per user message, no functions
pub struct ChatAssistant {
    provider: Arc<dyn LlmProvider>,
    conversation: Box<dyn Conversation>,
}

impl ChatAssistant {
    pub fn new(provider: Arc<dyn LlmProvider>, conversation: Box<dyn Conversation>) -> Self {
        Self {
            provider,
            conversation,
        }
    }

    /// Send a user message and return the model's answer
    pub async fn send_message(&mut self, session: &Session, message: &str) -> AgentResult<String> {
        self.conversation.add_user_message(session, message).await?;

        let request = CompletionRequest::from_messages(self.conversation.history().messages().to_vec());
        debug!(messages = request.messages.len(), "Sending chat request");
        let response = session.complete(self.provider.as_ref(), request).await?;
        let answer = response.content().to_string();

        self.conversation.add_assistant_message(session, &answer).await?;
        Ok(answer)
    }

    pub fn conversation(&self) -> &dyn Conversation {
        self.conversation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::domain::Role;
    use crate::agents::memory::{SimpleConversation, TokenLimitedConversation};
    use crate::agents::token::TokenCounter;
    use crate::agents::llm::ScriptedProvider;

    #[tokio::test]
    async fn test_send_message_returns_answer() {
        let provider = Arc::new(ScriptedProvider::new("gpt-4o"));
        provider.push_text("Hello, I'm here to help!").await;
        let mut chat = ChatAssistant::new(provider.clone(), Box::new(SimpleConversation::new()));

        let answer = chat.send_message(&Session::new(), "Hi there!").await.unwrap();

        assert_eq!(answer, "Hello, I'm here to help!");
        assert_eq!(chat.conversation().history().len(), 2);
    }

    #[tokio::test]
    async fn test_second_turn_sees_summary() {
        let provider = Arc::new(ScriptedProvider::new("gpt-4o"));
        provider.push_text("Here is a very long response that will consume tokens").await;
        provider.push_text("this is summary").await;
        provider.push_text("this is third response").await;

        let conversation =
            TokenLimitedConversation::with_counter(provider.clone(), 10, TokenCounter::with_ratio(1.0));
        let mut chat = ChatAssistant::new(provider.clone(), Box::new(conversation));
        let session = Session::new();

        let first = chat.send_message(&session, "Hi there!").await.unwrap();
        assert_eq!(first, "Here is a very long response that will consume tokens");

        let third = chat
            .send_message(&session, "Hi there this is the second question!")
            .await
            .unwrap();
        assert_eq!(third, "this is third response");

        let requests = provider.requests().await;
        let last = &requests[2].messages;
        assert_eq!(last.len(), 2);
        assert_eq!(last[0].role, Role::System);
        assert_eq!(last[0].content, "Conversation so far:\nthis is summary\n\n");
        assert_eq!(last[1].content, "Hi there this is the second question!");
    }
}
