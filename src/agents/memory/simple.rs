//! Unbounded conversation

use async_trait::async_trait;

use super::Conversation;
use crate::agents::domain::{ChatHistory, Message};
use crate::agents::error::AgentResult;
use crate::agents::session::Session;

/// Keeps every message
#[derive(Debug, Default)]
pub struct SimpleConversation {
    history: ChatHistory,
}

impl SimpleConversation {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Conversation for SimpleConversation {
    async fn add_message(&mut self, _session: &Session, message: Message) -> AgentResult<()> {
        self.history.add(message);
        Ok(())
    }

    fn history(&self) -> &ChatHistory {
        &self.history
    }
}
