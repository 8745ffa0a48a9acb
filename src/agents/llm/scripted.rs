//! Provider replaying queued completions

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;

use super::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::agents::domain::ToolCall;
use crate::agents::error::{LlmError, LlmResult};

/// Returns queued responses in order and records every request it receives
pub struct ScriptedProvider {
    model: String,
    responses: Mutex<VecDeque<CompletionResponse>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response
    pub async fn push(&self, response: CompletionResponse) {
        self.responses.lock().await.push_back(response);
    }

    /// Queue a plain text answer
    pub async fn push_text(&self, text: impl Into<String>) {
        self.push(CompletionResponse::text(text)).await;
    }

    /// Queue a batch of function calls
    pub async fn push_calls(&self, calls: Vec<ToolCall>) {
        self.push(CompletionResponse::calls(calls)).await;
    }

    /// Requests received so far
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of completion calls that reached this provider
    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Responses still queued
    pub async fn remaining(&self) -> usize {
        self.responses.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        self.requests.lock().await.push(request);
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| LlmError::InvalidRequest("no scripted completion left".to_string()))
    }
}
