//! Wrapping hook capping the number of completion calls

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::warn;

use super::WrappingHook;
use crate::agents::llm::{CompletionRequest, CompletionResponse};

/// Lets `max_calls` completions through, then answers every further call itself
#[derive(Debug)]
pub struct CallLimiter {
    max_calls: u32,
    calls: AtomicU32,
}

impl CallLimiter {
    pub fn new(max_calls: u32) -> Self {
        Self {
            max_calls,
            calls: AtomicU32::new(0),
        }
    }

    /// Calls seen so far, including short-circuited ones
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WrappingHook for CallLimiter {
    fn name(&self) -> &str {
        "call_limiter"
    }

    async fn before_completion(
        &self,
        _request: &CompletionRequest,
        model: &str,
    ) -> Option<CompletionResponse> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if calls > self.max_calls {
            warn!(model, calls, max = self.max_calls, "Completion call limit reached");
            Some(CompletionResponse::text(format!(
                "Max number of call reached: {}",
                self.max_calls
            )))
        } else {
            None
        }
    }
}
