//! Interception scope around completion calls
//!
//! A [`Session`] owns the hooks that see every completion call made while it
//! is alive:
//! - wrapping hooks run before the call and may substitute a response, in
//!   which case the real call and the remaining hooks are skipped
//! - observation hooks run after a real call with the actual response
//!
//! Sessions are created from a [`HookRegistry`] at the start of a cycle (or by
//! the caller for a longer scope) and torn down with [`Session::end`].

mod hooks;
mod limiter;
mod usage;

#[cfg(test)]
mod session_test;

pub use hooks::*;
pub use limiter::CallLimiter;
pub use usage::{clean_model_name, ModelUsage, TokenUsageCounter, UsageLedger};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::{CompletionRequest, CompletionResponse, LlmProvider};

/// Interception scope shared by everything running in one cycle
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    wrapping: RwLock<Vec<Arc<dyn WrappingHook>>>,
    observation: RwLock<Vec<Arc<dyn ObservationHook>>>,
    cancel: CancellationToken,
    completion_timeout: Option<Duration>,
    ended: AtomicBool,
}

impl Session {
    /// Create a session without hooks
    pub fn new() -> Self {
        Self::with_options(None, CancellationToken::new())
    }

    /// Create a session with a per-call timeout and an external cancellation token
    pub fn with_options(completion_timeout: Option<Duration>, cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                wrapping: RwLock::new(Vec::new()),
                observation: RwLock::new(Vec::new()),
                cancel,
                completion_timeout,
                ended: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Add a wrapping hook; hooks run in registration order
    pub async fn add_wrapping_hook(&self, hook: Arc<dyn WrappingHook>) {
        self.inner.wrapping.write().await.push(hook);
    }

    /// Add an observation hook; hooks run in registration order
    pub async fn add_observation_hook(&self, hook: Arc<dyn ObservationHook>) {
        self.inner.observation.write().await.push(hook);
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn cancel(&self) {
        self.inner.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Fail fast when the session was cancelled
    pub fn check_cancelled(&self) -> AgentResult<()> {
        if self.is_cancelled() {
            Err(AgentError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Run a completion through the hook pipeline
    pub async fn complete(
        &self,
        provider: &dyn LlmProvider,
        request: CompletionRequest,
    ) -> AgentResult<CompletionResponse> {
        self.check_cancelled()?;

        let model = request
            .model
            .clone()
            .unwrap_or_else(|| provider.model().to_string());

        let wrapping = self.inner.wrapping.read().await.clone();
        for hook in &wrapping {
            if let Some(response) = hook.before_completion(&request, &model).await {
                debug!(session = %self.inner.id, hook = hook.name(), "Completion replaced by wrapping hook");
                return Ok(response);
            }
        }

        let call = async {
            match self.inner.completion_timeout {
                Some(limit) => match tokio::time::timeout(limit, provider.complete(request.clone())).await {
                    Ok(result) => result.map_err(AgentError::from),
                    Err(_) => Err(AgentError::Timeout(limit)),
                },
                None => provider.complete(request.clone()).await.map_err(AgentError::from),
            }
        };

        let response = tokio::select! {
            _ = self.inner.cancel.cancelled() => return Err(AgentError::Cancelled),
            result = call => result?,
        };

        let observation = self.inner.observation.read().await.clone();
        for hook in &observation {
            hook.after_completion(&request, &model, &response).await;
        }

        Ok(response)
    }

    /// Tear down the scope, notifying every hook once
    pub async fn end(&self) {
        if self.inner.ended.swap(true, Ordering::SeqCst) {
            return;
        }

        for hook in self.inner.wrapping.read().await.iter() {
            hook.on_session_end().await;
        }
        for hook in self.inner.observation.read().await.iter() {
            hook.on_session_end().await;
        }
        info!(session = %self.inner.id, "Session ended");
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
