//! Hook traits and the registry that instantiates them per session

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::Session;
use crate::agents::llm::{CompletionRequest, CompletionResponse};

/// Runs before the real completion call and may replace it
#[async_trait]
pub trait WrappingHook: Send + Sync {
    fn name(&self) -> &str;

    /// Return `Some` to skip the real call and every later wrapping hook
    async fn before_completion(
        &self,
        request: &CompletionRequest,
        model: &str,
    ) -> Option<CompletionResponse>;

    async fn on_session_end(&self) {}
}

/// Sees every real completion call after it returns
#[async_trait]
pub trait ObservationHook: Send + Sync {
    fn name(&self) -> &str;

    async fn after_completion(
        &self,
        request: &CompletionRequest,
        model: &str,
        response: &CompletionResponse,
    );

    async fn on_session_end(&self) {}
}

type WrappingFactory = Arc<dyn Fn() -> Arc<dyn WrappingHook> + Send + Sync>;
type ObservationFactory = Arc<dyn Fn() -> Arc<dyn ObservationHook> + Send + Sync>;

/// Hook factories instantiated for every new session
///
/// A factory returning a fresh value gives per-session state (a call
/// limiter); returning a clone of one `Arc` shares it across sessions (a
/// usage counter).
#[derive(Clone, Default)]
pub struct HookRegistry {
    wrapping: Vec<WrappingFactory>,
    observation: Vec<ObservationFactory>,
    completion_timeout: Option<Duration>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wrapping<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn WrappingHook> + Send + Sync + 'static,
    {
        self.wrapping.push(Arc::new(factory));
        self
    }

    pub fn with_observation<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn ObservationHook> + Send + Sync + 'static,
    {
        self.observation.push(Arc::new(factory));
        self
    }

    /// Bound every completion call made in sessions started from this registry
    pub fn with_completion_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.completion_timeout = timeout;
        self
    }

    pub fn completion_timeout(&self) -> Option<Duration> {
        self.completion_timeout
    }

    /// Start a session with fresh hook instances
    pub async fn start_session(&self) -> Session {
        self.start_session_with(CancellationToken::new()).await
    }

    /// Start a session tied to an external cancellation token
    pub async fn start_session_with(&self, cancel: CancellationToken) -> Session {
        let session = Session::with_options(self.completion_timeout, cancel);
        for factory in &self.wrapping {
            session.add_wrapping_hook(factory()).await;
        }
        for factory in &self.observation {
            session.add_observation_hook(factory()).await;
        }
        session
    }
}
