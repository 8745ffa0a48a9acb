use super::*;
use crate::agents::llm::{ScriptedProvider, TokenUsage};
use crate::agents::error::LlmResult;
use async_trait::async_trait;
use std::sync::atomic::AtomicUsize;

struct FixedAnswer {
    answer: &'static str,
}

#[async_trait]
impl WrappingHook for FixedAnswer {
    fn name(&self) -> &str {
        "fixed_answer"
    }

    async fn before_completion(&self, _request: &CompletionRequest, _model: &str) -> Option<CompletionResponse> {
        Some(CompletionResponse::text(self.answer))
    }
}

#[derive(Default)]
struct Recorder {
    seen: AtomicUsize,
    ended: AtomicUsize,
}

#[async_trait]
impl ObservationHook for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn after_completion(&self, _request: &CompletionRequest, _model: &str, _response: &CompletionResponse) {
        self.seen.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_session_end(&self) {
        self.ended.fetch_add(1, Ordering::SeqCst);
    }
}

struct SlowProvider;

#[async_trait]
impl LlmProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    fn model(&self) -> &str {
        "slow-model"
    }

    async fn complete(&self, _request: CompletionRequest) -> LlmResult<CompletionResponse> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(CompletionResponse::text("late"))
    }
}

#[tokio::test]
async fn test_wrapping_hook_replaces_real_call() {
    let provider = ScriptedProvider::new("gpt-4o");
    let recorder = Arc::new(Recorder::default());
    let session = Session::new();
    session.add_wrapping_hook(Arc::new(FixedAnswer { answer: "mocked" })).await;
    session.add_observation_hook(recorder.clone()).await;

    let response = session
        .complete(&provider, CompletionRequest::from_prompt("hi"))
        .await
        .unwrap();

    assert_eq!(response.content(), "mocked");
    assert_eq!(provider.call_count().await, 0);
    assert_eq!(recorder.seen.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_call_limiter_short_circuits_after_max() {
    let provider = ScriptedProvider::new("gpt-4o");
    for i in 0..3 {
        provider.push_text(format!("answer {}", i)).await;
    }

    let registry = HookRegistry::new().with_wrapping(|| Arc::new(CallLimiter::new(2)) as Arc<dyn WrappingHook>);
    let session = registry.start_session().await;

    let first = session.complete(&provider, CompletionRequest::from_prompt("a")).await.unwrap();
    let second = session.complete(&provider, CompletionRequest::from_prompt("b")).await.unwrap();
    let third = session.complete(&provider, CompletionRequest::from_prompt("c")).await.unwrap();

    assert_eq!(first.content(), "answer 0");
    assert_eq!(second.content(), "answer 1");
    assert_eq!(third.content(), "Max number of call reached: 2");
    assert_eq!(provider.call_count().await, 2);
}

#[tokio::test]
async fn test_limiter_is_fresh_per_session() {
    let provider = ScriptedProvider::new("gpt-4o");
    provider.push_text("one").await;
    provider.push_text("two").await;

    let registry = HookRegistry::new().with_wrapping(|| Arc::new(CallLimiter::new(1)) as Arc<dyn WrappingHook>);

    let first = registry.start_session().await;
    assert_eq!(first.complete(&provider, CompletionRequest::from_prompt("a")).await.unwrap().content(), "one");

    let second = registry.start_session().await;
    assert_eq!(second.complete(&provider, CompletionRequest::from_prompt("b")).await.unwrap().content(), "two");
}

#[tokio::test]
async fn test_usage_counter_shared_across_sessions() {
    let provider = ScriptedProvider::new("gpt-4o");
    provider
        .push(CompletionResponse::text("x").with_usage(TokenUsage::new(10, 2)).with_model("gpt-4o-2024-08-06"))
        .await;
    provider.push(CompletionResponse::text("y").with_usage(TokenUsage::new(4, 4))).await;

    let counter = Arc::new(TokenUsageCounter::new());
    let shared = counter.clone();
    let registry = HookRegistry::new().with_observation(move || shared.clone() as Arc<dyn ObservationHook>);

    let first = registry.start_session().await;
    first.complete(&provider, CompletionRequest::from_prompt("a")).await.unwrap();
    first.end().await;

    let second = registry.start_session().await;
    second.complete(&provider, CompletionRequest::from_prompt("b")).await.unwrap();

    let ledger = counter.snapshot().await;
    assert_eq!(ledger.call_count(), 2);
    assert_eq!(ledger.model("gpt-4o").unwrap().total_tokens, 20);
}

#[tokio::test]
async fn test_end_notifies_hooks_once() {
    let recorder = Arc::new(Recorder::default());
    let session = Session::new();
    session.add_observation_hook(recorder.clone()).await;

    session.end().await;
    session.end().await;

    assert_eq!(recorder.ended.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_session_rejects_calls() {
    let provider = ScriptedProvider::new("gpt-4o");
    provider.push_text("never").await;
    let session = Session::new();
    session.cancel();

    let result = session.complete(&provider, CompletionRequest::from_prompt("a")).await;
    assert!(matches!(result, Err(AgentError::Cancelled)));
    assert_eq!(provider.remaining().await, 1);
}

#[tokio::test]
async fn test_cancel_interrupts_pending_call() {
    let session = Session::new();
    let canceller = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = session.complete(&SlowProvider, CompletionRequest::from_prompt("a")).await;
    assert!(matches!(result, Err(AgentError::Cancelled)));
}

#[tokio::test]
async fn test_completion_timeout() {
    let session = Session::with_options(Some(Duration::from_millis(20)), CancellationToken::new());
    let result = session.complete(&SlowProvider, CompletionRequest::from_prompt("a")).await;
    assert!(matches!(result, Err(AgentError::Timeout(d)) if d == Duration::from_millis(20)));
}
