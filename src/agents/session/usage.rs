//! Token usage accounting per model

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tokio::sync::Mutex;
use tracing::debug;

use super::ObservationHook;
use crate::agents::llm::{CompletionRequest, CompletionResponse, TokenUsage};

/// Strip a trailing `-YYYY-MM-DD` release date from a model id
pub fn clean_model_name(model: &str) -> &str {
    const SUFFIX_LEN: usize = 11;
    if model.len() > SUFFIX_LEN && model.is_char_boundary(model.len() - SUFFIX_LEN) {
        let (base, suffix) = model.split_at(model.len() - SUFFIX_LEN);
        if let Some(date) = suffix.strip_prefix('-') {
            if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok() {
                return base;
            }
        }
    }
    model
}

/// Cumulative and last-call usage of one model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub calls: u32,
    pub last: TokenUsage,
}

/// Usage of every model seen by a counter
#[derive(Debug, Clone, Default)]
pub struct UsageLedger {
    models: BTreeMap<String, ModelUsage>,
    call_count: u32,
    last_model: Option<String>,
}

impl UsageLedger {
    pub fn record(&mut self, model: &str, usage: &TokenUsage) {
        let model = clean_model_name(model).to_string();
        let entry = self.models.entry(model.clone()).or_default();
        entry.prompt_tokens += u64::from(usage.prompt_tokens);
        entry.completion_tokens += u64::from(usage.completion_tokens);
        entry.total_tokens += u64::from(usage.total_tokens);
        entry.calls += 1;
        entry.last = *usage;
        self.call_count += 1;
        self.last_model = Some(model);
    }

    pub fn model(&self, model: &str) -> Option<&ModelUsage> {
        self.models.get(clean_model_name(model))
    }

    pub fn call_count(&self) -> u32 {
        self.call_count
    }

    pub fn last_model(&self) -> Option<&str> {
        self.last_model.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Human readable summary
    pub fn report(&self) -> String {
        let mut out = format!("Calls: {}\n", self.call_count);
        if let Some(model) = &self.last_model {
            if let Some(usage) = self.models.get(model) {
                let _ = writeln!(
                    out,
                    "Last call ({}): prompt {} / completion {} / total {}",
                    model, usage.last.prompt_tokens, usage.last.completion_tokens, usage.last.total_tokens
                );
            }
        }
        for (model, usage) in &self.models {
            let _ = writeln!(
                out,
                "{}: {} calls, prompt {} / completion {} / total {}",
                model, usage.calls, usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }
        out
    }
}

/// Observation hook feeding a shared [`UsageLedger`]
#[derive(Debug, Default)]
pub struct TokenUsageCounter {
    ledger: Mutex<UsageLedger>,
}

impl TokenUsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current ledger
    pub async fn snapshot(&self) -> UsageLedger {
        self.ledger.lock().await.clone()
    }

    pub async fn report(&self) -> String {
        self.ledger.lock().await.report()
    }
}

#[async_trait]
impl ObservationHook for TokenUsageCounter {
    fn name(&self) -> &str {
        "token_usage_counter"
    }

    async fn after_completion(
        &self,
        _request: &CompletionRequest,
        model: &str,
        response: &CompletionResponse,
    ) {
        let Some(usage) = &response.usage else {
            return;
        };
        let model = response.model.as_deref().unwrap_or(model);
        debug!(model, total = usage.total_tokens, "Recording token usage");
        self.ledger.lock().await.record(model, usage);
    }
}
