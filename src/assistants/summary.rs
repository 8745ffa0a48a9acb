//! Summarizes the text held in a global property

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::agents::assistant::{Assistant, AssistantContext, FunctionDescriptor, FunctionRegistry};
use crate::agents::domain::AssistantResponse;
use crate::agents::error::AgentResult;
use crate::agents::llm::{CompletionRequest, LlmProvider};
use crate::agents::orchestration::prompt::render;
use crate::agents::session::Session;

pub const SUMMARY_ASSISTANT: &str = "SummaryAssistant";

/// Global property receiving the summary
pub const SUMMARIZATION_PROPERTY: &str = "summarization";

const SUMMARY_TEMPLATE: &str = r#"{% if context %}You will summarize the following text using a context as a guideline
Context: {{ context }}
{% else %}You will summarize the following text:
{% endif %}
Text:
{{ text }}
"#;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeArgs {
    /// The name of the property to get
    pub property_name: String,
    /// The context for the summarization
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Serialize)]
struct SummaryPrompt<'a> {
    text: &'a str,
    context: Option<&'a str>,
}

pub struct SummaryAssistant {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
}

impl SummaryAssistant {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let context = AssistantContext::new(SUMMARY_ASSISTANT);
        let mut registry = FunctionRegistry::new(SUMMARY_ASSISTANT);

        let summarize_ctx = context.clone();
        registry.register(FunctionDescriptor::typed(
            "Summarize",
            "Summarize a text contained in an assistant property using an optional context!",
            move |args: SummarizeArgs, ctx| {
                let context = summarize_ctx.clone();
                let provider = provider.clone();
                async move {
                    let text = context.orchestrator()?.require_property(&args.property_name)?;
                    let summary = summarize(
                        provider.as_ref(),
                        ctx.session(),
                        &text,
                        args.context.as_deref().filter(|c| !c.trim().is_empty()),
                    )
                    .await?;

                    info!(property = %args.property_name, chars = summary.len(), "Summary stored");
                    context.set_global_property(SUMMARIZATION_PROPERTY, summary)?;
                    Ok(AssistantResponse::new("Summary saved in summarization property"))
                }
            },
        ));

        Self { context, registry }
    }
}

impl Assistant for SummaryAssistant {
    fn context(&self) -> &AssistantContext {
        &self.context
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

/// Ask the model for a summary of `text`
pub async fn summarize(
    provider: &dyn LlmProvider,
    session: &Session,
    text: &str,
    context: Option<&str>,
) -> AgentResult<String> {
    let prompt = render(SUMMARY_TEMPLATE, &SummaryPrompt { text, context })?;
    let response = session.complete(provider, CompletionRequest::from_prompt(prompt)).await?;
    Ok(response.content().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::assistant::{FunctionContext, OrchestratorHandle, PropertyBag};
    use crate::agents::error::AgentError;
    use crate::agents::llm::ScriptedProvider;
    use serde_json::json;

    fn bound(provider: Arc<ScriptedProvider>) -> (SummaryAssistant, Arc<PropertyBag>) {
        let globals = Arc::new(PropertyBag::new());
        let assistant = SummaryAssistant::new(provider);
        assistant
            .bind(OrchestratorHandle::new(SUMMARY_ASSISTANT, &globals))
            .unwrap();
        (assistant, globals)
    }

    #[tokio::test]
    async fn test_summary_stored_in_global_property() {
        let provider = Arc::new(ScriptedProvider::new("gpt-4o-mini"));
        provider.push_text("A short summary").await;
        let (assistant, globals) = bound(provider.clone());
        globals.set("transcription", "a very long transcript");

        let response = assistant
            .execute_function(
                "Summarize",
                json!({ "propertyName": "transcription", "context": "focus on dates" }),
                FunctionContext::new(Session::new()),
            )
            .await
            .unwrap();

        assert_eq!(response.text, "Summary saved in summarization property");
        assert_eq!(globals.get(SUMMARIZATION_PROPERTY).as_deref(), Some("A short summary"));

        let prompt = &provider.requests().await[0].messages[0].content;
        assert!(prompt.starts_with("You will summarize the following text using a context as a guideline"));
        assert!(prompt.contains("Context: focus on dates"));
        assert!(prompt.contains("Text:\na very long transcript"));
    }

    #[tokio::test]
    async fn test_prompt_without_context() {
        let provider = Arc::new(ScriptedProvider::new("gpt-4o-mini"));
        provider.push_text("summary").await;

        summarize(provider.as_ref(), &Session::new(), "body", None).await.unwrap();

        let prompt = &provider.requests().await[0].messages[0].content;
        assert!(prompt.starts_with("You will summarize the following text:\n"));
        assert!(!prompt.contains("Context:"));
    }

    #[tokio::test]
    async fn test_missing_property_fails_without_completion() {
        let provider = Arc::new(ScriptedProvider::new("gpt-4o-mini"));
        let (assistant, _globals) = bound(provider.clone());

        let err = assistant
            .execute_function(
                "Summarize",
                json!({ "propertyName": "transcription" }),
                FunctionContext::new(Session::new()),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AgentError::ExecutorFailure { source, .. } if matches!(*source, AgentError::PropertyNotFound(_))
        ));
        assert_eq!(provider.call_count().await, 0);
    }
}
