//! Returns a stored property as the final answer

use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use crate::agents::assistant::{Assistant, AssistantContext, FunctionDescriptor, FunctionRegistry};
use crate::agents::domain::AssistantResponse;

pub const ANSWER_ASSISTANT: &str = "AnswerAssistant";

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GetOrchestratorPropertyArgs {
    /// The name of the property to get
    pub property_name: String,
}

pub struct AnswerAssistant {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
}

impl AnswerAssistant {
    pub fn new() -> Self {
        let context = AssistantContext::new(ANSWER_ASSISTANT);
        let mut registry = FunctionRegistry::new(ANSWER_ASSISTANT);

        let get_ctx = context.clone();
        registry.register(
            FunctionDescriptor::typed(
                "GetOrchestratorProperty",
                "Get a property value to return to the user to answer the question and finish!",
                move |args: GetOrchestratorPropertyArgs, _ctx| {
                    let context = get_ctx.clone();
                    async move {
                        let value = context.orchestrator()?.require_property(&args.property_name)?;
                        Ok(AssistantResponse::new(value))
                    }
                },
            )
            .terminal(),
        );

        Self { context, registry }
    }
}

impl Default for AnswerAssistant {
    fn default() -> Self {
        Self::new()
    }
}

impl Assistant for AnswerAssistant {
    fn context(&self) -> &AssistantContext {
        &self.context
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::assistant::{FunctionContext, OrchestratorHandle, PropertyBag};
    use crate::agents::error::AgentError;
    use crate::agents::session::Session;
    use serde_json::json;

    #[tokio::test]
    async fn test_returns_global_property() {
        let globals = Arc::new(PropertyBag::new());
        globals.set("expression2", "12");
        let assistant = AnswerAssistant::new();
        assistant
            .bind(OrchestratorHandle::new(ANSWER_ASSISTANT, &globals))
            .unwrap();

        let function = assistant.registry().get("GetOrchestratorProperty").unwrap();
        assert!(function.is_terminal());

        let response = assistant
            .execute_function(
                "GetOrchestratorProperty",
                json!({ "propertyName": "Expression2" }),
                FunctionContext::new(Session::new()),
            )
            .await
            .unwrap();
        assert_eq!(response.text, "12");

        let missing = assistant
            .execute_function(
                "GetOrchestratorProperty",
                json!({ "propertyName": "nope" }),
                FunctionContext::new(Session::new()),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            AgentError::ExecutorFailure { source, .. } if matches!(*source, AgentError::PropertyNotFound(_))
        ));
    }
}
