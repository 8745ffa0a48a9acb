//! Arithmetic evaluation backed by a rhai engine

use rhai::{Dynamic, Engine, Scope};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::agents::assistant::{Assistant, AssistantContext, FunctionDescriptor, FunctionRegistry};
use crate::agents::domain::{AssistantResponse, ChatHistory, ExpressionResult, ResponseState};
use crate::agents::error::{AgentError, AgentResult};

pub const MATH_ASSISTANT: &str = "MathAssistant";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EvaluateExpressionArgs {
    /// the expression to be evaluated
    pub expression: String,
}

/// Evaluates expressions and keeps every result in a numbered global property
pub struct MathAssistant {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
}

impl MathAssistant {
    pub fn new() -> Self {
        let context = AssistantContext::new(MATH_ASSISTANT);
        let mut registry = FunctionRegistry::new(MATH_ASSISTANT);

        let mut engine = Engine::new();
        engine.set_max_operations(10_000);
        let engine = Arc::new(engine);
        let counter = Arc::new(AtomicU32::new(1));

        let eval_ctx = context.clone();
        registry.register(FunctionDescriptor::typed(
            "EvaluateExpression",
            "Evaluates a mathematical expression",
            move |args: EvaluateExpressionArgs, _ctx| {
                let context = eval_ctx.clone();
                let engine = engine.clone();
                let counter = counter.clone();
                async move {
                    let result = evaluate(&engine, &args.expression)?;
                    let property_name = format!("expression{}", counter.fetch_add(1, Ordering::SeqCst));
                    context.set_global_property(&property_name, result.to_string())?;

                    let expression = ExpressionResult {
                        property_name,
                        expression: args.expression,
                        result,
                    };
                    Ok(AssistantResponse::with_state(
                        expression.to_fact(),
                        ResponseState::Expression(expression),
                    ))
                }
            },
        ));

        Self { context, registry }
    }
}

impl Default for MathAssistant {
    fn default() -> Self {
        Self::new()
    }
}

impl Assistant for MathAssistant {
    fn context(&self) -> &AssistantContext {
        &self.context
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    fn format_result_as_fact(&self, response: &AssistantResponse) -> String {
        match &response.state {
            Some(ResponseState::Expression(expression)) => expression.to_fact(),
            _ => response.text.clone(),
        }
    }

    fn append_result_to_history(&self, history: &mut ChatHistory, response: &AssistantResponse) {
        match &response.state {
            Some(ResponseState::Expression(expression)) => history.add_assistant(expression.to_assistant_message()),
            _ => history.add_assistant(response.text.clone()),
        }
    }
}

/// Evaluate `expression` as floating point arithmetic
pub fn evaluate(engine: &Engine, expression: &str) -> AgentResult<f64> {
    // `^` is exponentiation for calculators, rhai spells it `**`
    let script = promote_integers(expression).replace('^', "**");
    debug!(expression, script = %script, "Evaluating expression");

    let mut scope = Scope::new();
    let value = engine
        .eval_with_scope::<Dynamic>(&mut scope, &script)
        .map_err(|e| AgentError::Script(format!("Failed to evaluate expression: {}: {}", expression, e)))?;

    if let Ok(float) = value.as_float() {
        return Ok(float);
    }
    if let Ok(int) = value.as_int() {
        return Ok(int as f64);
    }
    Err(AgentError::Script(format!(
        "Expression {} did not produce a number but {}",
        expression,
        value.type_name()
    )))
}

/// Rewrite integer literals as floats so `7 / 2` divides like a calculator
fn promote_integers(expression: &str) -> String {
    let chars: Vec<char> = expression.chars().collect();
    let mut out = String::with_capacity(expression.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if !c.is_ascii_digit() {
            out.push(c);
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        out.extend(&chars[start..i]);

        let glued_before = start > 0 && (chars[start - 1].is_alphanumeric() || matches!(chars[start - 1], '_' | '.'));
        let glued_after = i < chars.len() && (chars[i].is_alphanumeric() || matches!(chars[i], '_' | '.'));
        if !glued_before && !glued_after {
            out.push_str(".0");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::assistant::{FunctionContext, OrchestratorHandle, PropertyBag};
    use crate::agents::session::Session;
    use serde_json::json;

    fn bound() -> (MathAssistant, Arc<PropertyBag>) {
        let globals = Arc::new(PropertyBag::new());
        let assistant = MathAssistant::new();
        assistant
            .bind(OrchestratorHandle::new(MATH_ASSISTANT, &globals))
            .unwrap();
        (assistant, globals)
    }

    #[test]
    fn test_promote_integers() {
        assert_eq!(promote_integers("7 / 2"), "7.0 / 2.0");
        assert_eq!(promote_integers("1.5*2"), "1.5*2.0");
        assert_eq!(promote_integers("sqrt(16)"), "sqrt(16.0)");
        assert_eq!(promote_integers("1e3 + x2"), "1e3 + x2");
    }

    #[test]
    fn test_evaluate_uses_float_division() {
        let engine = Engine::new();
        assert_eq!(evaluate(&engine, "7 / 2").unwrap(), 3.5);
        assert_eq!(evaluate(&engine, "(2 + 3) * 4").unwrap(), 20.0);
        assert!(matches!(evaluate(&engine, "2 +"), Err(AgentError::Script(_))));
        assert!(matches!(evaluate(&engine, "\"text\""), Err(AgentError::Script(_))));
    }

    #[test]
    fn test_caret_is_power() {
        let engine = Engine::new();
        assert_eq!(evaluate(&engine, "2^3").unwrap(), 8.0);
        assert_eq!(evaluate(&engine, "2 ^ 0.5 * 2 ^ 0.5").unwrap().round(), 2.0);
        assert_eq!(evaluate(&engine, "(1 + 2)^2 + 1").unwrap(), 10.0);
    }

    #[tokio::test]
    async fn test_results_go_to_numbered_properties() {
        let (assistant, globals) = bound();
        let ctx = || FunctionContext::new(Session::new());

        let first = assistant
            .execute_function("EvaluateExpression", json!({ "expression": "2 + 2" }), ctx())
            .await
            .unwrap();
        let second = assistant
            .execute_function("EvaluateExpression", json!({ "expression": "10 / 4" }), ctx())
            .await
            .unwrap();

        assert_eq!(first.text, "Result of 2 + 2 is in property expression1 and it is equal to 4");
        assert_eq!(second.text, "Result of 10 / 4 is in property expression2 and it is equal to 2.5");
        assert_eq!(globals.get("expression1").as_deref(), Some("4"));
        assert_eq!(globals.get("expression2").as_deref(), Some("2.5"));

        let mut history = ChatHistory::new();
        assistant.append_result_to_history(&mut history, &second);
        assert_eq!(history.messages()[0].content, "Result of 10 / 4 is 2.5");
    }

    #[tokio::test]
    async fn test_unbound_assistant_cannot_store_results() {
        let assistant = MathAssistant::new();
        let err = assistant
            .execute_function(
                "EvaluateExpression",
                json!({ "expression": "1 + 1" }),
                FunctionContext::new(Session::new()),
            )
            .await
            .unwrap_err();

        match err {
            AgentError::ExecutorFailure { source, .. } => {
                assert!(matches!(*source, AgentError::OrchestratorUnavailable(_)))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
