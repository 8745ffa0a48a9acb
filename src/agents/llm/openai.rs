//! OpenAI chat completions provider

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::env;

use super::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider, TokenUsage, ToolChoice};
use crate::agents::config::LlmProviderConfig;
use crate::agents::domain::{Message, Role, ToolCall};
use crate::agents::error::{LlmError, LlmResult};

/// OpenAI LLM Provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    provider_name: &'static str,
    default_temperature: Option<f32>,
    default_max_tokens: Option<u32>,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider from configuration
    pub fn new(config: &LlmProviderConfig) -> LlmResult<Self> {
        let env_var = config.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY");
        let api_key = env::var(env_var).map_err(|_| {
            LlmError::Authentication(format!("Environment variable {} not set", env_var))
        })?;

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        Ok(Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key),
            base_url,
            model: config.model.clone(),
            provider_name: "openai",
            default_temperature: config.temperature,
            default_max_tokens: config.max_tokens,
        })
    }

    /// Create a provider for a local Ollama server
    pub fn ollama(config: &LlmProviderConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434/v1".to_string());

        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key_env.as_deref().and_then(|var| env::var(var).ok()),
            base_url,
            model: config.model.clone(),
            provider_name: "ollama",
            default_temperature: config.temperature,
            default_max_tokens: config.max_tokens,
        }
    }

    /// Build the request body for OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": request.model.as_ref().unwrap_or(&self.model),
            "messages": self.convert_messages(&request.messages),
        });

        if let Some(temp) = request.temperature.or(self.default_temperature) {
            body["temperature"] = json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens.or(self.default_max_tokens) {
            body["max_tokens"] = json!(max_tokens);
        }

        if let Some(stop) = &request.stop {
            body["stop"] = json!(stop);
        }

        if let Some(tools) = &request.tools {
            if !tools.is_empty() {
                body["tools"] = json!(tools
                    .iter()
                    .map(|t| {
                        // OpenAI requires at minimum {"type": "object"} for function parameters
                        let params = if t.parameters.as_object().map_or(true, |o| o.is_empty()) {
                            json!({ "type": "object", "properties": {} })
                        } else {
                            t.parameters.clone()
                        };
                        json!({
                            "type": "function",
                            "function": {
                                "name": t.name,
                                "description": t.description,
                                "parameters": params
                            }
                        })
                    })
                    .collect::<Vec<_>>());

                // the orchestrator dispatches calls itself, never in parallel on the server
                body["parallel_tool_calls"] = json!(false);
            }
        }

        if let Some(tool_choice) = &request.tool_choice {
            body["tool_choice"] = match tool_choice {
                ToolChoice::Auto => json!("auto"),
                ToolChoice::None => json!("none"),
                ToolChoice::Required => json!("required"),
                ToolChoice::Tool { name } => json!({
                    "type": "function",
                    "function": { "name": name }
                }),
            };
        }

        body
    }

    /// Convert internal messages to OpenAI format
    fn convert_messages(&self, messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                let mut msg = json!({
                    "role": match m.role {
                        Role::System => "system",
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::Tool => "tool",
                    },
                    "content": m.content,
                });

                if let Some(tool_calls) = &m.tool_calls {
                    msg["tool_calls"] = json!(tool_calls
                        .iter()
                        .map(|tc| {
                            json!({
                                "id": tc.id,
                                "type": "function",
                                "function": {
                                    "name": tc.name,
                                    "arguments": tc.arguments.to_string()
                                }
                            })
                        })
                        .collect::<Vec<_>>());
                }

                if let Some(tool_call_id) = &m.tool_call_id {
                    msg["tool_call_id"] = json!(tool_call_id);
                }

                msg
            })
            .collect()
    }

    /// Parse a response body
    fn parse_response(&self, response: &OpenAiResponse) -> LlmResult<CompletionResponse> {
        let choice = response
            .choices
            .first()
            .ok_or_else(|| LlmError::Parse("No choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .as_ref()
            .map(|tcs| {
                tcs.iter()
                    .map(|tc| {
                        let arguments = serde_json::from_str(&tc.function.arguments).map_err(|e| {
                            LlmError::Parse(format!(
                                "Invalid arguments for {}: {}",
                                tc.function.name, e
                            ))
                        })?;
                        Ok(ToolCall::new(tc.id.clone(), tc.function.name.clone(), arguments))
                    })
                    .collect::<LlmResult<Vec<_>>>()
            })
            .transpose()?
            .unwrap_or_default();

        let content = choice.message.content.clone().unwrap_or_default();
        let message = Message::assistant_with_tools(content, tool_calls);

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("tool_calls") => FinishReason::ToolCalls,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        let usage = response.usage.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            message,
            finish_reason,
            usage,
            model: response.model.clone(),
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.provider_name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> LlmResult<CompletionResponse> {
        let body = self.build_request_body(&request);

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let openai_response: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Failed to parse response: {}", e)))?;

        self.parse_response(&openai_response)
    }
}

// OpenAI API response types

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::domain::ToolDefinition;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::ollama(&LlmProviderConfig {
            model: "gpt-4o-mini".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_body_contains_tools_and_choice() {
        let request = CompletionRequest::from_prompt("2+2?")
            .with_temperature(0.0)
            .with_tools(
                vec![ToolDefinition::new("EvaluateExpression", "math", json!({}))],
                ToolChoice::Auto,
            );

        let body = provider().build_request_body(&request);
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["function"]["name"], "EvaluateExpression");
        assert_eq!(body["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_required_tool_choice() {
        let request = CompletionRequest::from_prompt("q").with_tools(
            vec![ToolDefinition::new("describe", "d", json!({"type": "object"}))],
            ToolChoice::Tool { name: "describe".to_string() },
        );
        let body = provider().build_request_body(&request);
        assert_eq!(body["tool_choice"]["function"]["name"], "describe");
    }

    #[test]
    fn test_parse_tool_call_response() {
        let raw: OpenAiResponse = serde_json::from_value(json!({
            "model": "gpt-4o-mini-2024-07-18",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "function": { "name": "EvaluateExpression", "arguments": "{\"expression\":\"2+2\"}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        }))
        .unwrap();

        let response = provider().parse_response(&raw).unwrap();
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.tool_calls()[0].arguments["expression"], "2+2");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
        assert_eq!(response.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
    }

    #[test]
    fn test_parse_rejects_malformed_arguments() {
        let raw: OpenAiResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "tool_calls": [{ "id": "c", "function": { "name": "f", "arguments": "{not json" } }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        assert!(matches!(provider().parse_response(&raw), Err(LlmError::Parse(_))));
    }
}
