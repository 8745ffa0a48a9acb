//! The function-calling cycle shared by the orchestrator and composite assistants

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::agents::assistant::{Assistant, FunctionContext, FunctionDescriptor};
use crate::agents::domain::{AssistantResponse, Message, ToolDefinition};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::{CompletionRequest, LlmProvider, ToolChoice};
use crate::agents::session::Session;

/// A function offered in one round, with the assistant that owns it
#[derive(Clone)]
pub struct FunctionEntry {
    pub descriptor: FunctionDescriptor,
    pub assistant: Arc<dyn Assistant>,
}

/// Eligible functions of every assistant, keyed by name
#[derive(Clone, Default)]
pub struct FunctionTable {
    entries: Vec<FunctionEntry>,
}

impl FunctionTable {
    /// Collect the currently eligible functions, rejecting names exposed twice
    pub async fn collect(assistants: &[Arc<dyn Assistant>]) -> AgentResult<Self> {
        let mut entries: Vec<FunctionEntry> = Vec::new();
        for assistant in assistants {
            for descriptor in assistant.list_eligible_functions().await {
                if let Some(existing) = entries
                    .iter()
                    .find(|e| e.descriptor.name().eq_ignore_ascii_case(descriptor.name()))
                {
                    return Err(AgentError::DuplicateFunction {
                        function: descriptor.name().to_string(),
                        first: existing.assistant.name().to_string(),
                        second: assistant.name().to_string(),
                    });
                }
                entries.push(FunctionEntry {
                    descriptor,
                    assistant: assistant.clone(),
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries
            .iter()
            .find(|e| e.descriptor.name().eq_ignore_ascii_case(name))
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(|e| e.descriptor.definition()).collect()
    }

    /// Names of functions that end the cycle when called
    pub fn terminal_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.is_terminal())
            .map(|e| e.descriptor.name())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the messages of each round
#[async_trait]
pub trait CyclePrompt: Send + Sync {
    /// `results` holds the facts of functions executed earlier in this cycle
    async fn messages(&self, results: &[String]) -> AgentResult<Vec<Message>>;
}

/// How a cycle ended
pub enum CycleOutcome {
    /// The model answered with plain text
    Answer(String),
    /// A terminal function ran, or a function asked to end the cycle
    Function {
        assistant: Arc<dyn Assistant>,
        function: String,
        response: AssistantResponse,
    },
}

impl CycleOutcome {
    pub fn into_response(self) -> AssistantResponse {
        match self {
            CycleOutcome::Answer(text) => AssistantResponse::new(text),
            CycleOutcome::Function { response, .. } => response,
        }
    }
}

impl std::fmt::Debug for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleOutcome::Answer(text) => f.debug_tuple("Answer").field(text).finish(),
            CycleOutcome::Function { assistant, function, response } => f
                .debug_struct("Function")
                .field("assistant", &assistant.name())
                .field("function", function)
                .field("response", response)
                .finish(),
        }
    }
}

/// Drive rounds until an answer or a terminal result
pub async fn run_cycle(
    provider: &dyn LlmProvider,
    session: &Session,
    assistants: &[Arc<dyn Assistant>],
    prompt: &dyn CyclePrompt,
    max_iterations: u32,
) -> AgentResult<CycleOutcome> {
    let mut results: Vec<String> = Vec::new();

    for round in 1..=max_iterations {
        session.check_cancelled()?;

        let table = FunctionTable::collect(assistants).await?;
        debug!(
            round,
            functions = table.len(),
            terminal = ?table.terminal_names(),
            "Starting orchestration round"
        );

        let request = CompletionRequest::from_messages(prompt.messages(&results).await?)
            .with_temperature(0.0)
            .with_tools(table.definitions(), ToolChoice::Auto);
        let response = session.complete(provider, request).await?;

        let calls = response.tool_calls();
        if calls.is_empty() {
            info!(round, "Model answered without calling functions");
            return Ok(CycleOutcome::Answer(response.content().to_string()));
        }

        for call in calls {
            let entry = table
                .lookup(&call.name)
                .ok_or_else(|| AgentError::FunctionNotFound(call.name.clone()))?;

            info!(
                round,
                assistant = entry.assistant.name(),
                function = %call.name,
                "Dispatching function call"
            );
            let execution = entry.assistant.execute_function(
                entry.descriptor.name(),
                call.arguments.clone(),
                FunctionContext::new(session.clone()),
            );
            // a cancelled session drops the running executor before it commits
            let cancel = session.cancellation_token();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(function = %call.name, "Function dropped by session cancellation");
                    return Err(AgentError::Cancelled);
                }
                result = execution => result?,
            };

            if entry.descriptor.is_terminal() || result.terminate_cycle {
                info!(function = %call.name, "Cycle terminated by function result");
                return Ok(CycleOutcome::Function {
                    assistant: entry.assistant.clone(),
                    function: entry.descriptor.name().to_string(),
                    response: result,
                });
            }

            results.push(entry.assistant.format_result_as_fact(&result));
        }
    }

    Err(AgentError::MaxIterations(max_iterations))
}
