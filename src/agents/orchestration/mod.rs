//! Assistant-based orchestration
//!
//! The [`Orchestrator`] owns the global properties and the registered
//! assistants. `ask` drives the cycle:
//! - collect the eligible functions of every assistant
//! - ask the model, offering those functions
//! - plain text ends the cycle; function calls are dispatched in order
//! - a terminal function or a `terminate_cycle` result ends the cycle,
//!   anything else becomes a fact for the next round

mod cycle;
pub mod prompt;


pub use cycle::{run_cycle, CycleOutcome, CyclePrompt, FunctionEntry, FunctionTable};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::agents::assistant::{Assistant, OrchestratorHandle, PropertyBag};
use crate::agents::config::OrchestratorConfig;
use crate::agents::domain::{AssistantResponse, ChatHistory, Message};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::llm::LlmProvider;
use crate::agents::memory::{Conversation, SimpleConversation};
use crate::agents::session::{HookRegistry, Session};
use prompt::{orchestrator_prompt, PromptSections};

/// Limits of one `ask`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AskOptions {
    pub max_iterations: u32,
    pub deadline: Option<Duration>,
}

impl Default for AskOptions {
    fn default() -> Self {
        Self::from(&OrchestratorConfig::default())
    }
}

impl From<&OrchestratorConfig> for AskOptions {
    fn from(config: &OrchestratorConfig) -> Self {
        Self {
            max_iterations: config.max_iterations,
            deadline: (config.timeout_seconds > 0).then(|| Duration::from_secs(config.timeout_seconds)),
        }
    }
}

/// Drives assistants through the function-calling cycle
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    hooks: HookRegistry,
    options: AskOptions,
    globals: Arc<PropertyBag>,
    assistants: Vec<Arc<dyn Assistant>>,
    conversation: Mutex<Box<dyn Conversation>>,
}

impl Orchestrator {
    /// Create an orchestrator without hooks and with default limits
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            hooks: HookRegistry::new(),
            options: AskOptions::default(),
            globals: Arc::new(PropertyBag::new()),
            assistants: Vec::new(),
            conversation: Mutex::new(Box::new(SimpleConversation::new())),
        }
    }

    /// Apply limits and the per-call timeout from configuration
    pub fn with_config(mut self, config: &OrchestratorConfig) -> Self {
        self.options = AskOptions::from(config);
        let timeout = (config.completion_timeout_seconds > 0)
            .then(|| Duration::from_secs(config.completion_timeout_seconds));
        self.hooks = self.hooks.with_completion_timeout(timeout);
        self
    }

    /// Hooks instantiated for each session started by `ask`
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        let timeout = hooks.completion_timeout().or(self.hooks.completion_timeout());
        self.hooks = hooks.with_completion_timeout(timeout);
        self
    }

    pub fn with_options(mut self, options: AskOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_conversation(mut self, conversation: Box<dyn Conversation>) -> Self {
        self.conversation = Mutex::new(conversation);
        self
    }

    /// Register an assistant and bind it to this orchestrator
    pub fn add_assistant(&mut self, assistant: Arc<dyn Assistant>) -> AgentResult<()> {
        if self
            .assistants
            .iter()
            .any(|a| a.name().eq_ignore_ascii_case(assistant.name()))
        {
            return Err(AgentError::DuplicateAssistant(assistant.name().to_string()));
        }

        assistant.bind(OrchestratorHandle::new(assistant.name(), &self.globals))?;
        info!(assistant = assistant.name(), "Assistant registered");
        self.assistants.push(assistant);
        Ok(())
    }

    pub fn assistants(&self) -> &[Arc<dyn Assistant>] {
        &self.assistants
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn set_property(&self, name: &str, value: impl Into<String>) {
        self.globals.set(name, value);
    }

    /// Global property, `None` when unset
    pub fn get_property(&self, name: &str) -> Option<String> {
        self.globals.get(name)
    }

    /// Global property, `PropertyNotFound` when unset
    pub fn require_property(&self, name: &str) -> AgentResult<String> {
        self.globals.require(name)
    }

    /// Copy of the conversation so far
    pub async fn history(&self) -> ChatHistory {
        self.conversation.lock().await.history().clone()
    }

    /// Answer a question in a fresh session
    pub async fn ask(&self, question: &str) -> AgentResult<AssistantResponse> {
        let session = self.hooks.start_session().await;
        let result = self.ask_in(&session, question, self.options).await;
        session.end().await;
        result
    }

    /// Answer a question inside a caller-owned session
    pub async fn ask_in(
        &self,
        session: &Session,
        question: &str,
        options: AskOptions,
    ) -> AgentResult<AssistantResponse> {
        info!(session = %session.id(), assistants = self.assistants.len(), "Orchestration cycle started");

        let history = self.conversation.lock().await.history().messages().to_vec();
        let prompt = OrchestratorPrompt {
            assistants: &self.assistants,
            history,
            question,
        };

        let cycle = run_cycle(
            self.provider.as_ref(),
            session,
            &self.assistants,
            &prompt,
            options.max_iterations,
        );
        let outcome = match options.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, cycle).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(deadline_ms = deadline.as_millis() as u64, "Orchestration cycle hit its deadline");
                    return Err(AgentError::Timeout(deadline));
                }
            },
            None => cycle.await,
        }?;

        self.record_turn(session, question, &outcome).await?;
        Ok(outcome.into_response())
    }

    async fn record_turn(&self, session: &Session, question: &str, outcome: &CycleOutcome) -> AgentResult<()> {
        let mut conversation = self.conversation.lock().await;
        conversation.add_user_message(session, question).await?;
        match outcome {
            CycleOutcome::Answer(text) => conversation.add_assistant_message(session, text).await,
            CycleOutcome::Function { assistant, response, .. } => {
                let mut turn = ChatHistory::new();
                assistant.append_result_to_history(&mut turn, response);
                for message in turn.messages() {
                    conversation.add_message(session, message.clone()).await?;
                }
                Ok(())
            }
        }
    }
}

struct OrchestratorPrompt<'a> {
    assistants: &'a [Arc<dyn Assistant>],
    history: Vec<Message>,
    question: &'a str,
}

#[async_trait]
impl CyclePrompt for OrchestratorPrompt<'_> {
    async fn messages(&self, results: &[String]) -> AgentResult<Vec<Message>> {
        let mut sections = PromptSections::default();
        for assistant in self.assistants {
            if let Some(fragment) = assistant.injected_prompt() {
                sections.injected.push(fragment.trim().to_string());
            }
            if let Some(facts) = assistant.facts().await {
                sections.facts.push(facts.trim().to_string());
            }
        }
        sections.facts.extend(results.iter().cloned());

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(orchestrator_prompt(&sections)?));
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(self.question));
        Ok(messages)
    }
}
