//! Assistants: stateful plugins exposing functions to the orchestrator
//!
//! Every assistant owns an [`AssistantContext`] (name, local properties,
//! orchestrator binding) and a [`FunctionRegistry`]. Executors registered in
//! the registry capture clones of the context `Arc`, so they can read and
//! write properties without borrowing the assistant itself.

mod property;
mod registry;

#[cfg(test)]
mod registry_test;

pub use property::{OrchestratorHandle, PropertyBag};
pub use registry::{
    parameters_schema, EligibilityPredicate, FunctionContext, FunctionDescriptor, FunctionExecutor,
    FunctionRegistry,
};

use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

use crate::agents::domain::{AssistantResponse, ChatHistory};
use crate::agents::error::{AgentError, AgentResult};

/// Name, local properties and orchestrator binding of one assistant
#[derive(Debug)]
pub struct AssistantContext {
    name: String,
    properties: PropertyBag,
    orchestrator: OnceLock<OrchestratorHandle>,
}

impl AssistantContext {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            properties: PropertyBag::new(),
            orchestrator: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Bind to an orchestrator; an assistant can be bound only once
    pub fn bind(&self, handle: OrchestratorHandle) -> AgentResult<()> {
        self.orchestrator
            .set(handle.for_owner(&self.name))
            .map_err(|_| AgentError::Configuration(format!("Assistant {} is already bound", self.name)))
    }

    pub fn is_bound(&self) -> bool {
        self.orchestrator.get().is_some()
    }

    pub fn orchestrator(&self) -> AgentResult<&OrchestratorHandle> {
        self.orchestrator
            .get()
            .ok_or_else(|| AgentError::OrchestratorUnavailable(self.name.clone()))
    }

    pub fn set_local_property(&self, name: &str, value: impl Into<String>) {
        self.properties.set(name, value);
    }

    pub fn set_global_property(&self, name: &str, value: impl Into<String>) -> AgentResult<()> {
        self.orchestrator()?.set_global_property(name, value)
    }

    /// Read an orchestrator-level property, `None` when unset
    pub fn global_property(&self, name: &str) -> AgentResult<Option<String>> {
        self.orchestrator()?.get_property(name)
    }
}

/// Contract between the orchestrator and every assistant
#[async_trait]
pub trait Assistant: Send + Sync {
    fn context(&self) -> &AssistantContext;

    fn registry(&self) -> &FunctionRegistry;

    fn name(&self) -> &str {
        self.context().name()
    }

    /// Prompt fragment added to every orchestration request
    fn injected_prompt(&self) -> Option<String> {
        None
    }

    /// Functions offered to the model in the current cycle
    async fn list_eligible_functions(&self) -> Vec<FunctionDescriptor> {
        self.registry().list_eligible().await
    }

    async fn execute_function(
        &self,
        name: &str,
        arguments: Value,
        ctx: FunctionContext,
    ) -> AgentResult<AssistantResponse> {
        self.registry().execute(name, arguments, ctx).await
    }

    /// Fact text describing a result, shown to the model in later requests
    fn format_result_as_fact(&self, response: &AssistantResponse) -> String {
        response.text.clone()
    }

    /// Record a result in the conversation visible to the model
    fn append_result_to_history(&self, history: &mut ChatHistory, response: &AssistantResponse) {
        history.add_assistant(response.text.clone());
    }

    /// Facts about the assistant's own state
    async fn facts(&self) -> Option<String> {
        None
    }

    /// Bind to an orchestrator; composite assistants also bind their members
    fn bind(&self, handle: OrchestratorHandle) -> AgentResult<()> {
        self.context().bind(handle)
    }

    fn get_property(&self, name: &str) -> Option<String> {
        self.context().properties().get(name)
    }

    fn require_property(&self, name: &str) -> AgentResult<String> {
        self.context().properties().require(name)
    }

    fn set_property(&self, name: &str, value: String) {
        self.context().set_local_property(name, value);
    }
}
