//! Function descriptors and the per-assistant registry

use futures::future::BoxFuture;
use futures::FutureExt;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::agents::domain::{AssistantResponse, ToolDefinition};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::session::Session;

/// Per-call context handed to every executor
#[derive(Debug, Clone)]
pub struct FunctionContext {
    session: Session,
}

impl FunctionContext {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Session every nested completion call must go through
    pub fn session(&self) -> &Session {
        &self.session
    }
}

pub type FunctionExecutor =
    Arc<dyn Fn(Value, FunctionContext) -> BoxFuture<'static, AgentResult<AssistantResponse>> + Send + Sync>;

pub type EligibilityPredicate = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

/// A function an assistant offers to the model
#[derive(Clone)]
pub struct FunctionDescriptor {
    name: String,
    description: String,
    parameters: Value,
    terminal: bool,
    executor: FunctionExecutor,
    eligibility: Option<EligibilityPredicate>,
}

impl FunctionDescriptor {
    /// Create a descriptor over raw JSON arguments
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        executor: F,
    ) -> Self
    where
        F: Fn(Value, FunctionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<AssistantResponse>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            terminal: false,
            executor: Arc::new(move |args, ctx| executor(args, ctx).boxed()),
            eligibility: None,
        }
    }

    /// Create a descriptor whose arguments deserialize into `A`
    ///
    /// The parameter schema is derived from `A`.
    pub fn typed<A, F, Fut>(name: impl Into<String>, description: impl Into<String>, executor: F) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(A, FunctionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AgentResult<AssistantResponse>> + Send + 'static,
    {
        let name = name.into();
        let function = name.clone();
        let executor: FunctionExecutor = Arc::new(move |args, ctx| match serde_json::from_value::<A>(args) {
            Ok(parsed) => executor(parsed, ctx).boxed(),
            Err(e) => {
                let error = AgentError::InvalidArguments {
                    function: function.clone(),
                    reason: e.to_string(),
                };
                async move { Err::<AssistantResponse, _>(error) }.boxed()
            }
        });

        Self {
            name,
            description: description.into(),
            parameters: parameters_schema::<A>(),
            terminal: false,
            executor,
            eligibility: None,
        }
    }

    /// Mark the function as ending the cycle whenever it is called
    pub fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }

    /// Offer the function only while `predicate` resolves to true
    pub fn eligible_when<P, Fut>(mut self, predicate: P) -> Self
    where
        P: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.eligibility = Some(Arc::new(move || predicate().boxed()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub async fn is_eligible(&self) -> bool {
        match &self.eligibility {
            Some(predicate) => predicate().await,
            None => true,
        }
    }

    /// Definition sent to the completion service
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name, &self.description, self.parameters.clone())
    }

    async fn invoke(&self, arguments: Value, ctx: FunctionContext) -> AgentResult<AssistantResponse> {
        (self.executor)(arguments, ctx).await
    }
}

impl std::fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("terminal", &self.terminal)
            .field("conditional", &self.eligibility.is_some())
            .finish()
    }
}

/// JSON schema of `A` without the draft and title noise
pub fn parameters_schema<A: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(A);
    let mut value = serde_json::to_value(&schema).unwrap_or_else(|_| json!({ "type": "object" }));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    value
}

/// Functions of one assistant, in registration order
#[derive(Debug, Default, Clone)]
pub struct FunctionRegistry {
    owner: String,
    functions: Vec<FunctionDescriptor>,
}

impl FunctionRegistry {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            functions: Vec::new(),
        }
    }

    /// Register a function; a later registration with the same name replaces it
    pub fn register(&mut self, descriptor: FunctionDescriptor) {
        if let Some(existing) = self
            .functions
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(&descriptor.name))
        {
            warn!(assistant = %self.owner, function = %descriptor.name, "Replacing registered function");
            *existing = descriptor;
        } else {
            self.functions.push(descriptor);
        }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Functions whose predicate currently passes
    pub async fn list_eligible(&self) -> Vec<FunctionDescriptor> {
        let mut eligible = Vec::with_capacity(self.functions.len());
        for function in &self.functions {
            if function.is_eligible().await {
                eligible.push(function.clone());
            }
        }
        eligible
    }

    /// Execute a function by name
    pub async fn execute(
        &self,
        name: &str,
        arguments: Value,
        ctx: FunctionContext,
    ) -> AgentResult<AssistantResponse> {
        let function = self
            .get(name)
            .ok_or_else(|| AgentError::FunctionNotFound(name.to_string()))?;

        let arguments = if arguments.is_null() { json!({}) } else { arguments };
        let rendered = arguments.to_string();
        debug!(assistant = %self.owner, function = %function.name, arguments = %rendered, "Executing function");

        function.invoke(arguments, ctx).await.map_err(|e| {
            if e.is_interruption() {
                e
            } else {
                AgentError::ExecutorFailure {
                    function: function.name.clone(),
                    arguments: rendered,
                    source: Box::new(e),
                }
            }
        })
    }
}
