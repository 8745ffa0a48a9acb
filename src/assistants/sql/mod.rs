//! SQL assistant: a composite that runs its own function-calling cycle
//!
//! The orchestrator sees a single function, `ExecuteDatabaseOperation`.
//! Inside it, the schema assistant and the query executor cooperate through
//! [`SqlSharedState`] until one of them produces a terminal result.

mod catalog;
mod query;
mod schema;
mod state;

pub use catalog::{DatabaseCatalog, SqliteCatalog};
pub use query::{QueryExecutor, QUERY_EXECUTOR, QUERY_RESULT_PROPERTY};
pub use schema::{SchemaAssistant, SCHEMA_ASSISTANT};
pub use state::SqlSharedState;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::agents::assistant::{
    Assistant, AssistantContext, FunctionDescriptor, FunctionRegistry, OrchestratorHandle,
};
use crate::agents::config::ModelRoutingConfig;
use crate::agents::domain::{AssistantResponse, Message};
use crate::agents::error::{AgentResult, LlmResult};
use crate::agents::interaction::UserInteraction;
use crate::agents::llm::{LlmProvider, ProviderRegistry};
use crate::agents::orchestration::prompt::render;
use crate::agents::orchestration::{run_cycle, CyclePrompt};

pub const SQL_ASSISTANT: &str = "SqlAssistant";

const DEFAULT_MAX_ITERATIONS: u32 = 10;

const SQL_PROMPT_TEMPLATE: &str = r#"You are a sql assistant, capable of performing query and various operation on the database.
You will be asked to answer to a question. You can use the FACTS that follows to answer the question.
If Facts does not contains data to answer you can call functions to get more FACTS.

FACTS:
{{ facts }}{% for result in results %}{{ result }}
{% endfor %}
Question: {{ question }}"#;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteDatabaseOperationArgs {
    /// the operation to execute expressed in natural language
    pub operation_to_execute: String,
}

#[derive(Serialize)]
struct SqlPromptValues<'a> {
    facts: String,
    results: &'a [String],
    question: &'a str,
}

struct SqlCyclePrompt<'a> {
    state: &'a SqlSharedState,
    question: &'a str,
}

#[async_trait]
impl CyclePrompt for SqlCyclePrompt<'_> {
    async fn messages(&self, results: &[String]) -> AgentResult<Vec<Message>> {
        let prompt = render(
            SQL_PROMPT_TEMPLATE,
            &SqlPromptValues {
                facts: self.state.to_fact_text().await,
                results,
                question: self.question,
            },
        )?;
        Ok(vec![Message::user(prompt)])
    }
}

/// Completion services used inside the SQL assistant
#[derive(Clone)]
pub struct SqlProviders {
    /// Drives the inner function-calling cycle
    pub cycle: Arc<dyn LlmProvider>,
    /// Answers questions about a schema
    pub schema: Arc<dyn LlmProvider>,
    /// Rewrites requests into SQL
    pub query: Arc<dyn LlmProvider>,
}

impl SqlProviders {
    /// One provider for every step
    pub fn single(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            cycle: provider.clone(),
            schema: provider.clone(),
            query: provider,
        }
    }

    /// Resolve the routed connections; schema and query fall back to the `sql` route
    pub fn from_registry(registry: &ProviderRegistry, routing: &ModelRoutingConfig) -> LlmResult<Self> {
        let sql = routing.sql.as_deref();
        Ok(Self {
            cycle: registry.resolve(sql)?,
            schema: registry.resolve(routing.sql_schema.as_deref().or(sql))?,
            query: registry.resolve(routing.sql_query.as_deref().or(sql))?,
        })
    }
}

/// Composite over [`SchemaAssistant`] and [`QueryExecutor`]
pub struct SqlAssistant {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
    state: Arc<SqlSharedState>,
    members: Vec<Arc<dyn Assistant>>,
}

impl SqlAssistant {
    pub fn new(
        catalog: Arc<dyn DatabaseCatalog>,
        provider: Arc<dyn LlmProvider>,
        interaction: Arc<dyn UserInteraction>,
    ) -> Self {
        Self::with_providers(catalog, SqlProviders::single(provider), interaction, DEFAULT_MAX_ITERATIONS)
    }

    /// Use a provider per step and bound the inner cycle to `max_iterations` rounds
    pub fn with_providers(
        catalog: Arc<dyn DatabaseCatalog>,
        providers: SqlProviders,
        interaction: Arc<dyn UserInteraction>,
        max_iterations: u32,
    ) -> Self {
        let state = SqlSharedState::new(catalog);
        let members: Vec<Arc<dyn Assistant>> = vec![
            Arc::new(SchemaAssistant::new(state.clone(), providers.schema)),
            Arc::new(QueryExecutor::new(state.clone(), providers.query, interaction)),
        ];
        let provider = providers.cycle;

        let context = AssistantContext::new(SQL_ASSISTANT);
        let mut registry = FunctionRegistry::new(SQL_ASSISTANT);

        let cycle_state = state.clone();
        let cycle_members = members.clone();
        registry.register(FunctionDescriptor::typed(
            "ExecuteDatabaseOperation",
            "Execute various operation in database, executes query in natural language, get schema etc, everything is expressed in natural language",
            move |args: ExecuteDatabaseOperationArgs, ctx| {
                let state = cycle_state.clone();
                let members = cycle_members.clone();
                let provider = provider.clone();
                async move {
                    info!(operation = %args.operation_to_execute, "Database operation started");
                    let prompt = SqlCyclePrompt {
                        state: &state,
                        question: &args.operation_to_execute,
                    };
                    let outcome = run_cycle(provider.as_ref(), ctx.session(), &members, &prompt, max_iterations).await?;

                    // a terminal member result ends the inner cycle only
                    let mut response = outcome.into_response();
                    response.terminate_cycle = false;
                    Ok(response)
                }
            },
        ));

        Self {
            context,
            registry,
            state,
            members,
        }
    }

    pub fn shared_state(&self) -> &Arc<SqlSharedState> {
        &self.state
    }

    pub fn members(&self) -> &[Arc<dyn Assistant>] {
        &self.members
    }
}

#[async_trait]
impl Assistant for SqlAssistant {
    fn context(&self) -> &AssistantContext {
        &self.context
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    fn injected_prompt(&self) -> Option<String> {
        Some(
            "If the question regards databases and you do not have information in the FACTS, you can call ExecuteDatabaseOperation"
                .to_string(),
        )
    }

    async fn facts(&self) -> Option<String> {
        let facts = self.state.to_fact_text().await;
        (!facts.is_empty()).then_some(facts)
    }

    fn bind(&self, handle: OrchestratorHandle) -> AgentResult<()> {
        for member in &self.members {
            member.bind(handle.clone())?;
        }
        self.context.bind(handle)
    }
}
