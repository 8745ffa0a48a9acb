//! Turns natural-language requests into SQL and runs them

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::state::SqlSharedState;
use crate::agents::assistant::{
    parameters_schema, Assistant, AssistantContext, FunctionDescriptor, FunctionRegistry,
};
use crate::agents::domain::{AssistantResponse, DatabaseSchema, ResponseState, ToolDefinition};
use crate::agents::error::{AgentError, AgentResult};
use crate::agents::interaction::UserInteraction;
use crate::agents::llm::{CompletionRequest, LlmProvider, ToolChoice};
use crate::agents::orchestration::prompt::render;
use crate::agents::session::Session;

pub const QUERY_EXECUTOR: &str = "SqlQueryExecutor";

/// Global property receiving the markdown rendering of the last result
pub const QUERY_RESULT_PROPERTY: &str = "queryresult";

const DESCRIBE_FUNCTION: &str = "describe";

const REWRITE_TEMPLATE: &str = r#"You are a SQLite expert, you will be given a query described in natural
language form or in SQL form and you need to generate a valid SQL query given the following schema of the database.

Database schema: {{ schema }}
User Query: {{ query }}"#;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteQueryArgs {
    /// Name of the database, it can be null if the user still did not choose a database
    #[serde(default)]
    pub database_name: Option<String>,
    /// Query to execute in natural language
    pub query: String,
}

/// Arguments of the function the model must call with the SQL text
#[derive(Debug, Deserialize, JsonSchema)]
pub struct DescribeArgs {
    /// SQL query in SQLite syntax
    pub query: String,
}

#[derive(Serialize)]
struct RewritePrompt<'a> {
    schema: String,
    query: &'a str,
}

/// Executes queries against the database chosen by the user
pub struct QueryExecutor {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
}

impl QueryExecutor {
    pub fn new(
        state: Arc<SqlSharedState>,
        provider: Arc<dyn LlmProvider>,
        interaction: Arc<dyn UserInteraction>,
    ) -> Self {
        let context = AssistantContext::new(QUERY_EXECUTOR);
        let mut registry = FunctionRegistry::new(QUERY_EXECUTOR);

        let query_ctx = context.clone();
        registry.register(FunctionDescriptor::typed(
            "ExecuteQuery",
            "Execute a query expressed in natural language or SQL against a database",
            move |args: ExecuteQueryArgs, ctx| {
                let context = query_ctx.clone();
                let state = state.clone();
                let provider = provider.clone();
                let interaction = interaction.clone();
                async move {
                    let database = match args.database_name.filter(|d| !d.trim().is_empty()) {
                        Some(database) => database,
                        None => choose_database(&state, interaction.as_ref()).await?,
                    };

                    let schema = state.get_or_fetch_schema(&database).await?;
                    let sql = rewrite_query(provider.as_ref(), ctx.session(), &args.query, &schema).await?;
                    let table = state.catalog().execute_query(&database, &sql).await?;
                    info!(database = %database, rows = table.rows.len(), "Query executed");

                    // awaited update first, the property write cannot be interrupted
                    state.set_last_query(table.clone()).await;
                    context.set_global_property(QUERY_RESULT_PROPERTY, table.to_markdown())?;
                    Ok(AssistantResponse::with_state(
                        "Query executed, result is in variable queryresult",
                        ResponseState::Query(table),
                    )
                    .terminating())
                }
            },
        ));

        Self { context, registry }
    }
}

impl Assistant for QueryExecutor {
    fn context(&self) -> &AssistantContext {
        &self.context
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

/// Reuse the chosen database, otherwise let the user pick one
async fn choose_database(state: &SqlSharedState, interaction: &dyn UserInteraction) -> AgentResult<String> {
    if let Some(current) = state.current_database().await {
        return Ok(current);
    }

    let databases = state.get_or_fetch_databases().await?;
    if databases.is_empty() {
        return Err(AgentError::Database("No database available".to_string()));
    }

    let database = interaction
        .ask_for_selection("Please choose a database", &databases)
        .await?;
    state.set_current_database(database.clone()).await;
    Ok(database)
}

/// Ask the model for SQL through a forced call to `describe`
async fn rewrite_query(
    provider: &dyn LlmProvider,
    session: &Session,
    query: &str,
    schema: &DatabaseSchema,
) -> AgentResult<String> {
    let prompt = render(
        REWRITE_TEMPLATE,
        &RewritePrompt {
            schema: schema.to_prompt(),
            query,
        },
    )?;
    let describe = ToolDefinition::new(
        DESCRIBE_FUNCTION,
        "Execute a query against database",
        parameters_schema::<DescribeArgs>(),
    );
    let request = CompletionRequest::from_prompt(prompt).with_tools(
        vec![describe],
        ToolChoice::Tool {
            name: DESCRIBE_FUNCTION.to_string(),
        },
    );

    let response = session.complete(provider, request).await?;
    let call = response
        .tool_calls()
        .iter()
        .find(|c| c.name == DESCRIBE_FUNCTION)
        .ok_or_else(|| AgentError::InvalidArguments {
            function: DESCRIBE_FUNCTION.to_string(),
            reason: "the model did not produce a query".to_string(),
        })?;

    let args: DescribeArgs =
        serde_json::from_value(call.arguments.clone()).map_err(|e| AgentError::InvalidArguments {
            function: DESCRIBE_FUNCTION.to_string(),
            reason: e.to_string(),
        })?;
    Ok(args.query)
}
