//! Discovers databases and their schemas

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::state::SqlSharedState;
use crate::agents::assistant::{Assistant, AssistantContext, FunctionDescriptor, FunctionRegistry};
use crate::agents::domain::{AssistantResponse, ResponseState};
use crate::agents::llm::{CompletionRequest, LlmProvider};
use crate::agents::orchestration::prompt::render;

pub const SCHEMA_ASSISTANT: &str = "SqlSchemaAssistant";

const EXPLAIN_SCHEMA_TEMPLATE: &str = r#"You will answer the user question using the information of database schema that
are contained in the prompt, you should never use anything else than the included schema to answer the question

question: {{ question }}

SCHEMA:
{{ schema }}"#;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArguments {}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseNameArgs {
    /// Name of the database
    pub database_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExplainSchemaArgs {
    /// Name of the database
    pub database_name: String,
    /// The question of the user regarding the schema
    pub user_question: String,
}

#[derive(Serialize)]
struct ExplainSchemaPrompt<'a> {
    question: &'a str,
    schema: String,
}

/// Lists databases, caches schemas and answers questions about them
pub struct SchemaAssistant {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
}

impl SchemaAssistant {
    pub fn new(state: Arc<SqlSharedState>, provider: Arc<dyn LlmProvider>) -> Self {
        let context = AssistantContext::new(SCHEMA_ASSISTANT);
        let mut registry = FunctionRegistry::new(SCHEMA_ASSISTANT);

        let list_state = state.clone();
        let gate = state.clone();
        registry.register(
            FunctionDescriptor::typed(
                "GetDatabaseList",
                "Get the list of the database in the server",
                move |_: NoArguments, _ctx| {
                    let state = list_state.clone();
                    async move {
                        let databases = state.get_or_fetch_databases().await?;
                        Ok(AssistantResponse::with_state(
                            "retrieved list of database.",
                            ResponseState::DatabaseList { databases },
                        ))
                    }
                },
            )
            .eligible_when(move || {
                let state = gate.clone();
                async move { !state.has_database_list().await }
            }),
        );

        let retrieve_state = state.clone();
        let gate = state.clone();
        registry.register(
            FunctionDescriptor::typed(
                "RetrieveDatabaseSchema",
                "Query the database for table schema if you didn't already loaded",
                move |args: DatabaseNameArgs, _ctx| {
                    let state = retrieve_state.clone();
                    async move {
                        let schema = state.get_or_fetch_schema(&args.database_name).await?;
                        Ok(AssistantResponse::with_state(
                            "retrieved list of tables.",
                            ResponseState::Schema(schema),
                        ))
                    }
                },
            )
            .eligible_when(move || {
                let state = gate.clone();
                async move { !state.all_schemas_retrieved().await }
            }),
        );

        registry.register(
            FunctionDescriptor::typed(
                "GetTableSchemaRepresentation",
                "Get schema of tables of a database if you need the schema to answer a user question",
                move |args: ExplainSchemaArgs, ctx| {
                    let state = state.clone();
                    let provider = provider.clone();
                    async move {
                        let schema = state.get_or_fetch_schema(&args.database_name).await?;
                        let prompt = render(
                            EXPLAIN_SCHEMA_TEMPLATE,
                            &ExplainSchemaPrompt {
                                question: &args.user_question,
                                schema: schema.to_prompt(),
                            },
                        )?;
                        let answer = ctx
                            .session()
                            .complete(provider.as_ref(), CompletionRequest::from_prompt(prompt))
                            .await?;
                        Ok(AssistantResponse::terminal(answer.content()))
                    }
                },
            )
            .terminal(),
        );

        Self { context, registry }
    }
}

impl Assistant for SchemaAssistant {
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
    use crate::agents::assistant::FunctionContext;
    use crate::agents::llm::ScriptedProvider;
    use crate::agents::session::Session;
    use crate::assistants::sql::state::tests::FakeCatalog;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    async fn names(assistant: &SchemaAssistant) -> Vec<String> {
        assistant
            .list_eligible_functions()
            .await
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    fn ctx() -> FunctionContext {
        FunctionContext::new(Session::new())
    }

    #[tokio::test]
    async fn test_database_list_disappears_once_cached() {
        let catalog = Arc::new(FakeCatalog::with_databases(&["sales"]));
        let state = SqlSharedState::new(catalog.clone());
        let assistant = SchemaAssistant::new(state, Arc::new(ScriptedProvider::new("gpt-4o-mini")));

        assert!(names(&assistant).await.contains(&"GetDatabaseList".to_string()));

        let response = assistant
            .execute_function("GetDatabaseList", json!({}), ctx())
            .await
            .unwrap();
        assert_eq!(response.text, "retrieved list of database.");
        assert_eq!(
            response.state,
            Some(ResponseState::DatabaseList {
                databases: vec!["sales".to_string()]
            })
        );

        assert!(!names(&assistant).await.contains(&"GetDatabaseList".to_string()));
    }

    #[tokio::test]
    async fn test_retrieve_schema_hidden_when_all_cached() {
        let catalog = Arc::new(FakeCatalog::with_databases(&["sales"]));
        let state = SqlSharedState::new(catalog.clone());
        let assistant = SchemaAssistant::new(state.clone(), Arc::new(ScriptedProvider::new("gpt-4o-mini")));

        state.get_or_fetch_databases().await.unwrap();
        assert!(names(&assistant).await.contains(&"RetrieveDatabaseSchema".to_string()));

        assistant
            .execute_function("RetrieveDatabaseSchema", json!({ "databaseName": "sales" }), ctx())
            .await
            .unwrap();
        assistant
            .execute_function("RetrieveDatabaseSchema", json!({ "databaseName": "Sales" }), ctx())
            .await
            .unwrap();

        assert_eq!(catalog.schema_calls.load(Ordering::SeqCst), 1);
        assert_eq!(names(&assistant).await, vec!["GetTableSchemaRepresentation".to_string()]);
    }

    #[tokio::test]
    async fn test_explain_schema_is_terminal_and_uses_schema() {
        let provider = Arc::new(ScriptedProvider::new("gpt-4o-mini"));
        provider.push_text("The orders table has a total column").await;
        let state = SqlSharedState::new(Arc::new(FakeCatalog::with_databases(&["sales"])));
        let assistant = SchemaAssistant::new(state, provider.clone());

        let response = assistant
            .execute_function(
                "GetTableSchemaRepresentation",
                json!({ "databaseName": "sales", "userQuestion": "which tables hold money?" }),
                ctx(),
            )
            .await
            .unwrap();

        assert!(response.terminate_cycle);
        assert_eq!(response.text, "The orders table has a total column");
        let prompt = &provider.requests().await[0].messages[0].content;
        assert!(prompt.contains("question: which tables hold money?"));
        assert!(prompt.contains("Table main.orders\n- total : REAL\nEnd schema of table main.orders"));
    }
}
