use super::*;
use crate::agents::session::Session;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Deserialize, JsonSchema)]
struct SelectArgs {
    /// Database to work with
    database: String,
}

#[derive(Deserialize, JsonSchema)]
struct NoArgs {}

/// Two functions gated on the "db" property
struct DatabasePicker {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
}

impl DatabasePicker {
    fn new() -> Self {
        let context = AssistantContext::new("DatabasePicker");
        let mut registry = FunctionRegistry::new("DatabasePicker");

        let select_ctx = context.clone();
        let gate = context.clone();
        registry.register(
            FunctionDescriptor::typed("SelectDatabase", "Choose a database", move |args: SelectArgs, _ctx| {
                let context = select_ctx.clone();
                async move {
                    context.set_local_property("db", args.database.clone());
                    Ok(AssistantResponse::new(format!("selected {}", args.database)))
                }
            })
            .eligible_when(move || {
                let context = gate.clone();
                async move { !context.properties().contains("db") }
            }),
        );

        let gate = context.clone();
        registry.register(
            FunctionDescriptor::typed("ListTables", "List tables of the selected database", |_: NoArgs, _ctx| async {
                Ok(AssistantResponse::new("orders, customers"))
            })
            .eligible_when(move || {
                let context = gate.clone();
                async move { context.properties().contains("db") }
            }),
        );

        Self { context, registry }
    }
}

impl Assistant for DatabasePicker {
    fn context(&self) -> &AssistantContext {
        &self.context
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

/// One function always offered, one gated on the orchestrator-global "db"
struct SalesReporter {
    context: Arc<AssistantContext>,
    registry: FunctionRegistry,
}

impl SalesReporter {
    fn new() -> Self {
        let context = AssistantContext::new("SalesReporter");
        let mut registry = FunctionRegistry::new("SalesReporter");

        registry.register(FunctionDescriptor::typed("ListRegions", "List sales regions", |_: NoArgs, _ctx| async {
            Ok(AssistantResponse::new("north, south"))
        }));

        let report_ctx = context.clone();
        let gate = context.clone();
        registry.register(
            FunctionDescriptor::typed("ReportSales", "Report sales of the chosen region", move |_: NoArgs, _ctx| {
                let context = report_ctx.clone();
                async move {
                    let region = context.orchestrator()?.require_property("db")?;
                    Ok(AssistantResponse::new(format!("sales of {}", region)))
                }
            })
            .eligible_when(move || {
                let context = gate.clone();
                async move { matches!(context.global_property("db"), Ok(Some(_))) }
            }),
        );

        Self { context, registry }
    }
}

impl Assistant for SalesReporter {
    fn context(&self) -> &AssistantContext {
        &self.context
    }

    fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

fn ctx() -> FunctionContext {
    FunctionContext::new(Session::new())
}

fn names(functions: &[FunctionDescriptor]) -> Vec<&str> {
    functions.iter().map(|f| f.name()).collect()
}

#[tokio::test]
async fn test_eligibility_follows_property() {
    let assistant = DatabasePicker::new();

    let before = assistant.list_eligible_functions().await;
    assert_eq!(names(&before), vec!["SelectDatabase"]);

    assistant
        .execute_function("SelectDatabase", json!({ "database": "sales" }), ctx())
        .await
        .unwrap();

    let after = assistant.list_eligible_functions().await;
    assert_eq!(names(&after), vec!["ListTables"]);
    assert_eq!(assistant.get_property("DB").as_deref(), Some("sales"));
}

#[tokio::test]
async fn test_eligibility_follows_global_property() {
    let globals = Arc::new(PropertyBag::new());
    let reporter = SalesReporter::new();
    let picker = DatabasePicker::new();
    reporter.bind(OrchestratorHandle::new("orchestrator", &globals)).unwrap();
    picker.bind(OrchestratorHandle::new("orchestrator", &globals)).unwrap();

    let before = reporter.list_eligible_functions().await;
    assert_eq!(names(&before), vec!["ListRegions"]);

    // set by a different assistant
    picker.context().set_global_property("db", "north").unwrap();

    let after = reporter.list_eligible_functions().await;
    assert_eq!(names(&after), vec!["ListRegions", "ReportSales"]);
    assert!(reporter.get_property("db").is_none());

    let response = reporter
        .execute_function("ReportSales", json!({}), ctx())
        .await
        .unwrap();
    assert_eq!(response.text, "sales of north");
}

#[tokio::test]
async fn test_global_gate_closed_while_unbound() {
    let reporter = SalesReporter::new();
    let listed = reporter.list_eligible_functions().await;
    assert_eq!(names(&listed), vec!["ListRegions"]);
}

#[tokio::test]
async fn test_unknown_function_is_not_found() {
    let assistant = DatabasePicker::new();
    let result = assistant.execute_function("DropEverything", json!({}), ctx()).await;
    assert!(matches!(result, Err(AgentError::FunctionNotFound(name)) if name == "DropEverything"));
}

#[tokio::test]
async fn test_lookup_is_case_insensitive() {
    let assistant = DatabasePicker::new();
    let response = assistant
        .execute_function("selectdatabase", json!({ "database": "hr" }), ctx())
        .await
        .unwrap();
    assert_eq!(response.text, "selected hr");
}

#[tokio::test]
async fn test_invalid_arguments_are_wrapped() {
    let assistant = DatabasePicker::new();
    let result = assistant.execute_function("SelectDatabase", json!({}), ctx()).await;

    match result {
        Err(AgentError::ExecutorFailure { function, source, .. }) => {
            assert_eq!(function, "SelectDatabase");
            assert!(matches!(*source, AgentError::InvalidArguments { .. }));
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancellation_is_not_wrapped() {
    let mut registry = FunctionRegistry::new("Test");
    registry.register(FunctionDescriptor::new("Stop", "", json!({}), |_, _| async {
        Err(AgentError::Cancelled)
    }));

    let result = registry.execute("Stop", json!({}), ctx()).await;
    assert!(matches!(result, Err(AgentError::Cancelled)));
}

#[tokio::test]
async fn test_register_replaces_same_name() {
    let mut registry = FunctionRegistry::new("Test");
    registry.register(FunctionDescriptor::new("Answer", "first", json!({}), |_, _| async {
        Ok(AssistantResponse::new("first"))
    }));
    registry.register(
        FunctionDescriptor::new("answer", "second", json!({}), |_, _| async {
            Ok(AssistantResponse::new("second"))
        })
        .terminal(),
    );

    assert_eq!(registry.len(), 1);
    assert!(registry.get("Answer").unwrap().is_terminal());
    let response = registry.execute("ANSWER", json!(null), ctx()).await.unwrap();
    assert_eq!(response.text, "second");
}

#[tokio::test]
async fn test_predicates_evaluated_every_time() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let counter = evaluations.clone();

    let mut registry = FunctionRegistry::new("Test");
    registry.register(
        FunctionDescriptor::new("Ping", "", json!({}), |_, _| async { Ok(AssistantResponse::new("pong")) })
            .eligible_when(move || {
                let counter = counter.clone();
                async move { counter.fetch_add(1, Ordering::SeqCst) < 1 }
            }),
    );

    assert_eq!(registry.list_eligible().await.len(), 1);
    assert_eq!(registry.list_eligible().await.len(), 0);
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
}

#[test]
fn test_typed_schema_lists_arguments() {
    let schema = parameters_schema::<SelectArgs>();
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["properties"]["database"]["type"], "string");
    assert_eq!(schema["required"][0], "database");
    assert!(schema.get("$schema").is_none());
    assert!(schema.get("title").is_none());
}

#[test]
fn test_bind_only_once() {
    let globals = Arc::new(PropertyBag::new());
    let assistant = DatabasePicker::new();

    assistant.bind(OrchestratorHandle::new("orchestrator", &globals)).unwrap();
    assert!(assistant.context().is_bound());
    assert!(matches!(
        assistant.bind(OrchestratorHandle::new("orchestrator", &globals)),
        Err(AgentError::Configuration(_))
    ));
}

#[test]
fn test_global_properties_through_context() {
    let globals = Arc::new(PropertyBag::new());
    let assistant = DatabasePicker::new();
    assert!(matches!(
        assistant.context().set_global_property("x", "1"),
        Err(AgentError::OrchestratorUnavailable(_))
    ));

    assistant.bind(OrchestratorHandle::new("orchestrator", &globals)).unwrap();
    assistant.context().set_global_property("Summary", "short").unwrap();
    assert_eq!(globals.get("summary").as_deref(), Some("short"));
    assert_eq!(assistant.context().global_property("SUMMARY").unwrap().as_deref(), Some("short"));
}
