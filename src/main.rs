use assistant_orchestrator::agents::{
    create_conversation, AgentError, CallLimiter, ConsoleUserInteraction, HookRegistry,
    Orchestrator, ProviderRegistry, TokenUsageCounter, UserInteraction,
};
use assistant_orchestrator::agents::session::{ObservationHook, WrappingHook};
use assistant_orchestrator::assistants::{
    AnswerAssistant, AudioVideoAssistant, CommandLineMediaToolkit, MathAssistant, SqlAssistant,
    SqlProviders, SqliteCatalog, SummaryAssistant,
};
use assistant_orchestrator::cli::{Cli, Example};
use assistant_orchestrator::config::Settings;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings = Settings::new_with_cli(&cli)?;
    info!(
        provider = %settings.llm.provider,
        model = %settings.llm.model,
        example = ?cli.example,
        "Starting orchestrator"
    );

    let registry = ProviderRegistry::from_config(&settings.llm, &settings.providers)?;
    let routing = &settings.routing;

    // The limiter is per session, the usage counter spans the whole run
    let usage = Arc::new(TokenUsageCounter::new());
    let mut hooks = HookRegistry::new();
    if let Some(max_calls) = settings.limits.max_calls {
        hooks = hooks.with_wrapping(move || Arc::new(CallLimiter::new(max_calls)) as Arc<dyn WrappingHook>);
    }
    let shared_usage = usage.clone();
    hooks = hooks.with_observation(move || shared_usage.clone() as Arc<dyn ObservationHook>);

    let conversation_provider = registry.resolve(routing.conversation.as_deref())?;
    let mut orchestrator = Orchestrator::new(registry.resolve(routing.orchestrator.as_deref())?)
        .with_config(&settings.orchestrator)
        .with_hooks(hooks)
        .with_conversation(create_conversation(&settings.conversation, conversation_provider));

    let interaction = Arc::new(ConsoleUserInteraction::new());
    let catalog = register_assistants(&mut orchestrator, &cli, &settings, &registry, interaction.clone())?;

    loop {
        let question = match interaction.ask_question("Question (empty line to quit):").await {
            Ok(question) => question,
            Err(AgentError::Cancelled) => break,
            Err(e) => return Err(e.into()),
        };
        if question.is_empty() {
            break;
        }

        match orchestrator.ask(&question).await {
            Ok(answer) => println!("{}\n", answer.text),
            Err(e) => error!("Unable to answer: {}", e),
        }
        println!("{}", usage.report().await);
    }

    if let Some(catalog) = catalog {
        catalog.close().await;
    }
    info!("Orchestrator stopped");
    Ok(())
}

/// Register the assistant set selected on the command line
fn register_assistants(
    orchestrator: &mut Orchestrator,
    cli: &Cli,
    settings: &Settings,
    registry: &ProviderRegistry,
    interaction: Arc<dyn UserInteraction>,
) -> anyhow::Result<Option<Arc<SqliteCatalog>>> {
    let mut catalog = None;
    match cli.example {
        Example::Math => {
            orchestrator.add_assistant(Arc::new(MathAssistant::new()))?;
        }
        Example::Video => {
            let toolkit = Arc::new(CommandLineMediaToolkit::new(settings.media.clone()));
            orchestrator.add_assistant(Arc::new(AudioVideoAssistant::new(toolkit)))?;
            orchestrator.add_assistant(Arc::new(SummaryAssistant::new(
                registry.resolve(settings.routing.summary.as_deref())?,
            )))?;
        }
        Example::Sql => {
            if settings.databases.is_empty() {
                anyhow::bail!("The sql example needs at least one [[databases]] entry");
            }
            let sqlite = Arc::new(SqliteCatalog::new(settings.databases.clone()));
            orchestrator.add_assistant(Arc::new(SqlAssistant::with_providers(
                sqlite.clone(),
                SqlProviders::from_registry(registry, &settings.routing)?,
                interaction,
                settings.orchestrator.max_iterations,
            )))?;
            catalog = Some(sqlite);
        }
    }
    orchestrator.add_assistant(Arc::new(AnswerAssistant::new()))?;
    Ok(catalog)
}
