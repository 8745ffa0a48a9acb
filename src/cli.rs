use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Answer questions through a set of function-calling assistants
#[derive(Parser, Debug, Clone)]
#[command(name = "orchestrator", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "ORCHESTRATOR_CONFIG", default_value = "orchestrator.toml")]
    pub config: PathBuf,

    /// Assistant set to load
    #[arg(short, long, value_enum, env = "ORCHESTRATOR_EXAMPLE", default_value_t = Example::Math)]
    pub example: Example,

    /// Model name, overrides llm.model
    #[arg(long, env = "ORCHESTRATOR_MODEL")]
    pub model: Option<String>,

    /// Completion calls allowed per session, overrides limits.max_calls
    #[arg(long, env = "ORCHESTRATOR_MAX_CALLS")]
    pub max_calls: Option<u32>,
}

/// Ready-made assistant combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Example {
    /// Arithmetic with stored intermediate results
    Math,
    /// Audio extraction, transcription and summaries
    Video,
    /// Questions over the configured databases
    Sql,
}
