use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

pub mod validator;

use crate::agents::config::{
    ConversationConfig, DatabaseConfig, LimitsConfig, LlmProviderConfig, MediaConfig,
    ModelRoutingConfig, OrchestratorConfig,
};
use crate::cli::Cli;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    /// Default connection, registered as `default`
    #[serde(default)]
    pub llm: LlmProviderConfig,
    /// Extra named connections (`[providers.<name>]`)
    #[serde(default)]
    pub providers: HashMap<String, LlmProviderConfig>,
    #[serde(default)]
    pub routing: ModelRoutingConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub conversation: ConversationConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Databases exposed to the SQL assistant
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,
    #[serde(default)]
    pub media: MediaConfig,
}

impl Settings {
    /// Create settings from CLI arguments (config file, then CLI overrides)
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::load(&cli.config)?;

        // CLI > env vars > config file
        settings.apply_cli_overrides(cli);

        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate settings from a config file; a missing file yields defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        let settings = Self::load(path.as_ref())?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::from(path.to_path_buf()).required(false))
            .set_default("llm.provider", "openai")?
            .set_default("llm.model", "gpt-4o-mini")?
            .set_default("orchestrator.max_iterations", 10)?
            .set_default("orchestrator.timeout_seconds", 300)?
            .set_default("orchestrator.completion_timeout_seconds", 120)?
            .set_default("conversation.max_tokens", 2000)?
            .build()?;

        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(model) = &cli.model {
            self.llm.model = model.clone();
        }
        if let Some(max_calls) = cli.max_calls {
            self.limits.max_calls = Some(max_calls);
        }
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        validator::ConfigValidator::validate(self).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })
    }
}
