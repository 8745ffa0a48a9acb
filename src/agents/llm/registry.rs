//! Named completion-service connections shared by every assistant

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

use super::{create_provider, LlmProvider};
use crate::agents::config::LlmProviderConfig;
use crate::agents::error::{LlmError, LlmResult};

/// Name under which the `[llm]` section is registered
pub const DEFAULT_PROVIDER: &str = "default";

/// Immutable map from connection name to provider
///
/// Built once at startup; assistants resolve the connection they use by name
/// and a missing name falls back to [`DEFAULT_PROVIDER`].
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new(default: Arc<dyn LlmProvider>) -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(DEFAULT_PROVIDER.to_string(), default);
        Self { providers }
    }

    /// Register (or replace) a named provider
    pub fn with_provider(mut self, name: impl Into<String>, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(name.into().to_lowercase(), provider);
        self
    }

    /// Create every configured connection
    pub fn from_config(
        default: &LlmProviderConfig,
        named: &HashMap<String, LlmProviderConfig>,
    ) -> LlmResult<Self> {
        let mut registry = Self::new(create_provider(default)?);
        for (name, config) in named {
            info!(name = %name, provider = %config.provider, model = %config.model, "Provider registered");
            registry = registry.with_provider(name.as_str(), create_provider(config)?);
        }
        Ok(registry)
    }

    /// Provider registered under `name` (case-insensitive)
    pub fn get(&self, name: &str) -> LlmResult<Arc<dyn LlmProvider>> {
        self.providers
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| LlmError::ProviderNotFound(name.to_string()))
    }

    /// `name` when routed, the default connection otherwise
    pub fn resolve(&self, name: Option<&str>) -> LlmResult<Arc<dyn LlmProvider>> {
        self.get(name.unwrap_or(DEFAULT_PROVIDER))
    }

    pub fn default_provider(&self) -> LlmResult<Arc<dyn LlmProvider>> {
        self.get(DEFAULT_PROVIDER)
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}
