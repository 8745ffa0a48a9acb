//! Named string properties at assistant and orchestrator level

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::agents::error::{AgentError, AgentResult};

/// String map with case-insensitive keys
#[derive(Debug, Default)]
pub struct PropertyBag {
    values: RwLock<HashMap<String, String>>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str) -> String {
        name.to_lowercase()
    }

    /// Insert or overwrite a property
    pub fn set(&self, name: &str, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(Self::key(name), value.into());
    }

    /// Read a property, `None` when unset
    pub fn get(&self, name: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&Self::key(name))
            .cloned()
    }

    /// Read a property, failing with `PropertyNotFound` when unset
    pub fn require(&self, name: &str) -> AgentResult<String> {
        self.get(name)
            .ok_or_else(|| AgentError::PropertyNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&Self::key(name))
    }

    pub fn len(&self) -> usize {
        self.values.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Non-owning access to an orchestrator's global properties
///
/// Assistants receive one when they are added to an orchestrator. It keeps no
/// strong reference, so an assistant never keeps its orchestrator alive.
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    name: String,
    globals: Weak<PropertyBag>,
}

impl OrchestratorHandle {
    pub(crate) fn new(name: impl Into<String>, globals: &Arc<PropertyBag>) -> Self {
        Self {
            name: name.into(),
            globals: Arc::downgrade(globals),
        }
    }

    fn globals(&self) -> AgentResult<Arc<PropertyBag>> {
        self.globals
            .upgrade()
            .ok_or_else(|| AgentError::OrchestratorUnavailable(self.name.clone()))
    }

    /// Name of the assistant holding this handle
    pub fn owner(&self) -> &str {
        &self.name
    }

    pub fn set_global_property(&self, name: &str, value: impl Into<String>) -> AgentResult<()> {
        self.globals()?.set(name, value);
        Ok(())
    }

    pub fn get_property(&self, name: &str) -> AgentResult<Option<String>> {
        Ok(self.globals()?.get(name))
    }

    pub fn require_property(&self, name: &str) -> AgentResult<String> {
        self.globals()?.require(name)
    }

    /// Copy of this handle for another assistant
    pub(crate) fn for_owner(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: self.globals.clone(),
        }
    }
}
