//! Thread-safe registry of named, boxed [`Agent`] implementations.

use super::adapter::Agent;
use crate::config::AgentIdentity;
use crate::{AgentPipeError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Storage and lookup for every configured agent instance, keyed by its
/// validated [`AgentIdentity`].
#[derive(Clone, Default)]
pub struct AgentRegistry {
    agents: Arc<RwLock<HashMap<AgentIdentity, Arc<dyn Agent>>>>,
}

impl AgentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            agents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register `agent` under `id`. Errors if `id` is already taken.
    pub fn register(&self, id: AgentIdentity, agent: Arc<dyn Agent>) -> Result<()> {
        let mut agents = self.agents.write();
        if agents.contains_key(&id) {
            return Err(AgentPipeError::DuplicateName(id.to_string()));
        }
        agents.insert(id, agent);
        Ok(())
    }

    /// Register `agent` under `id`, overwriting any existing entry.
    pub fn register_or_update(&self, id: AgentIdentity, agent: Arc<dyn Agent>) {
        self.agents.write().insert(id, agent);
    }

    /// Look up an agent by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Agent>> {
        self.agents
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| AgentPipeError::NotFound(name.to_string()))
    }

    /// `true` iff `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.agents.read().contains_key(name)
    }

    /// Remove and return an agent by name, if present.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.write().remove(name)
    }

    /// Every registered name, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.read().keys().map(|id| id.to_string()).collect();
        names.sort();
        names
    }
}
