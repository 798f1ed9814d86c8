//! Agent and tool discovery (C4): register agents/tools, look them up by
//! id/type/tool-name, and roll up health. The registry is the single
//! owner of agent lifecycle — it addresses agents by `AgentId`, never by
//! a shared owning reference, so the rest of the runtime only ever holds
//! ids.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::agent::{AgentId, BaseAgent};

#[derive(Debug, Clone, Serialize)]
pub struct AgentMetadata {
    pub agent_type: String,
    pub registered_at: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentHealthRecord {
    pub healthy: bool,
    pub last_check: String,
    pub consecutive_failures: u32,
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub agent_id: AgentId,
    pub agent_type: String,
    pub category: Option<String>,
    pub definition: Value,
    pub registered_at: String,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct AgentListFilter {
    pub agent_type: Option<String>,
    pub healthy_only: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ToolListFilter {
    pub agent_id: Option<AgentId>,
    pub agent_type: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub agent_id: AgentId,
    pub agent_type: String,
    pub initialized: bool,
    pub health: AgentHealthRecord,
    pub metadata: AgentMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total_agents: usize,
    pub healthy_agents: usize,
    pub unhealthy_agents: usize,
    pub total_tools: usize,
    pub agent_types: HashMap<String, usize>,
    pub tool_categories: usize,
}

struct Inner {
    agents: HashMap<AgentId, Arc<dyn BaseAgent>>,
    metadata: HashMap<AgentId, AgentMetadata>,
    tools: HashMap<String, ToolInfo>,
    tool_to_agent: HashMap<String, AgentId>,
    health: HashMap<AgentId, AgentHealthRecord>,
}

/// Index-based agent/tool registry. Owns every registered agent's
/// lifecycle; collaborators hold `AgentId`s, not agent references.
pub struct AgentRegistry {
    inner: Mutex<Inner>,
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentRegistry {
    pub fn new() -> Self {
        tracing::info!("agent registry initialized");
        Self {
            inner: Mutex::new(Inner {
                agents: HashMap::new(),
                metadata: HashMap::new(),
                tools: HashMap::new(),
                tool_to_agent: HashMap::new(),
                health: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("registry lock poisoned")
    }

    /// Registering an id already present updates its metadata and
    /// replaces the agent reference; the prior agent is cleaned up.
    pub async fn register_agent(&self, agent: Arc<dyn BaseAgent>, status: &str) -> bool {
        let agent_id = agent.agent_id().to_string();
        let previous = {
            let mut inner = self.lock();
            if inner.agents.contains_key(&agent_id) {
                tracing::warn!("agent {agent_id} already registered, updating");
            }
            let previous = inner.agents.insert(agent_id.clone(), agent.clone());
            inner.metadata.insert(
                agent_id.clone(),
                AgentMetadata {
                    agent_type: agent.agent_type().to_string(),
                    registered_at: Utc::now().to_rfc3339(),
                    status: status.to_string(),
                },
            );
            inner.health.insert(
                agent_id.clone(),
                AgentHealthRecord {
                    healthy: true,
                    last_check: Utc::now().to_rfc3339(),
                    consecutive_failures: 0,
                    success_rate: None,
                },
            );
            previous
        };
        if let Some(previous) = previous {
            previous.cleanup().await;
        }
        tracing::info!("registered agent: {agent_id} (type: {})", agent.agent_type());
        true
    }

    /// Idempotent. Cleans up the agent and atomically removes every tool
    /// it owned.
    pub async fn unregister_agent(&self, agent_id: &str) -> bool {
        let agent = {
            let mut inner = self.lock();
            let Some(agent) = inner.agents.remove(agent_id) else {
                tracing::warn!("agent {agent_id} not found in registry");
                return false;
            };
            inner.metadata.remove(agent_id);
            inner.health.remove(agent_id);
            let owned_tools: Vec<String> = inner
                .tool_to_agent
                .iter()
                .filter(|(_, owner)| owner.as_str() == agent_id)
                .map(|(tool, _)| tool.clone())
                .collect();
            for tool in owned_tools {
                inner.tools.remove(&tool);
                inner.tool_to_agent.remove(&tool);
            }
            agent
        };
        agent.cleanup().await;
        tracing::info!("unregistered agent: {agent_id}");
        true
    }

    pub fn get_agent(&self, agent_id: &str) -> Option<Arc<dyn BaseAgent>> {
        self.lock().agents.get(agent_id).cloned()
    }

    pub fn get_agent_by_type(&self, agent_type: &str) -> Option<Arc<dyn BaseAgent>> {
        self.lock()
            .agents
            .values()
            .find(|a| a.agent_type() == agent_type)
            .cloned()
    }

    pub fn list_agents(&self, filter: &AgentListFilter) -> Vec<AgentSummary> {
        let inner = self.lock();
        inner
            .agents
            .iter()
            .filter(|(_, agent)| {
                filter
                    .agent_type
                    .as_deref()
                    .is_none_or(|t| agent.agent_type() == t)
            })
            .filter(|(id, _)| !filter.healthy_only || inner.health[*id].healthy)
            .map(|(id, agent)| AgentSummary {
                agent_id: id.clone(),
                agent_type: agent.agent_type().to_string(),
                initialized: agent.is_initialized(),
                health: inner.health[id].clone(),
                metadata: inner.metadata[id].clone(),
            })
            .collect()
    }

    pub fn register_tool(&self, tool_name: &str, agent_id: &str, definition: Value, category: Option<String>) -> bool {
        let mut inner = self.lock();
        let Some(agent) = inner.agents.get(agent_id).cloned() else {
            tracing::error!("cannot register tool {tool_name}: agent {agent_id} not found");
            return false;
        };
        inner.tools.insert(
            tool_name.to_string(),
            ToolInfo {
                name: tool_name.to_string(),
                agent_id: agent_id.to_string(),
                agent_type: agent.agent_type().to_string(),
                category,
                definition,
                registered_at: Utc::now().to_rfc3339(),
            },
        );
        inner.tool_to_agent.insert(tool_name.to_string(), agent_id.to_string());
        true
    }

    /// Registers several tools for one agent, returning the count actually
    /// registered.
    pub fn register_tools_bulk(
        &self,
        agent_id: &str,
        tools: Vec<(String, Value, Option<String>)>,
    ) -> usize {
        let total = tools.len();
        let mut registered = 0;
        for (name, definition, category) in tools {
            if self.register_tool(&name, agent_id, definition, category) {
                registered += 1;
            }
        }
        tracing::info!("registered {registered}/{total} tools for agent {agent_id}");
        registered
    }

    pub fn get_tool(&self, tool_name: &str) -> Option<ToolInfo> {
        self.lock().tools.get(tool_name).cloned()
    }

    pub fn get_agent_for_tool(&self, tool_name: &str) -> Option<AgentId> {
        self.lock().tool_to_agent.get(tool_name).cloned()
    }

    pub fn list_tools(&self, filter: &ToolListFilter) -> Vec<ToolInfo> {
        self.lock()
            .tools
            .values()
            .filter(|t| filter.agent_id.as_deref().is_none_or(|id| t.agent_id == id))
            .filter(|t| filter.agent_type.as_deref().is_none_or(|at| t.agent_type == at))
            .filter(|t| {
                filter
                    .category
                    .as_deref()
                    .is_none_or(|c| t.category.as_deref() == Some(c))
            })
            .cloned()
            .collect()
    }

    pub fn tool_categories(&self) -> Vec<String> {
        let categories: HashSet<String> = self
            .lock()
            .tools
            .values()
            .filter_map(|t| t.category.clone())
            .collect();
        let mut categories: Vec<String> = categories.into_iter().collect();
        categories.sort();
        categories
    }

    /// `healthy = (success_rate >= 0.8 OR requests_handled == 0) AND
    /// initialized`. `consecutive_failures` increments only when the
    /// recomputed health is `false`.
    pub fn check_agent_health(&self, agent_id: &str) -> Option<AgentHealthRecord> {
        let agent = self.get_agent(agent_id)?;
        let mut inner = self.lock();

        if !agent.is_initialized() {
            let record = inner.health.get_mut(agent_id)?;
            record.healthy = false;
            record.last_check = Utc::now().to_rfc3339();
            return Some(record.clone());
        }

        let metrics = agent.metrics();
        let success_rate = if metrics.requests_handled > 0 {
            metrics.requests_succeeded as f64 / metrics.requests_handled as f64
        } else {
            0.0
        };
        let healthy = success_rate >= 0.8 || metrics.requests_handled == 0;

        let record = inner.health.get_mut(agent_id)?;
        record.healthy = healthy;
        record.last_check = Utc::now().to_rfc3339();
        record.success_rate = Some(success_rate);
        if healthy {
            record.consecutive_failures = 0;
        } else {
            record.consecutive_failures += 1;
        }
        Some(record.clone())
    }

    pub fn health_check_all(&self) -> HashMap<AgentId, AgentHealthRecord> {
        let ids: Vec<AgentId> = self.lock().agents.keys().cloned().collect();
        ids.into_iter()
            .filter_map(|id| self.check_agent_health(&id).map(|h| (id, h)))
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let inner = self.lock();
        let healthy_agents = inner.health.values().filter(|h| h.healthy).count();
        let mut agent_types: HashMap<String, usize> = HashMap::new();
        for agent in inner.agents.values() {
            *agent_types.entry(agent.agent_type().to_string()).or_insert(0) += 1;
        }
        RegistryStats {
            total_agents: inner.agents.len(),
            healthy_agents,
            unhealthy_agents: inner.agents.len() - healthy_agents,
            total_tools: inner.tools.len(),
            agent_types,
            tool_categories: self.tool_categories().len(),
        }
    }
}

#[cfg(test)]
mod tests;
