use super::*;
use crate::agent::{AgentState, Request};
use crate::errors::SreError;
use async_trait::async_trait;
use serde_json::json;

struct StubAgent {
    state: AgentState,
    should_fail: std::sync::atomic::AtomicBool,
}

impl StubAgent {
    fn new(agent_type: &str) -> Self {
        Self {
            state: AgentState::new(agent_type).with_max_retries(1),
            should_fail: std::sync::atomic::AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl BaseAgent for StubAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, _request: &Request) -> Result<Value, SreError> {
        if self.should_fail.load(std::sync::atomic::Ordering::SeqCst) {
            Err(SreError::ExecutionError("boom".to_string()))
        } else {
            Ok(json!({"ok": true}))
        }
    }
}

#[tokio::test]
async fn register_then_lookup_tool_resolves_to_the_owning_agent() {
    let registry = AgentRegistry::new();
    let agent: Arc<dyn BaseAgent> = Arc::new(StubAgent::new("health"));
    agent.initialize().await;
    let agent_id = agent.agent_id().to_string();
    registry.register_agent(agent, "registered").await;

    registry.register_tool("check_resource_health", &agent_id, json!({}), Some("health".to_string()));

    let tool = registry.get_tool("check_resource_health").unwrap();
    assert_eq!(tool.agent_id, agent_id);
    assert_eq!(registry.get_agent_for_tool("check_resource_health"), Some(agent_id));
}

#[tokio::test]
async fn unregister_removes_every_tool_the_agent_owned() {
    let registry = AgentRegistry::new();
    let agent: Arc<dyn BaseAgent> = Arc::new(StubAgent::new("health"));
    agent.initialize().await;
    let agent_id = agent.agent_id().to_string();
    registry.register_agent(agent, "registered").await;
    registry.register_tool("check_resource_health", &agent_id, json!({}), None);
    registry.register_tool("check_container_app_health", &agent_id, json!({}), None);

    registry.unregister_agent(&agent_id).await;

    assert!(registry.get_tool("check_resource_health").is_none());
    assert!(registry.get_tool("check_container_app_health").is_none());
    assert!(registry.get_agent(&agent_id).is_none());
}

#[tokio::test]
async fn unregister_is_idempotent() {
    let registry = AgentRegistry::new();
    assert!(!registry.unregister_agent("ghost").await);
}

#[tokio::test]
async fn health_is_unhealthy_below_eighty_percent_success_rate() {
    let registry = AgentRegistry::new();
    let agent = Arc::new(StubAgent::new("health"));
    agent.initialize().await;
    let agent_id = agent.agent_id().to_string();
    let agent_dyn: Arc<dyn BaseAgent> = agent.clone();
    registry.register_agent(agent_dyn.clone(), "registered").await;

    // Two successes, then flip to failing for the rest: 2/10 => below 0.8.
    agent_dyn.handle_request(Request::new("run")).await;
    agent_dyn.handle_request(Request::new("run")).await;
    agent.should_fail.store(true, std::sync::atomic::Ordering::SeqCst);
    for _ in 0..8 {
        agent_dyn.handle_request(Request::new("run")).await;
    }

    let health = registry.check_agent_health(&agent_id).unwrap();
    assert!(!health.healthy);
    assert_eq!(health.consecutive_failures, 1);
}

#[tokio::test]
async fn a_never_run_agent_counts_as_healthy() {
    let registry = AgentRegistry::new();
    let agent: Arc<dyn BaseAgent> = Arc::new(StubAgent::new("health"));
    agent.initialize().await;
    let agent_id = agent.agent_id().to_string();
    registry.register_agent(agent, "registered").await;

    let health = registry.check_agent_health(&agent_id).unwrap();
    assert!(health.healthy);
}

#[tokio::test]
async fn registering_the_same_id_again_replaces_the_agent_and_cleans_up_the_prior_one() {
    let registry = AgentRegistry::new();
    let agent = Arc::new(StubAgent::new("health"));
    agent.initialize().await;
    let agent_dyn: Arc<dyn BaseAgent> = agent.clone();
    registry.register_agent(agent_dyn.clone(), "registered").await;
    registry.register_agent(agent_dyn, "registered").await;

    assert_eq!(registry.stats().total_agents, 1);
}
