use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::agent::tool_proxy::ToolProxyAgent;
use crate::cache::ToolCache;
use crate::transport::{CliOutcome, CloudCliExecutor, InventorySnapshot, ResourceRef, ToolCallResult, ToolDescriptor, ToolTransport};

struct StubTransport {
    responses: HashMap<&'static str, Value>,
}

#[async_trait]
impl ToolTransport for StubTransport {
    async fn call_tool(&self, name: &str, _args: Value) -> anyhow::Result<ToolCallResult> {
        let parsed = self.responses.get(name).cloned();
        Ok(ToolCallResult {
            success: parsed.is_some(),
            content: vec![],
            parsed,
            is_error: false,
        })
    }
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolDescriptor>> {
        Ok(Vec::new())
    }
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }
    async fn cleanup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct StubCli {
    apps: Value,
}

#[async_trait]
impl CloudCliExecutor for StubCli {
    async fn execute(&self, _command: &str, _timeout_secs: u64, _add_sub: bool) -> anyhow::Result<CliOutcome> {
        Ok(CliOutcome {
            status: "success".to_string(),
            output: Some(self.apps.clone()),
            error: None,
        })
    }
}

struct StubInventory {
    known: bool,
}

#[async_trait]
impl InventorySnapshot for StubInventory {
    async fn has_resource(&self, _reference: &ResourceRef) -> bool {
        self.known
    }
    async fn enrich_parameters(&self, _tool: &str, params: Value) -> Value {
        params
    }
    async fn statistics(&self) -> Value {
        json!({})
    }
}

async fn build_orchestrator(
    responses: HashMap<&'static str, Value>,
    apps: Value,
    inventory_known: Option<bool>,
) -> (OrchestratorAgent, Arc<AgentRegistry>) {
    let transport = Arc::new(StubTransport { responses });
    let cache = Arc::new(ToolCache::new(100));
    let proxy = Arc::new(ToolProxyAgent::new(transport, cache));
    proxy.initialize().await;

    let registry = Arc::new(AgentRegistry::new());
    registry.register_agent(proxy.clone(), "active").await;
    for tool in [
        "check_container_app_health",
        "get_cost_recommendations",
        "identify_bottlenecks",
        "get_performance_metrics",
        "check_resource_health",
    ] {
        registry.register_tool(tool, proxy.agent_id(), json!({}), Some("core".to_string()));
    }

    let context_store = Arc::new(ContextStore::new(None));
    context_store.initialize().await;
    let bus = Arc::new(MessageBus::new());
    let interaction = Arc::new(InteractionHandler::new(Arc::new(StubCli { apps })));
    let inventory = inventory_known.map(|known| Arc::new(InventoryGuard::new(Arc::new(StubInventory { known }), true)));

    let orchestrator = OrchestratorAgent::new(
        registry.clone(),
        context_store,
        bus,
        interaction,
        inventory,
        Arc::new(Config {
            subscription_id: Some("test-sub".to_string()),
            ..Config::default()
        }),
    );
    orchestrator.initialize().await;
    (orchestrator, registry)
}

#[tokio::test]
async fn s1_health_check_on_known_resource_succeeds() {
    let mut responses = HashMap::new();
    responses.insert("check_container_app_health", json!({"availability_state": "Available"}));
    let (orchestrator, _registry) = build_orchestrator(responses, json!([]), Some(true)).await;

    let result = orchestrator
        .execute_query("check health of container app my-app in prod-rg")
        .await
        .expect("execute_query succeeds");

    assert_eq!(result["intent"], json!("health"));
    assert_eq!(result["tools_executed"], json!(1));
    assert_eq!(result["results"]["healthy_resources"], json!(1));
    assert_eq!(result["results"]["unhealthy_resources"], json!(0));
    assert!(result["formatted"].is_object());
}

#[tokio::test]
async fn s2_ambiguous_resource_prompts_selection() {
    let apps = json!([{"name": "a1", "id": "/sub/a1"}, {"name": "a2", "id": "/sub/a2"}]);
    let (orchestrator, _registry) = build_orchestrator(HashMap::new(), apps, Some(true)).await;

    let result = orchestrator
        .execute_query("check health of a container app")
        .await
        .expect("execute_query succeeds");

    assert_eq!(result["user_interaction_required"], json!(true));
    let options = result["interaction_data"]["options"].as_array().expect("options");
    assert_eq!(options.len(), 2);
    assert_eq!(options[0]["index"], json!(1));
    assert_eq!(options[0]["name"], json!("a1"));
}

#[tokio::test]
async fn s3_preflight_blocks_missing_resource() {
    let mut responses = HashMap::new();
    responses.insert("check_container_app_health", json!({"availability_state": "Available"}));
    let (orchestrator, _registry) = build_orchestrator(responses, json!([]), Some(false)).await;

    let result = orchestrator
        .execute_query("check health of container app ghost-app in prod-rg")
        .await
        .expect("execute_query succeeds");

    assert_eq!(result["user_interaction_required"], json!(false));
    assert_eq!(result["results"]["errors"][0]["result"]["preflight_failed"], json!(true));
    assert_eq!(result["results"]["message"], json!("Resources not found in inventory."));
}

#[tokio::test]
async fn s4_cost_aggregation_sums_monthly_and_annualized_savings() {
    let mut responses = HashMap::new();
    responses.insert("get_cost_recommendations", json!({"monthly_savings_amount": 100.0}));
    let (orchestrator, _registry) = build_orchestrator(responses, json!([]), None).await;

    let result = orchestrator
        .execute_query("find cost savings in prod-rg")
        .await
        .expect("execute_query succeeds");

    assert_eq!(result["intent"], json!("cost"));
    assert_eq!(result["results"]["potential_savings"], json!("$100.00"));
}

#[tokio::test]
async fn get_capabilities_lists_every_intent_category() {
    let (orchestrator, _registry) = build_orchestrator(HashMap::new(), json!([]), None).await;
    let caps = orchestrator.get_capabilities();
    let categories: Vec<&str> = caps["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["category"].as_str().unwrap())
        .collect();
    assert!(categories.contains(&"health"));
    assert!(categories.contains(&"remediation"));
}
