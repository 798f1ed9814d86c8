//! Translates an operator query into a coordinated tool-execution plan and
//! aggregates the results (C10). The orchestrator never calls tools
//! directly: every call goes through the owning agent looked up in the
//! registry (usually a [`crate::agent::tool_proxy::ToolProxyAgent`]).

pub mod aggregate;
pub mod intent;
pub mod params;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::agent::{AgentState, BaseAgent, Request};
use crate::bus::MessageBus;
use crate::config::Config;
use crate::context::{ContextPatch, ContextStore};
use crate::errors::SreError;
use crate::formatter;
use crate::interaction::InteractionHandler;
use crate::inventory::{is_resource_scoped, InventoryGuard};
use crate::registry::AgentRegistry;

use aggregate::ToolOutcome;
use params::PreparedParams;

pub struct OrchestratorAgent {
    state: AgentState,
    registry: Arc<AgentRegistry>,
    context_store: Arc<ContextStore>,
    bus: Arc<MessageBus>,
    interaction: Arc<InteractionHandler>,
    inventory: Option<Arc<InventoryGuard>>,
    config: Arc<Config>,
}

impl OrchestratorAgent {
    pub fn new(
        registry: Arc<AgentRegistry>,
        context_store: Arc<ContextStore>,
        bus: Arc<MessageBus>,
        interaction: Arc<InteractionHandler>,
        inventory: Option<Arc<InventoryGuard>>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            state: AgentState::new("orchestrator").with_timeout(Duration::from_secs(300)),
            registry,
            context_store,
            bus,
            interaction,
            inventory,
            config,
        }
    }

    /// Convenience entry for callers that only have a query string.
    pub async fn execute_query(&self, query: &str) -> Result<Value, SreError> {
        let mut request = Request::new("execute");
        request.parameters = json!({"query": query});
        self.execute(&request).await
    }

    /// Dump of intent categories, tool counts, and per-category tool lists.
    pub fn get_capabilities(&self) -> Value {
        let categories: Vec<Value> = intent::INTENT_TABLE
            .iter()
            .map(|rules| {
                let mut tools: Vec<&str> = rules.rules.iter().flat_map(|r| r.tools.iter().copied()).collect();
                tools.sort_unstable();
                tools.dedup();
                json!({
                    "category": rules.category,
                    "tool_count": tools.len(),
                    "tools": tools,
                })
            })
            .collect();
        json!({"categories": categories})
    }

    /// Sends `request.execute` to the registered agent of `specialist_type`
    /// over the bus with a 60s timeout.
    pub async fn route_to_specialist(
        &self,
        specialist_type: &str,
        request: Request,
        workflow_id: &str,
    ) -> Result<Value, SreError> {
        let agent = self
            .registry
            .get_agent_by_type(specialist_type)
            .ok_or_else(|| SreError::NotFound(format!("no specialist registered for type '{specialist_type}'")))?;
        let payload = json!({
            "action": request.action,
            "tool": request.tool,
            "parameters": request.parameters,
            "context": request.context,
            "workflow_id": workflow_id,
        });
        self.bus
            .send_request(self.agent_id(), agent.agent_id(), "execute", payload, Duration::from_secs(60))
            .await
    }

    async fn resolve_tool(&self, tool_name: &str) -> Option<(String, Arc<dyn BaseAgent>)> {
        let agent_id = self.registry.get_agent_for_tool(tool_name)?;
        let agent = self.registry.get_agent(&agent_id)?;
        Some((agent_id, agent))
    }

    async fn run_tool(&self, tool_name: &str, workflow_id: &str, request: &Request, query: &str) -> ToolOutcome {
        if self.registry.get_tool(tool_name).is_none() {
            return ToolOutcome {
                tool: tool_name.to_string(),
                status: "not_found".to_string(),
                result: Some(json!({"message": format!("tool '{tool_name}' is not registered")})),
            };
        }
        let Some((agent_id, agent)) = self.resolve_tool(tool_name).await else {
            return ToolOutcome {
                tool: tool_name.to_string(),
                status: "error".to_string(),
                result: Some(json!({"message": format!("no agent owns tool '{tool_name}'")})),
            };
        };

        let prepared = params::prepare_parameters(
            tool_name,
            &request.parameters,
            &request.context,
            query,
            &self.config,
            &self.interaction,
        )
        .await;

        let outcome = match prepared {
            PreparedParams::Skip(reason) => ToolOutcome {
                tool: tool_name.to_string(),
                status: "skipped".to_string(),
                result: Some(json!({"message": reason})),
            },
            PreparedParams::NeedsUserInput(req) => ToolOutcome {
                tool: tool_name.to_string(),
                status: "needs_user_input".to_string(),
                result: Some(json!({"message": req.message, "options": req.options})),
            },
            PreparedParams::Ready(prepared_params) => {
                let preflight_failure = if is_resource_scoped(tool_name) {
                    match &self.inventory {
                        Some(guard) => {
                            let preflight = guard.preflight_resource_check(tool_name, &prepared_params).await;
                            if preflight.ok { None } else { Some(preflight.result) }
                        }
                        None => None,
                    }
                } else {
                    None
                };
                match preflight_failure {
                    Some(result) => ToolOutcome {
                        tool: tool_name.to_string(),
                        status: "not_found".to_string(),
                        result,
                    },
                    None => self.call_tool(tool_name, &agent, prepared_params, request, workflow_id).await,
                }
            }
        };

        self.context_store
            .add_step_result(
                workflow_id,
                tool_name,
                &agent_id,
                json!({"status": outcome.status, "result": outcome.result}),
            )
            .await;

        outcome
    }

    async fn call_tool(
        &self,
        tool_name: &str,
        agent: &Arc<dyn BaseAgent>,
        parameters: Value,
        request: &Request,
        workflow_id: &str,
    ) -> ToolOutcome {
        let mut tool_request = Request::new("execute");
        tool_request.tool = Some(tool_name.to_string());
        tool_request.parameters = parameters;
        tool_request.context = request.context.clone();
        tool_request.workflow_id = Some(workflow_id.to_string());

        let response = agent.handle_request(tool_request).await;
        ToolOutcome {
            tool: tool_name.to_string(),
            status: response.status,
            result: response.result,
        }
    }

    async fn maybe_diagnose_performance(&self, outcomes: &[ToolOutcome]) -> Vec<String> {
        let has_data = outcomes.iter().any(|o| {
            o.tool == "get_performance_metrics"
                && o.status == "success"
                && o.result
                    .as_ref()
                    .and_then(|r| r.get("parsed").or(Some(r)))
                    .and_then(|r| r.get("metrics"))
                    .and_then(Value::as_array)
                    .is_some_and(|a| !a.is_empty())
        });
        if has_data {
            return Vec::new();
        }
        let health = match self.resolve_tool("check_resource_health").await {
            Some((_, agent)) => {
                let mut req = Request::new("execute");
                req.tool = Some("check_resource_health".to_string());
                let response = agent.handle_request(req).await;
                response.result
            }
            None => None,
        };
        aggregate::diagnose_no_metrics(health.as_ref())
    }

    async fn run(&self, request: &Request) -> Result<Value, SreError> {
        let query = request
            .parameters
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| SreError::ExecutionError("request is missing 'query'".to_string()))?
            .to_string();

        let workflow_id = Uuid::new_v4().to_string();
        let mut initial = serde_json::Map::new();
        initial.insert("query".to_string(), Value::String(query.clone()));
        self.context_store.create(&workflow_id, initial, 3600).await;

        let (category, tool_names) = intent::classify(&query);
        self.stream_event(
            "progress",
            json!({"status": "routing", "intent": category, "tools": tool_names}),
        );

        let mut outcomes = Vec::with_capacity(tool_names.len());
        for tool_name in tool_names {
            let outcome = self.run_tool(tool_name, &workflow_id, request, &query).await;
            outcomes.push(outcome);
        }

        let needs_input = outcomes.iter().find(|o| o.status == "needs_user_input").cloned();

        let (results, user_interaction_required, interaction_data) = if let Some(pending) = needs_input {
            (
                json!({"pending_tool": pending.tool}),
                true,
                pending.result,
            )
        } else {
            let summary = match category {
                "health" => aggregate::summarize_health(&outcomes),
                "cost" => aggregate::summarize_cost(&outcomes),
                "performance" => {
                    let suggestions = self.maybe_diagnose_performance(&outcomes).await;
                    aggregate::summarize_performance(&outcomes, &suggestions)
                }
                _ => aggregate::summarize_generic(&outcomes),
            };

            let (errors, not_found, skipped) = aggregate::group_by_status(&outcomes);
            let mut results_map = summary.as_object().cloned().unwrap_or_default();
            if !errors.is_empty() {
                results_map.insert("errors".to_string(), json!(errors));
            }
            if !not_found.is_empty() {
                results_map.insert("not_found".to_string(), json!(not_found));
            }
            if !skipped.is_empty() {
                results_map.insert("skipped".to_string(), json!(skipped));
            }
            if let Some(preflight_message) = aggregate::all_preflight_failed_message(&outcomes) {
                results_map.insert("message".to_string(), preflight_message["message"].clone());
                results_map.insert("suggestions".to_string(), preflight_message["suggestions"].clone());
            }

            (Value::Object(results_map), false, None)
        };

        self.context_store
            .update(
                &workflow_id,
                ContextPatch {
                    shared_data: None,
                    metadata: Some(
                        json!({"status": "completed", "total_steps": outcomes.len()})
                            .as_object()
                            .cloned()
                            .unwrap_or_default(),
                    ),
                },
            )
            .await;

        let formatted = if !user_interaction_required {
            match category {
                "health" => Some(formatter::format_health_status(
                    results["healthy_resources"].as_u64().unwrap_or(0),
                    results["unhealthy_resources"].as_u64().unwrap_or(0),
                    results["unhealthy_details"].as_array().cloned().unwrap_or_default().as_slice(),
                )),
                _ => None,
            }
        } else {
            None
        };

        Ok(json!({
            "workflow_id": workflow_id,
            "intent": category,
            "tools_executed": outcomes.len(),
            "results": results,
            "user_interaction_required": user_interaction_required,
            "interaction_data": interaction_data,
            "formatted": formatted,
        }))
    }
}

#[async_trait]
impl BaseAgent for OrchestratorAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        match request.action.as_str() {
            "execute" => self.run(request).await,
            "get_capabilities" => Ok(self.get_capabilities()),
            other => Err(SreError::ExecutionError(format!("unknown orchestrator action '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests;
