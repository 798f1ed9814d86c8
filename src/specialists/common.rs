//! Collaborators and the call-a-tool-and-record-a-step helper shared by
//! every specialist (spec §4.11: "each verb... call ToolProxyAgent for
//! one or more tools in sequence; store each step result").

use std::sync::Arc;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::agent::tool_proxy::ToolProxyAgent;
use crate::agent::{BaseAgent, Request};
use crate::context::ContextStore;

#[derive(Clone)]
pub struct SpecialistDeps {
    pub context_store: Arc<ContextStore>,
    pub tool_proxy: Arc<ToolProxyAgent>,
}

impl SpecialistDeps {
    pub fn new(context_store: Arc<ContextStore>, tool_proxy: Arc<ToolProxyAgent>) -> Self {
        Self { context_store, tool_proxy }
    }

    /// Attaches to `workflow_id` if it already exists in the context
    /// store, otherwise creates a fresh workflow seeded with `query`.
    pub async fn ensure_workflow(&self, workflow_id: Option<&str>, query: &str) -> String {
        if let Some(id) = workflow_id {
            if self.context_store.get(id).await.is_some() {
                return id.to_string();
            }
        }
        let id = workflow_id.map(str::to_string).unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut data = Map::new();
        data.insert("query".to_string(), Value::String(query.to_string()));
        self.context_store.create(&id, data, 3600).await;
        id
    }

    /// Calls one tool through the shared `ToolProxyAgent`, records the
    /// step result against `workflow_id`, and returns the structured
    /// outcome (`{status, result, error}`).
    pub async fn call_tool(&self, workflow_id: &str, tool: &str, parameters: Value) -> Value {
        let mut request = Request::new("execute");
        request.tool = Some(tool.to_string());
        request.parameters = parameters;
        request.workflow_id = Some(workflow_id.to_string());

        let response = self.tool_proxy.handle_request(request).await;
        let outcome = json!({
            "status": response.status,
            "result": response.result,
            "error": response.error,
        });
        self.context_store
            .add_step_result(workflow_id, tool, self.tool_proxy.agent_id(), outcome.clone())
            .await;
        outcome
    }
}

pub fn outcome_succeeded(outcome: &Value) -> bool {
    outcome.get("status").and_then(Value::as_str) == Some("success")
}

pub fn outcome_data(outcome: &Value) -> Value {
    outcome
        .get("result")
        .and_then(|r| r.get("parsed"))
        .cloned()
        .unwrap_or(Value::Null)
}
