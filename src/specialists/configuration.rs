//! ConfigurationManagement specialist: scan, drift, compliance, remediate,
//! baseline, full (spec §4.11).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::errors::SreError;

use super::common::{outcome_data, outcome_succeeded, SpecialistDeps};

/// Which tool backs each baseline framework a `compliance` check can run
/// against. Extending the framework set is a table edit.
const COMPLIANCE_FRAMEWORKS: &[(&str, &str)] = &[
    ("cis", "check_compliance_status"),
    ("nist", "check_compliance_status"),
    ("internal", "check_compliance_status"),
];

fn tool_for_framework(framework: &str) -> &'static str {
    COMPLIANCE_FRAMEWORKS
        .iter()
        .find(|(name, _)| framework.eq_ignore_ascii_case(name))
        .map(|(_, tool)| *tool)
        .unwrap_or("check_compliance_status")
}

pub struct ConfigurationManagementAgent {
    state: AgentState,
    deps: SpecialistDeps,
}

impl ConfigurationManagementAgent {
    pub fn new(deps: SpecialistDeps) -> Self {
        Self {
            state: AgentState::new("configuration-management"),
            deps,
        }
    }

    async fn scan(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "check_resource_health", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "configuration": outcome_data(&outcome)})
    }

    async fn drift(&self, workflow_id: &str, params: &Value) -> Value {
        let current = self.scan(workflow_id, params).await;
        let mut baseline_params = params.clone();
        if let Value::Object(ref mut map) = baseline_params {
            map.insert("baseline".to_string(), Value::Bool(true));
        }
        let outcome = self.deps.call_tool(workflow_id, "check_resource_health", baseline_params).await;
        let baseline = outcome_data(&outcome);
        let drifted = current["configuration"] != baseline;
        json!({"status": "success", "drifted": drifted, "current": current["configuration"], "baseline": baseline})
    }

    async fn compliance(&self, workflow_id: &str, params: &Value) -> Value {
        let framework = params.get("framework").and_then(Value::as_str).unwrap_or("internal");
        let tool = tool_for_framework(framework);
        let outcome = self.deps.call_tool(workflow_id, tool, params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "framework": framework, "compliance": outcome_data(&outcome)})
    }

    async fn remediate(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "plan_remediation", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "plan": outcome_data(&outcome)})
    }

    async fn baseline(&self, workflow_id: &str, params: &Value) -> Value {
        let scan = self.scan(workflow_id, params).await;
        json!({"status": "success", "baseline_captured": scan["configuration"]})
    }

    async fn full(&self, workflow_id: &str, params: &Value) -> Value {
        let drift = self.drift(workflow_id, params).await;
        let compliance = self.compliance(workflow_id, params).await;
        let remediation = if drift["drifted"].as_bool().unwrap_or(false) {
            Some(self.remediate(workflow_id, params).await)
        } else {
            None
        };
        json!({"status": "success", "drift": drift, "compliance": compliance, "remediation": remediation})
    }
}

#[async_trait]
impl BaseAgent for ConfigurationManagementAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let query = request.parameters.get("query").and_then(Value::as_str).unwrap_or("configuration review");
        let workflow_id = self.deps.ensure_workflow(request.workflow_id.as_deref(), query).await;
        let params = &request.parameters;

        let result = match request.action.as_str() {
            "scan" => self.scan(&workflow_id, params).await,
            "drift" => self.drift(&workflow_id, params).await,
            "compliance" => self.compliance(&workflow_id, params).await,
            "remediate" => self.remediate(&workflow_id, params).await,
            "baseline" => self.baseline(&workflow_id, params).await,
            "full" => self.full(&workflow_id, params).await,
            other => return Err(SreError::ExecutionError(format!("configuration-management has no verb '{other}'"))),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framework_lookup_falls_back_to_internal_tool() {
        assert_eq!(tool_for_framework("CIS"), "check_compliance_status");
        assert_eq!(tool_for_framework("unknown"), "check_compliance_status");
    }
}
