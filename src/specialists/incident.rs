//! IncidentResponse specialist: triage, correlate, impact, rca, remediate,
//! postmortem, full (spec §4.11).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::errors::SreError;

use super::common::{outcome_data, outcome_succeeded, SpecialistDeps};

/// Severity is driven off the affected-resource count, not hard-coded
/// per call site — adding a new band is a table edit.
const SEVERITY_THRESHOLDS: &[(u64, &str)] = &[(10, "sev1"), (3, "sev2"), (1, "sev3")];

fn classify_severity(affected_count: u64) -> &'static str {
    SEVERITY_THRESHOLDS
        .iter()
        .find(|(threshold, _)| affected_count >= *threshold)
        .map(|(_, label)| *label)
        .unwrap_or("sev4")
}

pub struct IncidentResponseAgent {
    state: AgentState,
    deps: SpecialistDeps,
}

impl IncidentResponseAgent {
    pub fn new(deps: SpecialistDeps) -> Self {
        Self {
            state: AgentState::new("incident-response"),
            deps,
        }
    }

    async fn triage(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "triage_incident", params.clone()).await;
        let data = outcome_data(&outcome);
        let affected = data
            .get("affected_resources")
            .and_then(Value::as_array)
            .map(|a| a.len() as u64)
            .unwrap_or(0);
        json!({
            "status": if outcome_succeeded(&outcome) { "success" } else { "error" },
            "severity": classify_severity(affected),
            "affected_resource_count": affected,
            "triage": data,
        })
    }

    async fn correlate(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "correlate_alerts", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "correlation": outcome_data(&outcome)})
    }

    async fn impact(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "get_resource_dependencies", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "impact": outcome_data(&outcome)})
    }

    async fn rca(&self, workflow_id: &str, params: &Value) -> Value {
        let deps_outcome = self.deps.call_tool(workflow_id, "get_resource_dependencies", params.clone()).await;
        let triage_outcome = self.deps.call_tool(workflow_id, "triage_incident", params.clone()).await;
        json!({
            "status": "success",
            "dependency_graph": outcome_data(&deps_outcome),
            "triage": outcome_data(&triage_outcome),
        })
    }

    async fn remediate(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "plan_remediation", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "plan": outcome_data(&outcome)})
    }

    async fn postmortem(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "generate_postmortem", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "postmortem": outcome_data(&outcome)})
    }

    async fn full(&self, workflow_id: &str, params: &Value) -> Value {
        let triage = self.triage(workflow_id, params).await;
        let correlate = self.correlate(workflow_id, params).await;
        let impact = self.impact(workflow_id, params).await;
        json!({"status": "success", "triage": triage, "correlation": correlate, "impact": impact})
    }
}

#[async_trait]
impl BaseAgent for IncidentResponseAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let query = request.parameters.get("query").and_then(Value::as_str).unwrap_or("incident");
        let workflow_id = self.deps.ensure_workflow(request.workflow_id.as_deref(), query).await;
        let params = &request.parameters;

        let result = match request.action.as_str() {
            "triage" => self.triage(&workflow_id, params).await,
            "correlate" => self.correlate(&workflow_id, params).await,
            "impact" => self.impact(&workflow_id, params).await,
            "rca" => self.rca(&workflow_id, params).await,
            "remediate" => self.remediate(&workflow_id, params).await,
            "postmortem" => self.postmortem(&workflow_id, params).await,
            "full" => self.full(&workflow_id, params).await,
            other => return Err(SreError::ExecutionError(format!("incident-response has no verb '{other}'"))),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_scales_with_affected_resource_count() {
        assert_eq!(classify_severity(15), "sev1");
        assert_eq!(classify_severity(5), "sev2");
        assert_eq!(classify_severity(1), "sev3");
        assert_eq!(classify_severity(0), "sev4");
    }
}
