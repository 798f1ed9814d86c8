//! Remediation specialist: diagnose, recommend, execute, rollback, verify,
//! full (spec §4.11).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::errors::SreError;

use super::common::{outcome_data, outcome_succeeded, SpecialistDeps};

/// Maps a diagnosed problem category to the remediation action the
/// `recommend` verb proposes. Checked in order; first match wins.
const REMEDIATION_STRATEGIES: &[(&str, &str)] = &[
    ("stopped", "start_resource"),
    ("degraded", "restart_resource"),
    ("throttled", "scale_resource"),
    ("misconfigured", "apply_baseline_configuration"),
];

fn strategy_for_condition(condition: &str) -> &'static str {
    REMEDIATION_STRATEGIES
        .iter()
        .find(|(key, _)| condition.eq_ignore_ascii_case(key))
        .map(|(_, action)| *action)
        .unwrap_or("escalate_to_on_call")
}

pub struct RemediationAgent {
    state: AgentState,
    deps: SpecialistDeps,
}

impl RemediationAgent {
    pub fn new(deps: SpecialistDeps) -> Self {
        Self {
            state: AgentState::new("remediation"),
            deps,
        }
    }

    async fn diagnose(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "check_resource_health", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "diagnosis": outcome_data(&outcome)})
    }

    async fn recommend(&self, workflow_id: &str, params: &Value) -> Value {
        let diagnosis = self.diagnose(workflow_id, params).await;
        let condition = diagnosis["diagnosis"]
            .get("availability_state")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        json!({"status": "success", "condition": condition, "recommended_action": strategy_for_condition(condition)})
    }

    async fn execute_remediation(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "plan_remediation", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "execution": outcome_data(&outcome)})
    }

    async fn rollback(&self, workflow_id: &str, params: &Value) -> Value {
        let mut rollback_params = params.clone();
        if let Value::Object(ref mut map) = rollback_params {
            map.insert("rollback".to_string(), Value::Bool(true));
        }
        let outcome = self.deps.call_tool(workflow_id, "plan_remediation", rollback_params).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "rollback": outcome_data(&outcome)})
    }

    async fn verify(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "check_resource_health", params.clone()).await;
        let data = outcome_data(&outcome);
        let recovered = data
            .get("availability_state")
            .and_then(Value::as_str)
            .is_some_and(|s| s.eq_ignore_ascii_case("available"));
        json!({"status": "success", "recovered": recovered, "health": data})
    }

    async fn full(&self, workflow_id: &str, params: &Value) -> Value {
        let recommendation = self.recommend(workflow_id, params).await;
        let execution = self.execute_remediation(workflow_id, params).await;
        let verification = self.verify(workflow_id, params).await;
        json!({"status": "success", "recommendation": recommendation, "execution": execution, "verification": verification})
    }
}

#[async_trait]
impl BaseAgent for RemediationAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let query = request.parameters.get("query").and_then(Value::as_str).unwrap_or("remediation");
        let workflow_id = self.deps.ensure_workflow(request.workflow_id.as_deref(), query).await;
        let params = &request.parameters;

        let result = match request.action.as_str() {
            "diagnose" => self.diagnose(&workflow_id, params).await,
            "recommend" => self.recommend(&workflow_id, params).await,
            "execute" => self.execute_remediation(&workflow_id, params).await,
            "rollback" => self.rollback(&workflow_id, params).await,
            "verify" => self.verify(&workflow_id, params).await,
            "full" => self.full(&workflow_id, params).await,
            other => return Err(SreError::ExecutionError(format!("remediation has no verb '{other}'"))),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_maps_known_conditions_and_falls_back() {
        assert_eq!(strategy_for_condition("stopped"), "start_resource");
        assert_eq!(strategy_for_condition("degraded"), "restart_resource");
        assert_eq!(strategy_for_condition("unrecognized"), "escalate_to_on_call");
    }
}
