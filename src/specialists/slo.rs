//! SLOManagement specialist: track, budget, alert, report, forecast, full
//! (spec §4.11).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::errors::SreError;

use super::common::{outcome_data, outcome_succeeded, SpecialistDeps};

/// Error-budget remaining bands driving the `alert` verb's severity.
const BUDGET_REMAINING_ALERTS: &[(f64, &str)] = &[(0.0, "exhausted"), (10.0, "critical"), (25.0, "warning")];

fn alert_for_remaining_budget(percent_remaining: f64) -> &'static str {
    BUDGET_REMAINING_ALERTS
        .iter()
        .find(|(threshold, _)| percent_remaining <= *threshold)
        .map(|(_, level)| *level)
        .unwrap_or("healthy")
}

pub struct SloManagementAgent {
    state: AgentState,
    deps: SpecialistDeps,
}

impl SloManagementAgent {
    pub fn new(deps: SpecialistDeps) -> Self {
        Self {
            state: AgentState::new("slo-management"),
            deps,
        }
    }

    async fn track(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "get_performance_metrics", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "metrics": outcome_data(&outcome)})
    }

    fn compute_budget(target: f64, actual: f64) -> (f64, f64) {
        let allowed_failure = (100.0 - target).max(0.0001);
        let observed_failure = (100.0 - actual).max(0.0);
        let consumed_percent = (observed_failure / allowed_failure * 100.0).min(100.0);
        (consumed_percent, (100.0 - consumed_percent).max(0.0))
    }

    async fn budget(&self, workflow_id: &str, params: &Value) -> Value {
        let metrics = self.track(workflow_id, params).await;
        let target = params.get("slo_target_percent").and_then(Value::as_f64).unwrap_or(99.9);
        let actual = metrics["metrics"].get("availability_percent").and_then(Value::as_f64).unwrap_or(target);
        let (consumed, remaining) = Self::compute_budget(target, actual);
        json!({"status": "success", "target_percent": target, "actual_percent": actual, "budget_consumed_percent": consumed, "budget_remaining_percent": remaining})
    }

    async fn alert(&self, workflow_id: &str, params: &Value) -> Value {
        let budget = self.budget(workflow_id, params).await;
        let remaining = budget["budget_remaining_percent"].as_f64().unwrap_or(100.0);
        json!({"status": "success", "budget_remaining_percent": remaining, "alert_level": alert_for_remaining_budget(remaining)})
    }

    async fn report(&self, workflow_id: &str, params: &Value) -> Value {
        let budget = self.budget(workflow_id, params).await;
        let track = self.track(workflow_id, params).await;
        json!({"status": "success", "budget": budget, "metrics": track})
    }

    async fn forecast(&self, workflow_id: &str, params: &Value) -> Value {
        let budget = self.budget(workflow_id, params).await;
        let remaining = budget["budget_remaining_percent"].as_f64().unwrap_or(100.0);
        let burn_rate_per_day = params.get("burn_rate_per_day").and_then(Value::as_f64).unwrap_or(1.0).max(0.0001);
        let days_to_exhaustion = remaining / burn_rate_per_day;
        json!({"status": "success", "budget_remaining_percent": remaining, "days_to_exhaustion": days_to_exhaustion})
    }

    async fn full(&self, workflow_id: &str, params: &Value) -> Value {
        let report = self.report(workflow_id, params).await;
        let alert = self.alert(workflow_id, params).await;
        let forecast = self.forecast(workflow_id, params).await;
        json!({"status": "success", "report": report, "alert": alert, "forecast": forecast})
    }
}

#[async_trait]
impl BaseAgent for SloManagementAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let query = request.parameters.get("query").and_then(Value::as_str).unwrap_or("slo review");
        let workflow_id = self.deps.ensure_workflow(request.workflow_id.as_deref(), query).await;
        let params = &request.parameters;

        let result = match request.action.as_str() {
            "track" => self.track(&workflow_id, params).await,
            "budget" => self.budget(&workflow_id, params).await,
            "alert" => self.alert(&workflow_id, params).await,
            "report" => self.report(&workflow_id, params).await,
            "forecast" => self.forecast(&workflow_id, params).await,
            "full" => self.full(&workflow_id, params).await,
            other => return Err(SreError::ExecutionError(format!("slo-management has no verb '{other}'"))),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_consumption_tracks_gap_to_target() {
        let (consumed, remaining) = SloManagementAgent::compute_budget(99.9, 99.9);
        assert!((consumed - 0.0).abs() < 0.01);
        assert!((remaining - 100.0).abs() < 0.01);

        let (consumed, remaining) = SloManagementAgent::compute_budget(99.9, 99.8);
        assert!(consumed > 0.0);
        assert!(remaining < 100.0);
    }

    #[test]
    fn alert_escalates_as_budget_is_consumed() {
        assert_eq!(alert_for_remaining_budget(0.0), "exhausted");
        assert_eq!(alert_for_remaining_budget(5.0), "critical");
        assert_eq!(alert_for_remaining_budget(20.0), "warning");
        assert_eq!(alert_for_remaining_budget(80.0), "healthy");
    }
}
