//! CostOptimization specialist: analyze_costs, find_savings,
//! identify_orphaned, budget_tracking, recommendations, full (spec §4.11).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::errors::SreError;

use super::common::{outcome_data, outcome_succeeded, SpecialistDeps};

/// Budget consumption bands driving the `budget_tracking` alert level.
const BUDGET_ALERT_BANDS: &[(f64, &str)] = &[(100.0, "over_budget"), (90.0, "critical"), (75.0, "warning")];

fn alert_level_for(percent_used: f64) -> &'static str {
    BUDGET_ALERT_BANDS
        .iter()
        .find(|(threshold, _)| percent_used >= *threshold)
        .map(|(_, level)| *level)
        .unwrap_or("on_track")
}

pub struct CostOptimizationAgent {
    state: AgentState,
    deps: SpecialistDeps,
}

impl CostOptimizationAgent {
    pub fn new(deps: SpecialistDeps) -> Self {
        Self {
            state: AgentState::new("cost-optimization"),
            deps,
        }
    }

    async fn analyze_costs(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "get_cost_analysis", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "cost_analysis": outcome_data(&outcome)})
    }

    async fn find_savings(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "get_cost_recommendations", params.clone()).await;
        let data = outcome_data(&outcome);
        let monthly = data.get("monthly_savings_amount").and_then(Value::as_f64).unwrap_or(0.0);
        json!({
            "status": if outcome_succeeded(&outcome) {"success"} else {"error"},
            "monthly_savings": monthly,
            "annual_savings": monthly * 12.0,
            "recommendations": data,
        })
    }

    async fn identify_orphaned(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "identify_orphaned_resources", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "orphaned_resources": outcome_data(&outcome)})
    }

    async fn budget_tracking(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "get_cost_analysis", params.clone()).await;
        let data = outcome_data(&outcome);
        let spent = data.get("amount").and_then(Value::as_f64).unwrap_or(0.0);
        let budget = params.get("budget_amount").and_then(Value::as_f64).unwrap_or(spent.max(1.0));
        let percent_used = (spent / budget) * 100.0;
        json!({
            "status": "success",
            "spent": spent,
            "budget": budget,
            "percent_used": percent_used,
            "alert_level": alert_level_for(percent_used),
        })
    }

    async fn recommendations(&self, workflow_id: &str, params: &Value) -> Value {
        let savings = self.find_savings(workflow_id, params).await;
        let orphaned = self.identify_orphaned(workflow_id, params).await;
        json!({"status": "success", "savings": savings, "orphaned_resources": orphaned})
    }

    async fn full(&self, workflow_id: &str, params: &Value) -> Value {
        let analysis = self.analyze_costs(workflow_id, params).await;
        let savings = self.find_savings(workflow_id, params).await;
        let orphaned = self.identify_orphaned(workflow_id, params).await;
        json!({"status": "success", "cost_analysis": analysis, "savings": savings, "orphaned_resources": orphaned})
    }
}

#[async_trait]
impl BaseAgent for CostOptimizationAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let query = request.parameters.get("query").and_then(Value::as_str).unwrap_or("cost review");
        let workflow_id = self.deps.ensure_workflow(request.workflow_id.as_deref(), query).await;
        let params = &request.parameters;

        let result = match request.action.as_str() {
            "analyze_costs" => self.analyze_costs(&workflow_id, params).await,
            "find_savings" => self.find_savings(&workflow_id, params).await,
            "identify_orphaned" => self.identify_orphaned(&workflow_id, params).await,
            "budget_tracking" => self.budget_tracking(&workflow_id, params).await,
            "recommendations" => self.recommendations(&workflow_id, params).await,
            "full" => self.full(&workflow_id, params).await,
            other => return Err(SreError::ExecutionError(format!("cost-optimization has no verb '{other}'"))),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alert_level_escalates_with_budget_consumption() {
        assert_eq!(alert_level_for(105.0), "over_budget");
        assert_eq!(alert_level_for(92.0), "critical");
        assert_eq!(alert_level_for(80.0), "warning");
        assert_eq!(alert_level_for(40.0), "on_track");
    }
}
