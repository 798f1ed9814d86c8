//! PerformanceAnalysis specialist: analyze, bottlenecks, anomalies, capacity,
//! optimize, compare, full (spec §4.11).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::errors::SreError;

use super::common::{outcome_data, outcome_succeeded, SpecialistDeps};

/// CPU/memory utilization bands driving the `optimize` strategy map,
/// ordered high to low so the first match wins.
const UTILIZATION_STRATEGIES: &[(f64, &str)] = &[
    (90.0, "scale out immediately, utilization is critical"),
    (75.0, "plan a scale-out within the next maintenance window"),
    (30.0, "utilization is healthy, no action needed"),
];

fn strategy_for_utilization(percent: f64) -> &'static str {
    UTILIZATION_STRATEGIES
        .iter()
        .find(|(threshold, _)| percent >= *threshold)
        .map(|(_, strategy)| *strategy)
        .unwrap_or("utilization is low, consider scaling in to reduce cost")
}

pub struct PerformanceAnalysisAgent {
    state: AgentState,
    deps: SpecialistDeps,
}

impl PerformanceAnalysisAgent {
    pub fn new(deps: SpecialistDeps) -> Self {
        Self {
            state: AgentState::new("performance-analysis"),
            deps,
        }
    }

    async fn analyze(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "get_performance_metrics", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "metrics": outcome_data(&outcome)})
    }

    async fn bottlenecks(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "identify_bottlenecks", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "bottlenecks": outcome_data(&outcome)})
    }

    async fn anomalies(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "get_performance_metrics", params.clone()).await;
        let data = outcome_data(&outcome);
        let baseline = data.get("baseline_cpu_percent").and_then(Value::as_f64).unwrap_or(50.0);
        let current = data.get("cpu_percent").and_then(Value::as_f64).unwrap_or(baseline);
        let deviation = (current - baseline).abs();
        json!({
            "status": "success",
            "baseline_cpu_percent": baseline,
            "current_cpu_percent": current,
            "deviation": deviation,
            "is_anomalous": deviation > baseline * 0.5,
        })
    }

    async fn capacity(&self, workflow_id: &str, params: &Value) -> Value {
        let metrics = self.analyze(workflow_id, params).await;
        let cpu = metrics["metrics"].get("cpu_percent").and_then(Value::as_f64).unwrap_or(0.0);
        let headroom_percent = (100.0 - cpu).max(0.0);
        json!({"status": "success", "current_cpu_percent": cpu, "headroom_percent": headroom_percent})
    }

    async fn optimize(&self, workflow_id: &str, params: &Value) -> Value {
        let metrics = self.analyze(workflow_id, params).await;
        let cpu = metrics["metrics"].get("cpu_percent").and_then(Value::as_f64).unwrap_or(0.0);
        json!({"status": "success", "cpu_percent": cpu, "strategy": strategy_for_utilization(cpu)})
    }

    async fn compare(&self, workflow_id: &str, params: &Value) -> Value {
        let current = self.deps.call_tool(workflow_id, "get_performance_metrics", params.clone()).await;
        let mut baseline_params = params.clone();
        if let Value::Object(ref mut map) = baseline_params {
            map.insert("time_range".to_string(), Value::String("previous_period".to_string()));
        }
        let baseline = self.deps.call_tool(workflow_id, "get_performance_metrics", baseline_params).await;
        json!({"status": "success", "current": outcome_data(&current), "baseline": outcome_data(&baseline)})
    }

    async fn full(&self, workflow_id: &str, params: &Value) -> Value {
        let analyze = self.analyze(workflow_id, params).await;
        let bottlenecks = self.bottlenecks(workflow_id, params).await;
        let optimize = self.optimize(workflow_id, params).await;
        json!({"status": "success", "metrics": analyze, "bottlenecks": bottlenecks, "recommendation": optimize})
    }
}

#[async_trait]
impl BaseAgent for PerformanceAnalysisAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let query = request.parameters.get("query").and_then(Value::as_str).unwrap_or("performance check");
        let workflow_id = self.deps.ensure_workflow(request.workflow_id.as_deref(), query).await;
        let params = &request.parameters;

        let result = match request.action.as_str() {
            "analyze" => self.analyze(&workflow_id, params).await,
            "bottlenecks" => self.bottlenecks(&workflow_id, params).await,
            "anomalies" => self.anomalies(&workflow_id, params).await,
            "capacity" => self.capacity(&workflow_id, params).await,
            "optimize" => self.optimize(&workflow_id, params).await,
            "compare" => self.compare(&workflow_id, params).await,
            "full" => self.full(&workflow_id, params).await,
            other => return Err(SreError::ExecutionError(format!("performance-analysis has no verb '{other}'"))),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_escalates_with_utilization() {
        assert_eq!(strategy_for_utilization(95.0), "scale out immediately, utilization is critical");
        assert_eq!(strategy_for_utilization(80.0), "plan a scale-out within the next maintenance window");
        assert_eq!(strategy_for_utilization(40.0), "utilization is healthy, no action needed");
        assert_eq!(strategy_for_utilization(5.0), "utilization is low, consider scaling in to reduce cost");
    }
}
