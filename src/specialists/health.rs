//! HealthMonitoring specialist: check_health, diagnose, check_dependencies,
//! continuous_monitor, recommendations, full (spec §4.11).

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::errors::SreError;

use super::common::{outcome_data, outcome_succeeded, SpecialistDeps};

/// Sampling cadence for `continuous_monitor`: one sample every
/// `SAMPLE_INTERVAL_SECS`, capped at `MAX_SAMPLES` regardless of the
/// requested duration. A faithful sampled series, not a single snapshot.
const SAMPLE_INTERVAL_SECS: u64 = 30;
const MAX_SAMPLES: u64 = 10;

pub struct HealthMonitoringAgent {
    state: AgentState,
    deps: SpecialistDeps,
}

impl HealthMonitoringAgent {
    pub fn new(deps: SpecialistDeps) -> Self {
        Self {
            state: AgentState::new("health-monitoring"),
            deps,
        }
    }

    fn health_tool_for(params: &Value) -> &'static str {
        match params.get("resource_type").and_then(Value::as_str) {
            Some("aks_cluster") => "check_aks_cluster_health",
            Some("container_app") => "check_container_app_health",
            _ => "check_resource_health",
        }
    }

    async fn check_health(&self, workflow_id: &str, params: &Value) -> Value {
        let tool = Self::health_tool_for(params);
        let outcome = self.deps.call_tool(workflow_id, tool, params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "health": outcome_data(&outcome)})
    }

    async fn diagnose(&self, workflow_id: &str, params: &Value) -> Value {
        let health = self.check_health(workflow_id, params).await;
        let metrics = self.deps.call_tool(workflow_id, "get_performance_metrics", params.clone()).await;
        json!({"status": "success", "health": health, "metrics": outcome_data(&metrics)})
    }

    async fn check_dependencies(&self, workflow_id: &str, params: &Value) -> Value {
        let outcome = self.deps.call_tool(workflow_id, "get_resource_dependencies", params.clone()).await;
        json!({"status": if outcome_succeeded(&outcome) {"success"} else {"error"}, "dependencies": outcome_data(&outcome)})
    }

    /// Takes repeated samples, sleeping `SAMPLE_INTERVAL_SECS` between
    /// each, rather than the single snapshot the source implementation
    /// took despite its `duration_minutes` parameter.
    async fn continuous_monitor(&self, workflow_id: &str, params: &Value) -> Value {
        let duration_minutes = params.get("duration_minutes").and_then(Value::as_u64).unwrap_or(1);
        let requested_samples = (duration_minutes * 60) / SAMPLE_INTERVAL_SECS.max(1);
        let sample_count = requested_samples.clamp(1, MAX_SAMPLES);

        let tool = Self::health_tool_for(params);
        let mut samples = Vec::with_capacity(sample_count as usize);
        for index in 0..sample_count {
            if index > 0 {
                tokio::time::sleep(std::time::Duration::from_secs(SAMPLE_INTERVAL_SECS)).await;
            }
            let outcome = self.deps.call_tool(workflow_id, tool, params.clone()).await;
            samples.push(json!({"sample": index, "health": outcome_data(&outcome)}));
        }
        json!({"status": "success", "sample_interval_secs": SAMPLE_INTERVAL_SECS, "samples": samples})
    }

    async fn recommendations(&self, workflow_id: &str, params: &Value) -> Value {
        let health = self.check_health(workflow_id, params).await;
        let healthy = health["health"]
            .get("availability_state")
            .and_then(Value::as_str)
            .is_some_and(|s| s.eq_ignore_ascii_case("available"));
        let recs: Vec<&str> = if healthy {
            vec!["no action needed"]
        } else {
            vec!["investigate recent deployments", "check dependent resource health"]
        };
        json!({"status": "success", "recommendations": recs})
    }

    async fn full(&self, workflow_id: &str, params: &Value) -> Value {
        let health = self.check_health(workflow_id, params).await;
        let dependencies = self.check_dependencies(workflow_id, params).await;
        let recommendations = self.recommendations(workflow_id, params).await;
        json!({"status": "success", "health": health, "dependencies": dependencies, "recommendations": recommendations})
    }
}

#[async_trait]
impl BaseAgent for HealthMonitoringAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let query = request.parameters.get("query").and_then(Value::as_str).unwrap_or("health check");
        let workflow_id = self.deps.ensure_workflow(request.workflow_id.as_deref(), query).await;
        let params = &request.parameters;

        let result = match request.action.as_str() {
            "check_health" => self.check_health(&workflow_id, params).await,
            "diagnose" => self.diagnose(&workflow_id, params).await,
            "check_dependencies" => self.check_dependencies(&workflow_id, params).await,
            "continuous_monitor" => self.continuous_monitor(&workflow_id, params).await,
            "recommendations" => self.recommendations(&workflow_id, params).await,
            "full" => self.full(&workflow_id, params).await,
            other => return Err(SreError::ExecutionError(format!("health-monitoring has no verb '{other}'"))),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_tool_selection_follows_resource_type() {
        assert_eq!(
            HealthMonitoringAgent::health_tool_for(&json!({"resource_type": "aks_cluster"})),
            "check_aks_cluster_health"
        );
        assert_eq!(
            HealthMonitoringAgent::health_tool_for(&json!({"resource_type": "container_app"})),
            "check_container_app_health"
        );
        assert_eq!(HealthMonitoringAgent::health_tool_for(&json!({})), "check_resource_health");
    }
}
