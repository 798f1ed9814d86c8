//! Per-category result aggregation (spec §4.10 "Aggregation").

use serde_json::{json, Value};

/// One tool's outcome within a single orchestrator run, independent of the
/// persisted [`crate::context::StepResult`] shape.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub tool: String,
    pub status: String,
    pub result: Option<Value>,
}

fn is_healthy(result: &Value) -> bool {
    let state = result
        .get("parsed")
        .or(Some(result))
        .and_then(|r| {
            r.get("availability_state")
                .or_else(|| r.get("health_status"))
                .or_else(|| r.get("status"))
        })
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_lowercase();
    state.contains("available") || state.contains("healthy") || state.contains("running")
}

fn extract_resource_name(outcome: &ToolOutcome) -> String {
    outcome
        .result
        .as_ref()
        .and_then(|r| r.get("parsed").or(Some(r)))
        .and_then(|r| r.get("name").and_then(Value::as_str))
        .unwrap_or(&outcome.tool)
        .to_string()
}

pub fn summarize_health(outcomes: &[ToolOutcome]) -> Value {
    let mut healthy = 0u64;
    let mut unhealthy = 0u64;
    let mut unhealthy_details = Vec::new();

    for outcome in outcomes {
        if outcome.status != "success" {
            continue;
        }
        let Some(result) = &outcome.result else { continue };
        if is_healthy(result) {
            healthy += 1;
        } else {
            unhealthy += 1;
            let data = result.get("parsed").unwrap_or(result);
            unhealthy_details.push(json!({
                "name": extract_resource_name(outcome),
                "status": data.get("availability_state")
                    .or_else(|| data.get("health_status"))
                    .or_else(|| data.get("status"))
                    .cloned()
                    .unwrap_or(Value::String("unknown".to_string())),
                "reason": data.get("reason").or_else(|| data.get("summary")).cloned(),
                "recent_error": data.get("recent_error").cloned(),
            }));
        }
    }

    json!({
        "healthy_resources": healthy,
        "unhealthy_resources": unhealthy,
        "total_checked": healthy + unhealthy,
        "unhealthy_details": unhealthy_details,
    })
}

/// Monthly savings sum plus annual savings divided by 12, per S4.
pub fn summarize_cost(outcomes: &[ToolOutcome]) -> Value {
    let mut savings_cents: i64 = 0;
    let mut orphaned_resources: u64 = 0;
    let mut tools_analyzed: u64 = 0;

    for outcome in outcomes {
        if outcome.status != "success" {
            continue;
        }
        let Some(result) = &outcome.result else { continue };
        let data = result.get("parsed").unwrap_or(result);
        tools_analyzed += 1;

        if let Some(monthly) = data.get("monthly_savings_amount").and_then(Value::as_f64) {
            savings_cents += (monthly * 100.0).round() as i64;
        }
        if let Some(annual) = data.get("savings_amount").and_then(Value::as_f64) {
            savings_cents += ((annual / 12.0) * 100.0).round() as i64;
        }
        if outcome.tool == "identify_orphaned_resources" {
            orphaned_resources += data
                .get("orphaned_count")
                .and_then(Value::as_u64)
                .or_else(|| data.get("resources").and_then(Value::as_array).map(|a| a.len() as u64))
                .unwrap_or(0);
        }
    }

    json!({
        "potential_savings": format!("${:.2}", savings_cents as f64 / 100.0),
        "orphaned_resources": orphaned_resources,
        "tools_analyzed": tools_analyzed,
    })
}

/// Suggestions for a performance query that returned no metrics, based on
/// an optional `check_resource_health` result fetched by the caller.
pub fn diagnose_no_metrics(resource_health: Option<&Value>) -> Vec<String> {
    let Some(health) = resource_health else {
        return vec!["no metrics were returned and resource power state could not be checked".to_string()];
    };
    let state = health
        .get("parsed")
        .or(Some(health))
        .and_then(|r| r.get("availability_state").or_else(|| r.get("status")))
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_lowercase();
    if state.contains("stop") || state.contains("deallocat") {
        vec!["the resource appears to be stopped; metrics are unavailable while it is not running".to_string()]
    } else if state.contains("available") || state.contains("running") {
        vec!["the resource is running but the telemetry workspace returned no data points for the requested window".to_string()]
    } else {
        vec![format!("resource power state is '{state}'; this may explain the missing metrics")]
    }
}

pub fn summarize_performance(outcomes: &[ToolOutcome], no_metrics_suggestions: &[String]) -> Value {
    let mut bottlenecks = 0u64;
    let mut recommendations = 0u64;
    let mut metrics_count = 0u64;

    for outcome in outcomes {
        if outcome.status != "success" {
            continue;
        }
        let Some(result) = &outcome.result else { continue };
        let data = result.get("parsed").unwrap_or(result);
        match outcome.tool.as_str() {
            "identify_bottlenecks" => {
                bottlenecks += data
                    .get("bottlenecks")
                    .and_then(Value::as_array)
                    .map(|a| a.len() as u64)
                    .unwrap_or(0);
            }
            "predict_resource_exhaustion" => {
                recommendations += data
                    .get("recommendations")
                    .and_then(Value::as_array)
                    .map(|a| a.len() as u64)
                    .unwrap_or(0);
            }
            "get_performance_metrics" => {
                metrics_count += data
                    .get("metrics")
                    .and_then(Value::as_array)
                    .map(|a| a.len() as u64)
                    .unwrap_or(0);
            }
            _ => {}
        }
    }

    let has_data = metrics_count > 0;
    json!({
        "bottlenecks_identified": bottlenecks,
        "capacity_recommendations": recommendations,
        "metrics_count": metrics_count,
        "has_data": has_data,
        "narrative": if has_data {
            None
        } else {
            Some("no performance metrics were returned for the requested resources")
        },
        "diagnostic_suggestions": if has_data { Vec::new() } else { no_metrics_suggestions.to_vec() },
    })
}

/// Generic fallback summary for categories without a dedicated shape.
pub fn summarize_generic(outcomes: &[ToolOutcome]) -> Value {
    let succeeded = outcomes.iter().filter(|o| o.status == "success").count();
    json!({
        "tools_executed": outcomes.len(),
        "tools_succeeded": succeeded,
    })
}

/// Groups outcomes by status into `errors` / `not_found` / `skipped`
/// collections (spec §4.10 "Failure semantics": "Per-tool failures never
/// abort the workflow; they are collected in `errors` / `skipped` /
/// `not_found`."). A preflight-blocked tool carries `status: "not_found"`
/// but is surfaced under `errors` too, matching scenario S3's
/// `results.errors[0].result.preflight_failed` assertion.
pub fn group_by_status(outcomes: &[ToolOutcome]) -> (Vec<Value>, Vec<Value>, Vec<Value>) {
    let mut errors = Vec::new();
    let mut not_found = Vec::new();
    let mut skipped = Vec::new();
    for outcome in outcomes {
        let entry = json!({"tool": outcome.tool, "result": outcome.result});
        match outcome.status.as_str() {
            "error" => errors.push(entry),
            "not_found" => {
                errors.push(entry.clone());
                not_found.push(entry);
            }
            "skipped" => skipped.push(entry),
            _ => {}
        }
    }
    (errors, not_found, skipped)
}

/// `Some` aggregated message when every tool outcome in the run failed
/// inventory preflight: "a totally failed preflight across all tools
/// yields a user-visible 'resources not found in inventory' aggregated
/// message with suggestions" (spec §4.10 "Failure semantics").
pub fn all_preflight_failed_message(outcomes: &[ToolOutcome]) -> Option<Value> {
    if outcomes.is_empty() {
        return None;
    }
    let all_failed = outcomes.iter().all(|o| {
        o.status == "not_found"
            && o.result
                .as_ref()
                .and_then(|r| r.get("preflight_failed"))
                .and_then(Value::as_bool)
                .unwrap_or(false)
    });
    if !all_failed {
        return None;
    }
    let suggestions: Vec<Value> = outcomes
        .iter()
        .filter_map(|o| o.result.as_ref().and_then(|r| r.get("suggestion")).cloned())
        .collect();
    Some(json!({
        "message": "Resources not found in inventory.",
        "suggestions": suggestions,
    }))
}
