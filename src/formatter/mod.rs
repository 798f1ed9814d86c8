//! Converts tool and aggregation results into structured, user-facing
//! fragments (C7). Every function here is pure: no I/O, no agent state.

use serde_json::{json, Map, Value};

/// Fixed severity table (spec §4.7): healthy/available/success -> ok;
/// degraded/warning -> warn; error/critical -> err; anything else -> unk.
pub fn severity_icon(status: &str) -> &'static str {
    match status.to_lowercase().as_str() {
        "healthy" | "available" | "success" | "ok" => "\u{2705}",
        "degraded" | "warning" | "warn" => "\u{26A0}\u{FE0F}",
        "error" | "critical" | "err" => "\u{1F534}",
        _ => "\u{2753}",
    }
}

fn columns_for(resource_type: &str) -> &'static [&'static str] {
    match resource_type {
        "virtual_machine" => &["#", "Name", "Power State", "Size", "Resource Group"],
        "container_app" => &["#", "Name", "Status", "Revision", "Resource Group"],
        "resource_group" => &["#", "Name", "Location", "Tags"],
        "log_analytics_workspace" => &["#", "Name", "Retention (days)", "Resource Group"],
        _ => &["#", "Name", "Location", "Resource Group"],
    }
}

fn extract_field(resource: &Value, dotted_path: &str) -> Value {
    let mut current = resource;
    for part in dotted_path.split('.') {
        match current.get(part) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

fn field_for_column(column: &str) -> Option<&'static str> {
    match column {
        "Name" => Some("name"),
        "Power State" => Some("power_state"),
        "Size" => Some("vm_size"),
        "Resource Group" => Some("resource_group"),
        "Status" => Some("status"),
        "Revision" => Some("revision"),
        "Location" => Some("location"),
        "Tags" => Some("tags"),
        "Retention (days)" => Some("retention_days"),
        _ => None,
    }
}

fn build_resource_table(resources: &[Value], resource_type: &str) -> Value {
    let columns = columns_for(resource_type);
    let rows: Vec<Value> = resources
        .iter()
        .enumerate()
        .map(|(i, resource)| {
            let mut row = Map::new();
            row.insert("#".to_string(), json!(i + 1));
            for column in columns.iter().skip(1) {
                let value = field_for_column(column)
                    .map(|field| extract_field(resource, field))
                    .unwrap_or(Value::Null);
                row.insert((*column).to_string(), value);
            }
            Value::Object(row)
        })
        .collect();
    json!({"columns": columns, "rows": rows})
}

/// Builds a table description keyed by column profiles per resource type.
/// Rows are indexed from 1.
pub fn format_resource_list(resources: &[Value], resource_type: &str, context: Option<&str>) -> Value {
    json!({
        "kind": "resource_list",
        "resource_type": resource_type,
        "context": context,
        "count": resources.len(),
        "table": build_resource_table(resources, resource_type),
    })
}

pub fn format_health_status(healthy: u64, unhealthy: u64, unhealthy_details: &[Value]) -> Value {
    let total = healthy + unhealthy;
    let status = if unhealthy == 0 { "healthy" } else { "degraded" };
    json!({
        "kind": "health_status",
        "icon": severity_icon(status),
        "healthy_count": healthy,
        "unhealthy_count": unhealthy,
        "total_checked": total,
        "unhealthy_details": unhealthy_details,
    })
}

pub fn format_cost_summary(potential_savings_cents: i64, orphaned_resources: u64, tools_analyzed: u64) -> Value {
    json!({
        "kind": "cost_summary",
        "potential_savings": format!("${:.2}", potential_savings_cents as f64 / 100.0),
        "orphaned_resources": orphaned_resources,
        "tools_analyzed": tools_analyzed,
    })
}

pub fn format_performance_metrics(
    bottlenecks: u64,
    recommendations: u64,
    metrics_count: u64,
    has_data: bool,
    no_metrics_narrative: Option<&str>,
) -> Value {
    let cpu_icon = if metrics_count == 0 {
        severity_icon("unknown")
    } else {
        severity_icon("healthy")
    };
    json!({
        "kind": "performance_metrics",
        "icon": cpu_icon,
        "bottlenecks_identified": bottlenecks,
        "capacity_recommendations": recommendations,
        "metrics_count": metrics_count,
        "has_data": has_data,
        "narrative": no_metrics_narrative,
    })
}

pub fn format_incident_summary(severity: &str, affected_resources: &[String]) -> Value {
    let shown: Vec<&String> = affected_resources.iter().take(5).collect();
    let more = affected_resources.len().saturating_sub(5);
    json!({
        "kind": "incident_summary",
        "icon": severity_icon(severity),
        "severity": severity,
        "affected_resources": shown,
        "more_resources": more,
    })
}

pub fn format_success_message(message: &str) -> Value {
    json!({"kind": "success", "message": message})
}

pub fn format_error_message(error: &str, suggestions: Option<&[String]>) -> Value {
    json!({
        "kind": "error",
        "message": error,
        "suggestions": suggestions.unwrap_or(&[]),
    })
}

/// Builds a 1-indexed selection prompt for ambiguous resource matches.
pub fn format_selection_prompt(resources: &[Value], resource_type: &str, action: &str) -> Value {
    let options: Vec<Value> = resources
        .iter()
        .enumerate()
        .map(|(i, resource)| {
            json!({
                "index": i + 1,
                "name": extract_field(resource, "name"),
                "id": extract_field(resource, "id"),
            })
        })
        .collect();
    json!({
        "message": format!("Multiple {resource_type} resources match — please select one."),
        "requires_selection": true,
        "resource_type": resource_type,
        "action": action,
        "options": options,
    })
}

#[cfg(test)]
mod tests;
