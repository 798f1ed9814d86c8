//! Detects missing/ambiguous tool parameters, drives resource discovery,
//! and parses operator selections (C8).

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};

use crate::transport::CloudCliExecutor;

/// An orchestrator result variant meaning "operator input needed before
/// continuing" (spec §3).
#[derive(Debug, Clone)]
pub struct InteractionRequest {
    pub kind: &'static str,
    pub message: String,
    pub options: Option<Vec<Value>>,
}

/// Static per-tool required-parameter table (spec §4.8).
const TOOL_REQUIRED_PARAMS: &[(&str, &[&str])] = &[
    ("check_container_app_health", &["container_app_name", "resource_group"]),
    ("check_aks_cluster_health", &["cluster_name", "resource_group"]),
    ("check_resource_health", &["resource_id"]),
    ("get_performance_metrics", &["resource_id"]),
    ("identify_bottlenecks", &["resource_id"]),
    ("get_cost_analysis", &["scope"]),
    ("check_compliance_status", &["scope"]),
    ("analyze_cost_anomalies", &["scope"]),
    ("query_app_service_configuration", &["app_name", "resource_group"]),
    ("query_container_app_configuration", &["container_app_name", "resource_group"]),
    ("scale_resource", &["resource_id", "target_capacity"]),
    ("execute_safe_restart", &["resource_id"]),
];

/// Resource-type -> keyword cues used by the ambiguity heuristic.
const AMBIGUOUS_INDICATORS: &[(&str, &[&str])] = &[
    ("container_app", &["container app", "container apps"]),
    ("virtual_machine", &["vm", "virtual machine", "virtual machines"]),
    ("aks_cluster", &["aks", "kubernetes cluster", "cluster"]),
    ("resource_group", &["resource group"]),
    ("log_analytics_workspace", &["workspace", "log analytics"]),
];

static QUOTED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"["']([\w.-]+)["']"#).unwrap());
static HYPHENATED_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-z0-9]+(?:-[a-z0-9]+){1,}\b").unwrap());
static NAMED_PHRASE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(named|called)\s+\S+|\bthe\s+app\b|\bmy\s+vm\b").unwrap());

fn has_specific_resource_name(query_lower: &str) -> bool {
    QUOTED_NAME_RE.is_match(query_lower)
        || HYPHENATED_NAME_RE.is_match(query_lower)
        || NAMED_PHRASE_RE.is_match(query_lower)
}

fn labels_for(missing: &[&str]) -> Vec<String> {
    missing
        .iter()
        .map(|p| p.replace('_', " "))
        .collect()
}

fn format_missing_params_message(tool: &str, missing: &[&str]) -> String {
    let labels = labels_for(missing).join(", ");
    format!("'{tool}' needs more information: {labels}.")
}

pub struct InteractionHandler {
    cli_executor: Arc<dyn CloudCliExecutor>,
}

impl InteractionHandler {
    pub fn new(cli_executor: Arc<dyn CloudCliExecutor>) -> Self {
        Self { cli_executor }
    }

    /// `None` if every required parameter for `tool` is present and
    /// non-null in `params`.
    pub fn check_required_params(&self, tool: &str, params: &Value) -> Option<InteractionRequest> {
        let required = TOOL_REQUIRED_PARAMS
            .iter()
            .find(|(name, _)| *name == tool)
            .map(|(_, params)| *params)?;
        let missing: Vec<&str> = required
            .iter()
            .filter(|p| !params.get(**p).is_some_and(|v| !v.is_null()))
            .copied()
            .collect();
        if missing.is_empty() {
            return None;
        }
        Some(InteractionRequest {
            kind: "needs_user_input",
            message: format_missing_params_message(tool, &missing),
            options: None,
        })
    }

    /// Returns the resource type needing discovery if the query mentions a
    /// known resource category by keyword cue but names no specific
    /// resource, and `params` has neither `resource_id` nor `name` set.
    pub fn needs_resource_discovery(&self, params: &Value, query: &str) -> Option<&'static str> {
        if params.get("resource_id").is_some_and(|v| !v.is_null())
            || params.get("name").is_some_and(|v| !v.is_null())
        {
            return None;
        }
        let query_lower = query.to_lowercase();
        if has_specific_resource_name(&query_lower) {
            return None;
        }
        AMBIGUOUS_INDICATORS
            .iter()
            .find(|(_, cues)| cues.iter().any(|cue| query_lower.contains(cue)))
            .map(|(resource_type, _)| *resource_type)
    }

    async fn run_discovery(&self, command: &str) -> Vec<Value> {
        match self.cli_executor.execute(command, 30, true).await {
            Ok(outcome) if outcome.status == "success" => outcome
                .output
                .and_then(|v| v.as_array().cloned())
                .unwrap_or_default(),
            Ok(outcome) => {
                tracing::warn!("discovery command failed: {:?}", outcome.error);
                Vec::new()
            }
            Err(err) => {
                tracing::warn!("discovery command errored: {err}");
                Vec::new()
            }
        }
    }

    fn apply_name_filter(resources: Vec<Value>, name_filter: Option<&str>) -> Vec<Value> {
        let Some(filter) = name_filter else {
            return resources;
        };
        let filter_lower = filter.to_lowercase();
        resources
            .into_iter()
            .filter(|r| {
                r.get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.to_lowercase().contains(&filter_lower))
            })
            .collect()
    }

    pub async fn discover_container_apps(&self, resource_group: Option<&str>, name_filter: Option<&str>) -> Vec<Value> {
        let command = match resource_group {
            Some(rg) => format!("az containerapp list -g {rg} -o json"),
            None => "az containerapp list -o json".to_string(),
        };
        Self::apply_name_filter(self.run_discovery(&command).await, name_filter)
            .into_iter()
            .take(10)
            .collect()
    }

    pub async fn discover_virtual_machines(&self, resource_group: Option<&str>, name_filter: Option<&str>) -> Vec<Value> {
        let command = match resource_group {
            Some(rg) => format!("az vm list -g {rg} -o json"),
            None => "az vm list -o json".to_string(),
        };
        Self::apply_name_filter(self.run_discovery(&command).await, name_filter)
            .into_iter()
            .take(10)
            .collect()
    }

    pub async fn discover_resource_groups(&self, name_filter: Option<&str>) -> Vec<Value> {
        let command = "az group list -o json".to_string();
        Self::apply_name_filter(self.run_discovery(&command).await, name_filter)
            .into_iter()
            .take(10)
            .collect()
    }

    pub async fn discover_log_analytics_workspaces(
        &self,
        resource_group: Option<&str>,
        name_filter: Option<&str>,
    ) -> Vec<Value> {
        let command = match resource_group {
            Some(rg) => format!("az monitor log-analytics workspace list -g {rg} -o json"),
            None => "az monitor log-analytics workspace list -o json".to_string(),
        };
        Self::apply_name_filter(self.run_discovery(&command).await, name_filter)
            .into_iter()
            .take(10)
            .collect()
    }

    /// Priority order: 1-indexed integer match, *first/1st/top*,
    /// *last/bottom*, substring match against option names.
    pub fn parse_user_selection(&self, user_input: &str, options: &[Value]) -> Option<Value> {
        let trimmed = user_input.trim();
        let lower = trimmed.to_lowercase();

        if let Ok(index) = trimmed.parse::<usize>() {
            if index >= 1 && index <= options.len() {
                return options.get(index - 1).cloned();
            }
        }
        if ["first", "1st", "top"].contains(&lower.as_str()) {
            return options.first().cloned();
        }
        if ["last", "bottom"].contains(&lower.as_str()) {
            return options.last().cloned();
        }
        options
            .iter()
            .find(|o| {
                o.get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.to_lowercase().contains(&lower))
            })
            .cloned()
    }
}

pub fn needs_user_input_response(request: &InteractionRequest) -> Value {
    json!({
        "status": "needs_user_input",
        "message": request.message,
        "options": request.options,
    })
}

#[cfg(test)]
mod tests;
