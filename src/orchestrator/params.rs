//! Parameter preparation (spec §4.10 "Parameter preparation"): seed from
//! the request, merge context, apply environment defaults, form scope for
//! scope-requiring tools, run interaction gating and discovery, then
//! validate required parameters.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::formatter::format_selection_prompt;
use crate::interaction::InteractionHandler;
use crate::interaction::InteractionRequest;

fn name_param_for_tool(tool: &str) -> &'static str {
    match tool {
        "check_container_app_health" | "query_container_app_configuration" => "container_app_name",
        "check_aks_cluster_health" | "query_aks_configuration" => "cluster_name",
        _ => "name",
    }
}

static NAME_BEFORE_IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([a-z0-9]+(?:-[a-z0-9]+)+)\s+in\b").unwrap());
static RESOURCE_GROUP_AFTER_IN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bin\s+([a-z0-9]+(?:-[a-z0-9]+)+)\b").unwrap());

/// Pulls a hyphenated resource name and a trailing "in <resource-group>"
/// clause out of free-text queries, e.g. "...container app my-app in
/// prod-rg" -> `(Some("my-app"), Some("prod-rg"))`.
fn extract_named_entities(query: &str) -> (Option<String>, Option<String>) {
    let lower = query.to_lowercase();
    let name = NAME_BEFORE_IN_RE.captures(&lower).map(|c| c[1].to_string());
    let resource_group = RESOURCE_GROUP_AFTER_IN_RE.captures(&lower).map(|c| c[1].to_string());
    (name, resource_group)
}

/// Tools that require an ARM-style scope (`/subscriptions/{id}` or
/// `/subscriptions/{id}/resourceGroups/{rg}`) rather than a single resource.
const SCOPE_REQUIRING_TOOLS: &[&str] = &[
    "get_cost_analysis",
    "get_cost_recommendations",
    "check_compliance_status",
    "analyze_cost_anomalies",
];

#[derive(Debug, Clone)]
pub enum PreparedParams {
    Ready(Value),
    NeedsUserInput(InteractionRequest),
    Skip(String),
}

fn merge_non_null(target: &mut Map<String, Value>, source: &Value) {
    if let Value::Object(map) = source {
        for (k, v) in map {
            if !v.is_null() {
                target.insert(k.clone(), v.clone());
            }
        }
    }
}

fn form_scope(params: &Map<String, Value>, config: &Config) -> Option<String> {
    if let Some(scope) = params.get("scope").and_then(Value::as_str) {
        return Some(Config::normalize_subscription_scope(scope));
    }
    let subscription = params
        .get("subscription_id")
        .and_then(Value::as_str)
        .or(config.subscription_id.as_deref())?;
    let base = Config::normalize_subscription_scope(subscription);
    match params.get("resource_group").and_then(Value::as_str) {
        Some(rg) => Some(format!("{base}/resourceGroups/{rg}")),
        None => Some(base),
    }
}

/// Runs the full pipeline for one tool call within an orchestrator
/// request. `query` is the operator's natural-language request, used by
/// the interaction handler's ambiguity heuristic.
pub async fn prepare_parameters(
    tool: &str,
    parameters: &Value,
    context: &Value,
    query: &str,
    config: &Config,
    interaction: &InteractionHandler,
) -> PreparedParams {
    let mut params = match parameters {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    merge_non_null(&mut params, context);

    if let Some(subscription) = &config.subscription_id {
        params
            .entry("subscription_id")
            .or_insert_with(|| Value::String(Config::normalize_subscription_scope(subscription)));
    }
    if let Some(workspace) = &config.workspace_id {
        params
            .entry("workspace_id")
            .or_insert_with(|| Value::String(workspace.clone()));
    }

    let name_field = name_param_for_tool(tool);
    if params.get(name_field).is_none() && params.get("resource_id").is_none() {
        let (name, resource_group) = extract_named_entities(query);
        if let Some(name) = name {
            params.insert(name_field.to_string(), Value::String(name));
        }
        if params.get("resource_group").is_none() {
            if let Some(rg) = resource_group {
                params.insert("resource_group".to_string(), Value::String(rg));
            }
        }
    }

    if SCOPE_REQUIRING_TOOLS.contains(&tool) {
        match form_scope(&params, config) {
            Some(scope) => {
                params.insert("scope".to_string(), Value::String(scope));
            }
            None => return PreparedParams::Skip(format!("'{tool}' requires a scope and none could be formed")),
        }
    }

    if let Some(resource_type) = interaction.needs_resource_discovery(&Value::Object(params.clone()), query) {
        let resource_group = params.get("resource_group").and_then(Value::as_str);
        let matches = match resource_type {
            "container_app" => interaction.discover_container_apps(resource_group, None).await,
            "virtual_machine" => interaction.discover_virtual_machines(resource_group, None).await,
            "resource_group" => interaction.discover_resource_groups(None).await,
            "log_analytics_workspace" => {
                interaction.discover_log_analytics_workspaces(resource_group, None).await
            }
            _ => Vec::new(),
        };
        match matches.len() {
            0 => {}
            1 => {
                if let Some(name) = matches[0].get("name").and_then(Value::as_str) {
                    params.insert("name".to_string(), Value::String(name.to_string()));
                }
                if let Some(id) = matches[0].get("id").and_then(Value::as_str) {
                    params.insert("resource_id".to_string(), Value::String(id.to_string()));
                }
            }
            _ => {
                let prompt = format_selection_prompt(&matches, resource_type, tool);
                return PreparedParams::NeedsUserInput(InteractionRequest {
                    kind: "needs_user_input",
                    message: prompt["message"].as_str().unwrap_or_default().to_string(),
                    options: prompt["options"].as_array().cloned(),
                });
            }
        }
    }

    if let Some(request) = interaction.check_required_params(tool, &Value::Object(params.clone())) {
        return PreparedParams::NeedsUserInput(request);
    }

    PreparedParams::Ready(json!(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::CliOutcome;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StubCli;

    #[async_trait]
    impl crate::transport::CloudCliExecutor for StubCli {
        async fn execute(&self, _command: &str, _timeout_secs: u64, _add_sub: bool) -> anyhow::Result<CliOutcome> {
            Ok(CliOutcome {
                status: "success".to_string(),
                output: Some(json!([{"name": "a1", "id": "/sub/a1"}, {"name": "a2", "id": "/sub/a2"}])),
                error: None,
            })
        }
    }

    fn handler() -> InteractionHandler {
        InteractionHandler::new(Arc::new(StubCli))
    }

    #[tokio::test]
    async fn scope_is_formed_from_config_subscription() {
        let config = Config {
            subscription_id: Some("abc-123".to_string()),
            ..Config::default()
        };
        let result = prepare_parameters(
            "get_cost_analysis",
            &json!({"resource_group": "prod-rg"}),
            &json!({}),
            "find cost savings",
            &config,
            &handler(),
        )
        .await;
        match result {
            PreparedParams::Ready(params) => {
                assert_eq!(params["scope"], json!("/subscriptions/abc-123/resourceGroups/prod-rg"));
            }
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scope_requiring_tool_without_subscription_is_skipped() {
        let config = Config::default();
        let result = prepare_parameters(
            "get_cost_analysis",
            &json!({}),
            &json!({}),
            "find cost savings",
            &config,
            &handler(),
        )
        .await;
        assert!(matches!(result, PreparedParams::Skip(_)));
    }

    #[tokio::test]
    async fn ambiguous_query_with_multiple_matches_needs_user_input() {
        let config = Config::default();
        let result = prepare_parameters(
            "check_container_app_health",
            &json!({}),
            &json!({}),
            "check health of a container app",
            &config,
            &handler(),
        )
        .await;
        assert!(matches!(result, PreparedParams::NeedsUserInput(_)));
    }

    #[tokio::test]
    async fn specific_name_and_resource_group_are_extracted_from_the_query() {
        let config = Config::default();
        let result = prepare_parameters(
            "check_container_app_health",
            &json!({}),
            &json!({}),
            "check health of container app my-app in prod-rg",
            &config,
            &handler(),
        )
        .await;
        match result {
            PreparedParams::Ready(params) => {
                assert_eq!(params["container_app_name"], json!("my-app"));
                assert_eq!(params["resource_group"], json!("prod-rg"));
            }
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_required_parameter_needs_user_input() {
        let config = Config::default();
        let result = prepare_parameters(
            "check_container_app_health",
            &json!({"container_app_name": "my-app"}),
            &json!({}),
            "check health of container app my-app",
            &config,
            &handler(),
        )
        .await;
        assert!(matches!(result, PreparedParams::NeedsUserInput(_)));
    }
}
