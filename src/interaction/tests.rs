use super::*;
use crate::transport::CliOutcome;
use async_trait::async_trait;

struct StubCli;

#[async_trait]
impl CloudCliExecutor for StubCli {
    async fn execute(&self, _command: &str, _timeout_secs: u64, _add_sub: bool) -> anyhow::Result<CliOutcome> {
        Ok(CliOutcome {
            status: "success".to_string(),
            output: Some(json!([{"name": "a1"}, {"name": "a2"}])),
            error: None,
        })
    }
}

fn handler() -> InteractionHandler {
    InteractionHandler::new(std::sync::Arc::new(StubCli))
}

#[test]
fn flags_missing_required_parameters() {
    let h = handler();
    let request = h
        .check_required_params("check_container_app_health", &json!({"container_app_name": "my-app"}))
        .expect("resource_group is missing");
    assert_eq!(request.kind, "needs_user_input");
    assert!(request.message.contains("resource group"));
}

#[test]
fn passes_when_all_required_parameters_present() {
    let h = handler();
    let result = h.check_required_params(
        "check_container_app_health",
        &json!({"container_app_name": "my-app", "resource_group": "prod-rg"}),
    );
    assert!(result.is_none());
}

#[test]
fn tools_without_a_required_params_entry_never_need_input() {
    let h = handler();
    assert!(h.check_required_params("describe_capabilities", &json!({})).is_none());
}

#[test]
fn discovery_triggers_on_category_cue_without_a_specific_name() {
    let h = handler();
    let result = h.needs_resource_discovery(&json!({}), "check health of a container app");
    assert_eq!(result, Some("container_app"));
}

#[test]
fn discovery_is_skipped_when_a_quoted_name_is_present() {
    let h = handler();
    let result = h.needs_resource_discovery(&json!({}), "check health of container app \"my-app\"");
    assert_eq!(result, None);
}

#[test]
fn discovery_is_skipped_when_a_hyphenated_name_is_present() {
    let h = handler();
    let result = h.needs_resource_discovery(&json!({}), "check health of container app my-app in prod-rg");
    assert_eq!(result, None);
}

#[test]
fn discovery_is_skipped_when_resource_id_already_set() {
    let h = handler();
    let result = h.needs_resource_discovery(&json!({"resource_id": "/sub/x"}), "check health of a container app");
    assert_eq!(result, None);
}

#[test]
fn selection_parses_by_index_first_top_last_and_substring() {
    let h = handler();
    let options = vec![json!({"index": 1, "name": "a1"}), json!({"index": 2, "name": "a2"})];
    assert_eq!(h.parse_user_selection("1", &options), Some(options[0].clone()));
    assert_eq!(h.parse_user_selection("first", &options), Some(options[0].clone()));
    assert_eq!(h.parse_user_selection("top", &options), Some(options[0].clone()));
    assert_eq!(h.parse_user_selection("last", &options), Some(options[1].clone()));
    assert_eq!(h.parse_user_selection("a2", &options), Some(options[1].clone()));
    assert_eq!(h.parse_user_selection("nonexistent", &options), None);
}

#[tokio::test]
async fn discover_container_apps_applies_the_name_filter() {
    let h = handler();
    let found = h.discover_container_apps(Some("prod-rg"), Some("a1")).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], json!("a1"));
}
