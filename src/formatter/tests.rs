use super::*;

#[test]
fn severity_icon_maps_the_fixed_table() {
    assert_eq!(severity_icon("healthy"), severity_icon("available"));
    assert_ne!(severity_icon("healthy"), severity_icon("critical"));
    assert_eq!(severity_icon("UNKNOWN_STATUS"), severity_icon("literally anything"));
}

#[test]
fn resource_list_indexes_rows_from_one() {
    let resources = vec![json!({"name": "a1"}), json!({"name": "a2"})];
    let formatted = format_resource_list(&resources, "container_app", None);
    let rows = formatted["table"]["rows"].as_array().unwrap();
    assert_eq!(rows[0]["#"], json!(1));
    assert_eq!(rows[1]["#"], json!(2));
}

#[test]
fn selection_prompt_carries_index_name_and_id() {
    let resources = vec![json!({"name": "a1", "id": "/sub/a1"}), json!({"name": "a2", "id": "/sub/a2"})];
    let prompt = format_selection_prompt(&resources, "container_app", "check_health");
    assert_eq!(prompt["requires_selection"], json!(true));
    let options = prompt["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert_eq!(options[0]["index"], json!(1));
    assert_eq!(options[0]["name"], json!("a1"));
}

#[test]
fn cost_summary_formats_cents_as_dollars() {
    let summary = format_cost_summary(20000, 3, 2);
    assert_eq!(summary["potential_savings"], json!("$200.00"));
}
