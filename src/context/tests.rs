use super::*;
use serde_json::json;

fn store() -> ContextStore {
    ContextStore::new(None)
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let store = store();
    store.initialize().await;
    let mut initial = Map::new();
    initial.insert("query".to_string(), json!("check health"));
    store.create("wf-1", initial, 86_400).await;

    let ctx = store.get("wf-1").await.expect("context should exist");
    assert_eq!(ctx.shared_data.get("query"), Some(&json!("check health")));
    assert_eq!(ctx.metadata.status, "created");
}

#[tokio::test]
async fn update_shallow_merges_shared_data() {
    let store = store();
    store.initialize().await;
    let mut initial = Map::new();
    initial.insert("a".to_string(), json!(1));
    store.create("wf-2", initial, 86_400).await;

    let mut patch_data = Map::new();
    patch_data.insert("b".to_string(), json!(2));
    store
        .update(
            "wf-2",
            ContextPatch {
                shared_data: Some(patch_data),
                metadata: None,
            },
        )
        .await;

    let ctx = store.get("wf-2").await.unwrap();
    assert_eq!(ctx.shared_data.get("a"), Some(&json!(1)));
    assert_eq!(ctx.shared_data.get("b"), Some(&json!(2)));
}

#[tokio::test]
async fn add_step_result_keeps_current_step_in_sync() {
    let store = store();
    store.initialize().await;
    store.create("wf-3", Map::new(), 86_400).await;

    store
        .add_step_result("wf-3", "step-1", "agent-a", json!({"ok": true}))
        .await;
    store
        .add_step_result("wf-3", "step-2", "agent-b", json!({"ok": true}))
        .await;

    let ctx = store.get("wf-3").await.unwrap();
    assert_eq!(ctx.metadata.current_step, ctx.step_results.len());
    assert_eq!(ctx.step_results.len(), 2);
    assert_eq!(ctx.step_results[0].step_id, "step-1");
    assert_eq!(ctx.step_results[1].step_id, "step-2");
}

#[tokio::test]
async fn step_results_can_be_filtered_by_agent() {
    let store = store();
    store.initialize().await;
    store.create("wf-4", Map::new(), 86_400).await;
    store.add_step_result("wf-4", "s1", "agent-a", json!(1)).await;
    store.add_step_result("wf-4", "s2", "agent-b", json!(2)).await;

    let only_a = store.step_results("wf-4", Some("agent-a")).await;
    assert_eq!(only_a.len(), 1);
    assert_eq!(only_a[0].agent_id, "agent-a");
}

#[tokio::test]
async fn delete_removes_the_context() {
    let store = store();
    store.initialize().await;
    store.create("wf-5", Map::new(), 86_400).await;
    assert!(store.get("wf-5").await.is_some());
    store.delete("wf-5").await;
    assert!(store.get("wf-5").await.is_none());
}

#[tokio::test]
async fn stats_report_memory_only_backend_without_a_document_store() {
    let store = store();
    store.initialize().await;
    let stats = store.stats();
    assert_eq!(stats.storage_backend, "memory_only");
    assert!(!stats.document_store_available);
}
