//! Preflight resource existence check before an expensive tool call (C9).
//!
//! No corresponding file exists in the original Python source for this
//! component (`sre_inventory_integration.py` is referenced by the
//! orchestrator but was not present in the retrieved sources) — this
//! module is built directly from the contract in spec §4.9.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::transport::{InventorySnapshot, ResourceRef};

#[derive(Debug, Clone)]
pub struct PreflightOutcome {
    pub ok: bool,
    pub result: Option<Value>,
    pub warning: Option<String>,
}

/// Tools that reference a named resource and therefore require a
/// preflight inventory check before execution.
const RESOURCE_SCOPED_TOOLS: &[&str] = &[
    "check_container_app_health",
    "check_aks_cluster_health",
    "check_resource_health",
    "get_performance_metrics",
    "identify_bottlenecks",
    "query_app_service_configuration",
    "query_container_app_configuration",
    "query_aks_configuration",
    "scale_resource",
    "execute_safe_restart",
    "execute_restart_resource",
];

pub fn is_resource_scoped(tool: &str) -> bool {
    RESOURCE_SCOPED_TOOLS.contains(&tool)
}

fn resource_ref_from_params(params: &Value) -> ResourceRef {
    ResourceRef {
        resource_type: params
            .get("resource_type")
            .and_then(Value::as_str)
            .map(str::to_string),
        resource_group: params
            .get("resource_group")
            .and_then(Value::as_str)
            .map(str::to_string),
        name: params
            .get("name")
            .or_else(|| params.get("container_app_name"))
            .or_else(|| params.get("cluster_name"))
            .and_then(Value::as_str)
            .map(str::to_string),
        resource_id: params
            .get("resource_id")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

pub struct InventoryGuard {
    snapshot: Arc<dyn InventorySnapshot>,
    strict_mode: bool,
}

impl InventoryGuard {
    pub fn new(snapshot: Arc<dyn InventorySnapshot>, strict_mode: bool) -> Self {
        Self { snapshot, strict_mode }
    }

    /// The guard never makes cloud-provider calls; it reads only from the
    /// inventory snapshot.
    pub async fn preflight_resource_check(&self, tool: &str, params: &Value) -> PreflightOutcome {
        let reference = resource_ref_from_params(params);
        if self.snapshot.has_resource(&reference).await {
            return PreflightOutcome {
                ok: true,
                result: None,
                warning: None,
            };
        }

        if self.strict_mode {
            tracing::warn!("preflight failed for tool {tool}: resource not found in inventory");
            PreflightOutcome {
                ok: false,
                result: Some(json!({
                    "success": false,
                    "error": "Resource not found in inventory.",
                    "suggestion": "Verify the resource name and resource group, or run resource discovery first.",
                    "preflight_failed": true,
                })),
                warning: None,
            }
        } else {
            let warning = format!("resource referenced by '{tool}' was not found in inventory; proceeding anyway");
            tracing::warn!("{warning}");
            PreflightOutcome {
                ok: true,
                result: None,
                warning: Some(warning),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct StubSnapshot {
        known: bool,
    }

    #[async_trait]
    impl InventorySnapshot for StubSnapshot {
        async fn has_resource(&self, _reference: &ResourceRef) -> bool {
            self.known
        }
        async fn enrich_parameters(&self, _tool: &str, params: Value) -> Value {
            params
        }
        async fn statistics(&self) -> Value {
            json!({})
        }
    }

    #[tokio::test]
    async fn known_resources_pass_preflight() {
        let guard = InventoryGuard::new(Arc::new(StubSnapshot { known: true }), true);
        let outcome = guard
            .preflight_resource_check("check_container_app_health", &json!({"name": "my-app"}))
            .await;
        assert!(outcome.ok);
        assert!(outcome.result.is_none());
    }

    #[tokio::test]
    async fn strict_mode_blocks_unknown_resources() {
        let guard = InventoryGuard::new(Arc::new(StubSnapshot { known: false }), true);
        let outcome = guard
            .preflight_resource_check("check_container_app_health", &json!({"name": "ghost-app"}))
            .await;
        assert!(!outcome.ok);
        assert_eq!(outcome.result.unwrap()["preflight_failed"], json!(true));
    }

    #[tokio::test]
    async fn lax_mode_warns_but_allows_unknown_resources() {
        let guard = InventoryGuard::new(Arc::new(StubSnapshot { known: false }), false);
        let outcome = guard
            .preflight_resource_check("check_container_app_health", &json!({"name": "ghost-app"}))
            .await;
        assert!(outcome.ok);
        assert!(outcome.warning.is_some());
    }

    #[test]
    fn resource_scoped_tools_are_recognized() {
        assert!(is_resource_scoped("check_container_app_health"));
        assert!(!is_resource_scoped("describe_capabilities"));
    }
}
