//! Narrow typed interfaces for every external boundary the core consumes
//! (spec §6). Implementations of these traits live outside this crate;
//! only the contracts are defined here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a single tool invocation over the external transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub success: bool,
    pub content: Vec<String>,
    pub parsed: Option<Value>,
    pub is_error: bool,
}

/// Describes a tool exposed by the external transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub agent_id: String,
    pub category: String,
    pub parameter_schema: Value,
    pub description: String,
}

/// The external, in-language tool-execution subprocess transport
/// ("MCP" in the source system). Consumed exclusively by `ToolProxyAgent`.
#[async_trait]
pub trait ToolTransport: Send + Sync {
    async fn call_tool(&self, name: &str, args: Value) -> anyhow::Result<ToolCallResult>;
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolDescriptor>>;
    async fn initialize(&self) -> anyhow::Result<()>;
    async fn cleanup(&self) -> anyhow::Result<()>;
}

/// A single document in the document store.
pub type Document = Value;

/// The persistent document-store driver. Consumed by `ContextStore` only;
/// TTL is enforced server-side by the store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn ensure_container(
        &self,
        container_id: &str,
        partition_path: &str,
        ttl: Option<u64>,
    ) -> anyhow::Result<()>;
    async fn upsert(&self, container_id: &str, doc: Document) -> anyhow::Result<()>;
    async fn read(&self, container_id: &str, id: &str, partition: &str)
        -> anyhow::Result<Option<Document>>;
    async fn delete(&self, container_id: &str, id: &str, partition: &str) -> anyhow::Result<()>;
}

/// A resource identity used for inventory lookups.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResourceRef {
    pub resource_type: Option<String>,
    pub resource_group: Option<String>,
    pub name: Option<String>,
    pub resource_id: Option<String>,
}

/// Read-only inventory of known cloud resources. Consumed by
/// `InventoryGuard` and orchestrator parameter enrichment. Refreshed by an
/// external collaborator; this core only reads from it.
#[async_trait]
pub trait InventorySnapshot: Send + Sync {
    async fn has_resource(&self, reference: &ResourceRef) -> bool;
    async fn enrich_parameters(&self, tool: &str, params: Value) -> Value;
    async fn statistics(&self) -> Value;
}

/// Outcome of a cloud-CLI invocation made on behalf of discovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliOutcome {
    pub status: String,
    pub output: Option<Value>,
    pub error: Option<String>,
}

/// Used only by `InteractionHandler` for resource discovery.
#[async_trait]
pub trait CloudCliExecutor: Send + Sync {
    async fn execute(
        &self,
        command: &str,
        timeout_secs: u64,
        add_subscription_context: bool,
    ) -> anyhow::Result<CliOutcome>;
}
