//! Workflow-scoped shared state (C2): key/value store plus per-agent
//! sub-context and an append-only step-result log, backed by a document
//! store with an in-memory read-through cache.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transport::DocumentStore;

const CONTAINER_ID: &str = "workflow_contexts";
const PARTITION_PATH: &str = "/workflow_id";
const DEFAULT_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContextEntry {
    pub updated_at: String,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_id: String,
    pub agent_id: String,
    pub timestamp: String,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub status: String,
    pub current_step: usize,
    pub total_steps: usize,
}

/// The persisted, stable workflow context document (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub id: String,
    pub workflow_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub ttl: u64,
    pub shared_data: Map<String, Value>,
    pub agent_contexts: HashMap<String, AgentContextEntry>,
    pub step_results: Vec<StepResult>,
    pub metadata: WorkflowMetadata,
}

impl WorkflowContext {
    fn new(workflow_id: &str, initial_data: Map<String, Value>, ttl: u64) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: workflow_id.to_string(),
            workflow_id: workflow_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
            ttl,
            shared_data: initial_data,
            agent_contexts: HashMap::new(),
            step_results: Vec::new(),
            metadata: WorkflowMetadata {
                status: "created".to_string(),
                current_step: 0,
                total_steps: 0,
            },
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now().to_rfc3339();
    }
}

/// A patch applied by [`ContextStore::update`]. `shared_data` and
/// `metadata` are shallow-merged into the existing maps; any other key
/// present is a full replace of that top-level field (only `ttl` is
/// meaningfully replaceable beyond those two).
#[derive(Debug, Clone, Default)]
pub struct ContextPatch {
    pub shared_data: Option<Map<String, Value>>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextStoreStats {
    pub initialized: bool,
    pub document_store_available: bool,
    pub cached_contexts: usize,
    pub storage_backend: &'static str,
}

/// Two-tier workflow context store: in-memory read-through cache backed by
/// an external document store (spec §4.2).
pub struct ContextStore {
    document_store: Option<Box<dyn DocumentStore>>,
    cache: Mutex<HashMap<String, WorkflowContext>>,
    initialized: Mutex<bool>,
}

impl ContextStore {
    pub fn new(document_store: Option<Box<dyn DocumentStore>>) -> Self {
        Self {
            document_store,
            cache: Mutex::new(HashMap::new()),
            initialized: Mutex::new(false),
        }
    }

    /// Ensures the backing container exists. Degrades silently to
    /// memory-only storage if the document store is unavailable.
    pub async fn initialize(&self) -> bool {
        if let Some(store) = &self.document_store {
            if let Err(err) = store
                .ensure_container(CONTAINER_ID, PARTITION_PATH, Some(DEFAULT_TTL_SECS))
                .await
            {
                tracing::warn!("document store unavailable, using in-memory context store only: {err}");
            }
        }
        *self.initialized.lock().expect("context store lock poisoned") = true;
        true
    }

    fn cache_get(&self, workflow_id: &str) -> Option<WorkflowContext> {
        self.cache
            .lock()
            .expect("context store lock poisoned")
            .get(workflow_id)
            .cloned()
    }

    fn cache_put(&self, ctx: WorkflowContext) {
        self.cache
            .lock()
            .expect("context store lock poisoned")
            .insert(ctx.workflow_id.clone(), ctx);
    }

    pub async fn create(
        &self,
        workflow_id: &str,
        initial_data: Map<String, Value>,
        ttl: u64,
    ) -> WorkflowContext {
        let ctx = WorkflowContext::new(workflow_id, initial_data, ttl);
        if let Some(store) = &self.document_store {
            if let Err(err) = store
                .upsert(CONTAINER_ID, serde_json::to_value(&ctx).unwrap_or(Value::Null))
                .await
            {
                tracing::error!("failed to persist workflow context {workflow_id}: {err}");
            }
        }
        self.cache_put(ctx.clone());
        ctx
    }

    pub async fn get(&self, workflow_id: &str) -> Option<WorkflowContext> {
        if let Some(ctx) = self.cache_get(workflow_id) {
            return Some(ctx);
        }
        if let Some(store) = &self.document_store {
            match store.read(CONTAINER_ID, workflow_id, workflow_id).await {
                Ok(Some(doc)) => {
                    if let Ok(ctx) = serde_json::from_value::<WorkflowContext>(doc) {
                        self.cache_put(ctx.clone());
                        return Some(ctx);
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::debug!("workflow context {workflow_id} not in document store: {err}"),
            }
        }
        None
    }

    pub async fn update(&self, workflow_id: &str, patch: ContextPatch) -> bool {
        let Some(mut ctx) = self.get(workflow_id).await else {
            tracing::error!("workflow context {workflow_id} not found");
            return false;
        };
        if let Some(shared) = patch.shared_data {
            for (k, v) in shared {
                ctx.shared_data.insert(k, v);
            }
        }
        if let Some(meta) = patch.metadata {
            let mut meta_value = serde_json::to_value(&ctx.metadata).unwrap_or(Value::Null);
            if let Some(obj) = meta_value.as_object_mut() {
                for (k, v) in meta {
                    obj.insert(k, v);
                }
            }
            if let Ok(merged) = serde_json::from_value(meta_value) {
                ctx.metadata = merged;
            }
        }
        ctx.touch();
        self.persist(&ctx).await
    }

    async fn persist(&self, ctx: &WorkflowContext) -> bool {
        if let Some(store) = &self.document_store {
            if let Err(err) = store
                .upsert(CONTAINER_ID, serde_json::to_value(ctx).unwrap_or(Value::Null))
                .await
            {
                tracing::error!("failed to persist workflow context {}: {err}", ctx.workflow_id);
                return false;
            }
        }
        self.cache_put(ctx.clone());
        true
    }

    pub async fn set_agent_context(&self, workflow_id: &str, agent_id: &str, data: Value) -> bool {
        let Some(mut ctx) = self.get(workflow_id).await else {
            tracing::error!("workflow context {workflow_id} not found");
            return false;
        };
        ctx.agent_contexts.insert(
            agent_id.to_string(),
            AgentContextEntry {
                updated_at: Utc::now().to_rfc3339(),
                data,
            },
        );
        ctx.touch();
        self.persist(&ctx).await
    }

    pub async fn get_agent_context(&self, workflow_id: &str, agent_id: &str) -> Option<Value> {
        let ctx = self.get(workflow_id).await?;
        ctx.agent_contexts.get(agent_id).map(|e| e.data.clone())
    }

    pub async fn add_step_result(
        &self,
        workflow_id: &str,
        step_id: &str,
        agent_id: &str,
        result: Value,
    ) -> bool {
        let Some(mut ctx) = self.get(workflow_id).await else {
            tracing::error!("workflow context {workflow_id} not found");
            return false;
        };
        ctx.step_results.push(StepResult {
            step_id: step_id.to_string(),
            agent_id: agent_id.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            result,
        });
        ctx.metadata.current_step = ctx.step_results.len();
        ctx.touch();
        self.persist(&ctx).await
    }

    pub async fn step_results(&self, workflow_id: &str, agent_id: Option<&str>) -> Vec<StepResult> {
        let Some(ctx) = self.get(workflow_id).await else {
            return Vec::new();
        };
        match agent_id {
            Some(id) => ctx
                .step_results
                .into_iter()
                .filter(|s| s.agent_id == id)
                .collect(),
            None => ctx.step_results,
        }
    }

    pub async fn delete(&self, workflow_id: &str) -> bool {
        if let Some(store) = &self.document_store {
            if let Err(err) = store.delete(CONTAINER_ID, workflow_id, workflow_id).await {
                tracing::error!("failed to delete workflow context {workflow_id}: {err}");
                return false;
            }
        }
        self.cache
            .lock()
            .expect("context store lock poisoned")
            .remove(workflow_id);
        true
    }

    pub fn stats(&self) -> ContextStoreStats {
        ContextStoreStats {
            initialized: *self.initialized.lock().expect("context store lock poisoned"),
            document_store_available: self.document_store.is_some(),
            cached_contexts: self.cache.lock().expect("context store lock poisoned").len(),
            storage_backend: if self.document_store.is_some() {
                "document_store"
            } else {
                "memory_only"
            },
        }
    }
}

#[cfg(test)]
mod tests;
