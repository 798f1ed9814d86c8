//! Thin agent wrapping the external tool transport (C6). Every tool call
//! specialist agents make goes through this agent, which consults the
//! cache on entry and stores successful results on exit.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::agent::{AgentState, BaseAgent, Request};
use crate::cache::ToolCache;
use crate::errors::SreError;
use crate::transport::ToolTransport;

pub struct ToolProxyAgent {
    state: AgentState,
    transport: Arc<dyn ToolTransport>,
    cache: Arc<ToolCache>,
}

impl ToolProxyAgent {
    pub fn new(transport: Arc<dyn ToolTransport>, cache: Arc<ToolCache>) -> Self {
        Self {
            state: AgentState::new("tool-proxy"),
            transport,
            cache,
        }
    }
}

#[async_trait]
impl BaseAgent for ToolProxyAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn initialize_impl(&self) -> anyhow::Result<()> {
        self.transport.initialize().await
    }

    async fn cleanup_impl(&self) -> anyhow::Result<()> {
        self.transport.cleanup().await
    }

    async fn execute(&self, request: &Request) -> Result<Value, SreError> {
        let tool = request
            .tool
            .clone()
            .ok_or_else(|| SreError::ExecutionError("request is missing 'tool'".to_string()))?;

        if let Some(cached) = self.cache.get(&tool, &request.parameters) {
            return Ok(json!({"success": true, "parsed": cached, "raw_content": "", "cached": true}));
        }

        let result = self
            .transport
            .call_tool(&tool, request.parameters.clone())
            .await
            .map_err(|err| SreError::TransportError(err.to_string()))?;

        let wrapped = json!({
            "success": result.success,
            "parsed": result.parsed,
            "raw_content": result.content.join("\n"),
        });

        if result.success && !result.is_error {
            let cache_value = result.parsed.clone().unwrap_or_else(|| wrapped.clone());
            self.cache.set(&tool, &request.parameters, cache_value, None);
        }

        Ok(wrapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ToolCallResult;

    struct StubTransport {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl ToolTransport for StubTransport {
        async fn call_tool(&self, _name: &str, _args: Value) -> anyhow::Result<ToolCallResult> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(ToolCallResult {
                success: true,
                content: vec!["ok".to_string()],
                parsed: Some(json!({"availability_state": "Available"})),
                is_error: false,
            })
        }
        async fn list_tools(&self) -> anyhow::Result<Vec<crate::transport::ToolDescriptor>> {
            Ok(Vec::new())
        }
        async fn initialize(&self) -> anyhow::Result<()> {
            Ok(())
        }
        async fn cleanup(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn a_second_identical_call_is_served_from_cache() {
        let transport = Arc::new(StubTransport {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let cache = Arc::new(ToolCache::new(10));
        let proxy = ToolProxyAgent::new(transport.clone(), cache);
        proxy.initialize().await;

        let mut request = Request::new("execute");
        request.tool = Some("check_container_app_health".to_string());
        request.parameters = json!({"resource_group": "prod-rg", "name": "my-app"});

        proxy.handle_request(request.clone()).await;
        proxy.handle_request(request).await;

        assert_eq!(transport.calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn a_request_without_a_tool_name_is_an_execution_error() {
        let transport = Arc::new(StubTransport {
            calls: std::sync::atomic::AtomicUsize::new(0),
        });
        let cache = Arc::new(ToolCache::new(10));
        let proxy = ToolProxyAgent::new(transport, cache);
        proxy.initialize().await;

        let response = proxy.handle_request(Request::new("execute")).await;
        assert_eq!(response.status, "error");
        assert_eq!(response.error_type.as_deref(), Some("execution_error"));
    }
}
