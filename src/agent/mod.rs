//! Agent lifecycle and `HandleRequest` algorithm shared by every agent in
//! the runtime (C5). Concrete agents implement [`BaseAgent::execute`];
//! everything else — retries, timeout, metrics, streaming — is provided.

pub mod tool_proxy;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::SreError;

pub type AgentId = String;

/// Generates a stable agent id of the shape `{agent_type}-{uuid8}`.
pub fn new_agent_id(agent_type: &str) -> AgentId {
    let short = Uuid::new_v4().simple().to_string();
    format!("{agent_type}-{}", &short[..8])
}

/// A request handed to `BaseAgent::handle_request`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Request {
    pub request_id: Option<String>,
    pub action: String,
    pub tool: Option<String>,
    pub parameters: Value,
    pub context: Value,
    pub workflow_id: Option<String>,
}

impl Request {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            parameters: Value::Object(Default::default()),
            context: Value::Object(Default::default()),
            ..Default::default()
        }
    }
}

/// The structured result every `handle_request` call returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub status: String,
    pub agent_id: String,
    pub agent_type: String,
    pub request_id: String,
    pub execution_time: f64,
    pub result: Option<Value>,
    pub error_type: Option<String>,
    pub error: Option<String>,
}

pub type StreamCallback = Box<dyn Fn(&str, Value) + Send + Sync>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct AgentMetrics {
    pub requests_handled: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub total_execution_time: f64,
    pub avg_execution_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentStatus {
    pub agent_id: String,
    pub agent_type: String,
    pub initialized: bool,
    pub healthy: bool,
    pub metrics: AgentMetrics,
}

/// Mutable lifecycle state shared by the `BaseAgent` default methods.
/// Concrete agents embed this and expose it via `BaseAgent::state`.
pub struct AgentState {
    agent_id: AgentId,
    agent_type: String,
    initialized: AtomicBool,
    metrics: Mutex<AgentMetrics>,
    stream_callback: Mutex<Option<StreamCallback>>,
    max_retries: u32,
    timeout: Duration,
}

impl AgentState {
    pub fn new(agent_type: impl Into<String>) -> Self {
        let agent_type = agent_type.into();
        Self {
            agent_id: new_agent_id(&agent_type),
            agent_type,
            initialized: AtomicBool::new(false),
            metrics: Mutex::new(AgentMetrics::default()),
            stream_callback: Mutex::new(None),
            max_retries: 3,
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[async_trait]
pub trait BaseAgent: Send + Sync {
    /// Access to the shared lifecycle state embedded by the implementor.
    fn state(&self) -> &AgentState;

    /// Agent-specific setup, run once by `initialize`.
    async fn initialize_impl(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Agent-specific teardown, run once by `cleanup`.
    async fn cleanup_impl(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// The agent's actual work for one request. Implementors return
    /// `Err` for any failure; `handle_request` converts it to a
    /// structured response and never lets it escape to the caller.
    async fn execute(&self, request: &Request) -> Result<Value, SreError>;

    fn agent_id(&self) -> &str {
        &self.state().agent_id
    }

    fn agent_type(&self) -> &str {
        &self.state().agent_type
    }

    fn is_initialized(&self) -> bool {
        self.state().initialized.load(Ordering::SeqCst)
    }

    async fn initialize(&self) -> bool {
        if self.is_initialized() {
            return true;
        }
        match self.initialize_impl().await {
            Ok(()) => {
                self.state().initialized.store(true, Ordering::SeqCst);
                true
            }
            Err(err) => {
                tracing::error!("agent {} failed to initialize: {err}", self.agent_id());
                false
            }
        }
    }

    async fn cleanup(&self) {
        if let Err(err) = self.cleanup_impl().await {
            tracing::warn!("agent {} cleanup failed: {err}", self.agent_id());
        }
        self.state().initialized.store(false, Ordering::SeqCst);
    }

    fn set_stream_callback(&self, callback: StreamCallback) {
        *self
            .state()
            .stream_callback
            .lock()
            .expect("stream callback lock poisoned") = Some(callback);
    }

    /// Invokes the stream callback synchronously; swallows and logs any
    /// panic so a misbehaving callback never brings down the agent.
    fn stream_event(&self, event_type: &str, mut data: Value) {
        let guard = self
            .state()
            .stream_callback
            .lock()
            .expect("stream callback lock poisoned");
        let Some(callback) = guard.as_ref() else {
            return;
        };
        if let Value::Object(map) = &mut data {
            map.insert("agent_id".to_string(), Value::String(self.agent_id().to_string()));
            map.insert("agent_type".to_string(), Value::String(self.agent_type().to_string()));
            map.insert("timestamp".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| callback(event_type, data)));
        if result.is_err() {
            tracing::warn!("agent {} stream callback panicked", self.agent_id());
        }
    }

    fn metrics(&self) -> AgentMetrics {
        *self.state().metrics.lock().expect("metrics lock poisoned")
    }

    fn status(&self) -> AgentStatus {
        let metrics = self.metrics();
        AgentStatus {
            agent_id: self.agent_id().to_string(),
            agent_type: self.agent_type().to_string(),
            initialized: self.is_initialized(),
            healthy: self.is_initialized() && metrics.requests_failed < 10,
            metrics,
        }
    }

    fn record_success(&self, elapsed_secs: f64) {
        let mut metrics = self.state().metrics.lock().expect("metrics lock poisoned");
        metrics.requests_handled += 1;
        metrics.requests_succeeded += 1;
        metrics.total_execution_time += elapsed_secs;
        metrics.avg_execution_time = metrics.total_execution_time / metrics.requests_handled as f64;
    }

    fn record_failure(&self, elapsed_secs: f64) {
        let mut metrics = self.state().metrics.lock().expect("metrics lock poisoned");
        metrics.requests_handled += 1;
        metrics.requests_failed += 1;
        metrics.total_execution_time += elapsed_secs;
        metrics.avg_execution_time = metrics.total_execution_time / metrics.requests_handled as f64;
    }

    /// The core `HandleRequest` algorithm (spec §4.5): streams progress,
    /// retries with exponential backoff under an overall deadline, and
    /// converts every failure into a structured response.
    async fn handle_request(&self, mut request: Request) -> Response {
        if !self.is_initialized() {
            return Response {
                status: "error".to_string(),
                agent_id: self.agent_id().to_string(),
                agent_type: self.agent_type().to_string(),
                request_id: request.request_id.unwrap_or_default(),
                execution_time: 0.0,
                result: None,
                error_type: Some(SreError::NotInitialized.error_type().to_string()),
                error: Some("agent received a request before initialization completed".to_string()),
            };
        }

        let request_id = request
            .request_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        request.request_id = Some(request_id.clone());

        let start = std::time::Instant::now();
        self.stream_event(
            "progress",
            serde_json::json!({"status": "started", "request_id": request_id}),
        );

        let deadline = self.state().timeout;
        let outcome = tokio::time::timeout(deadline, self.execute_with_retry(&request)).await;

        let elapsed = start.elapsed().as_secs_f64();
        match outcome {
            Ok(Ok(result)) => {
                self.record_success(elapsed);
                self.stream_event(
                    "result",
                    serde_json::json!({"status": "completed", "execution_time": elapsed, "result": result}),
                );
                Response {
                    status: "success".to_string(),
                    agent_id: self.agent_id().to_string(),
                    agent_type: self.agent_type().to_string(),
                    request_id,
                    execution_time: elapsed,
                    result: Some(result),
                    error_type: None,
                    error: None,
                }
            }
            Ok(Err(err)) => {
                self.record_failure(elapsed);
                self.stream_event("error", serde_json::json!({"status": "failed"}));
                Response {
                    status: "error".to_string(),
                    agent_id: self.agent_id().to_string(),
                    agent_type: self.agent_type().to_string(),
                    request_id,
                    execution_time: elapsed,
                    result: None,
                    error_type: Some(err.error_type().to_string()),
                    error: Some(err.to_string()),
                }
            }
            Err(_elapsed) => {
                self.record_failure(elapsed);
                self.stream_event("error", serde_json::json!({"status": "timeout"}));
                Response {
                    status: "error".to_string(),
                    agent_id: self.agent_id().to_string(),
                    agent_type: self.agent_type().to_string(),
                    request_id,
                    execution_time: elapsed,
                    result: None,
                    error_type: Some("timeout".to_string()),
                    error: Some(format!("operation exceeded its {:?} deadline", deadline)),
                }
            }
        }
    }

    /// Retries `execute` up to `max_retries` times with `2^(attempt-1)`
    /// second backoff between attempts. The overall deadline (enforced by
    /// the caller's `tokio::time::timeout`) wins over any backoff sleep.
    async fn execute_with_retry(&self, request: &Request) -> Result<Value, SreError> {
        let max_retries = self.state().max_retries.max(1);
        let mut last_err = None;
        for attempt in 1..=max_retries {
            match self.execute(request).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() || attempt == max_retries {
                        return Err(err);
                    }
                    tracing::warn!(
                        "agent {} attempt {attempt}/{max_retries} failed: {err}",
                        self.agent_id()
                    );
                    let backoff = Duration::from_secs_f64(2f64.powi(attempt as i32 - 1));
                    tokio::time::sleep(backoff).await;
                    last_err = Some(err);
                }
            }
        }
        Err(last_err.unwrap_or(SreError::ExecutionError("retries exhausted".to_string())))
    }
}

#[cfg(test)]
mod tests;
