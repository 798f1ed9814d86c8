//! In-process pub/sub plus addressed request/response with correlation
//! ids (C3). Single-process, cooperative-concurrency model: agents are
//! scheduled as tokio tasks, never OS threads.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::errors::SreError;

/// Ring-buffer capacity for the diagnostic message history.
const DEFAULT_HISTORY_CAPACITY: usize = 1000;
const WILDCARD: &str = "*";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub message_type: String,
    pub from_agent: String,
    pub to_agent: Option<String>,
    pub correlation_id: Option<String>,
    pub payload: Value,
    pub timestamp: String,
}

impl Message {
    fn new(message_type: &str, from_agent: &str, to_agent: Option<String>, payload: Value) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            message_type: message_type.to_string(),
            from_agent: from_agent.to_string(),
            to_agent,
            correlation_id: None,
            payload,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BusStats {
    pub subscriber_count: usize,
    pub pending_responses: usize,
    pub history_len: usize,
}

struct Inner {
    queues: HashMap<String, mpsc::UnboundedSender<Message>>,
    /// message_type (or "*") -> agent_ids whose queues also receive events
    /// of that type during `publish_event`, beyond the unconditional
    /// broadcast to every subscriber.
    type_subscribers: HashMap<String, Vec<String>>,
    pending_responses: HashMap<String, oneshot::Sender<Value>>,
    history: VecDeque<Message>,
}

/// In-process message bus connecting agents by `AgentId`.
pub struct MessageBus {
    inner: Mutex<Inner>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queues: HashMap::new(),
                type_subscribers: HashMap::new(),
                pending_responses: HashMap::new(),
                history: VecDeque::with_capacity(DEFAULT_HISTORY_CAPACITY),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("message bus lock poisoned")
    }

    /// Idempotent: returns the existing receiver's queue if already
    /// subscribed is not possible (the receiver can only be taken once),
    /// so re-subscribing an already-subscribed agent replaces its queue.
    pub fn subscribe(&self, agent_id: &str, message_types: &[&str]) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        inner.queues.insert(agent_id.to_string(), tx);
        let types: Vec<&str> = if message_types.is_empty() {
            vec![WILDCARD]
        } else {
            message_types.to_vec()
        };
        for t in types {
            inner
                .type_subscribers
                .entry(t.to_string())
                .or_default()
                .push(agent_id.to_string());
        }
        rx
    }

    pub fn unsubscribe(&self, agent_id: &str) {
        let mut inner = self.lock();
        inner.queues.remove(agent_id);
        for subs in inner.type_subscribers.values_mut() {
            subs.retain(|id| id != agent_id);
        }
    }

    fn record_history(inner: &mut Inner, message: Message) {
        if inner.history.len() >= DEFAULT_HISTORY_CAPACITY {
            inner.history.pop_front();
        }
        inner.history.push_back(message);
    }

    /// Fan out an event to every subscribed queue. Never fails the sender
    /// for a full queue — queues are unbounded.
    pub fn publish_event(&self, message_type: &str, from_agent: &str, payload: Value) {
        let message = Message::new(message_type, from_agent, None, payload);
        let mut inner = self.lock();
        for tx in inner.queues.values() {
            let _ = tx.send(message.clone());
        }
        Self::record_history(&mut inner, message);
    }

    /// Fire-and-forget point-to-point send.
    pub fn send_message(
        &self,
        from_agent: &str,
        to_agent: &str,
        message_type: &str,
        payload: Value,
    ) -> anyhow::Result<()> {
        let message = Message::new(message_type, from_agent, Some(to_agent.to_string()), payload);
        let mut inner = self.lock();
        let tx = inner
            .queues
            .get(to_agent)
            .ok_or_else(|| anyhow::anyhow!("agent '{to_agent}' is not subscribed"))?
            .clone();
        tx.send(message.clone())
            .map_err(|_| anyhow::anyhow!("agent '{to_agent}' queue closed"))?;
        Self::record_history(&mut inner, message);
        Ok(())
    }

    /// Allocate a correlation id, enqueue a request to `to_agent`, and wait
    /// for the matching `send_response` up to `timeout`. Propagates
    /// `SreError::Timeout` to the direct caller per spec §7.
    pub async fn send_request(
        &self,
        from_agent: &str,
        to_agent: &str,
        message_type: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value, SreError> {
        let correlation_id = Uuid::new_v4().to_string();
        let mut message = Message::new(message_type, from_agent, Some(to_agent.to_string()), payload);
        message.correlation_id = Some(correlation_id.clone());

        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.lock();
            let sender = inner
                .queues
                .get(to_agent)
                .ok_or_else(|| SreError::NotFound(format!("agent '{to_agent}' is not subscribed")))?
                .clone();
            inner.pending_responses.insert(correlation_id.clone(), tx);
            sender
                .send(message.clone())
                .map_err(|_| SreError::TransportError(format!("agent '{to_agent}' queue closed")))?;
            Self::record_history(&mut inner, message);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(SreError::TransportError("response channel dropped".to_string())),
            Err(_) => {
                self.lock().pending_responses.remove(&correlation_id);
                Err(SreError::Timeout(timeout))
            }
        }
    }

    /// Resolve a pending `send_request` future. Logs a warning if nothing
    /// was pending for `correlation_id`.
    pub fn send_response(&self, from_agent: &str, correlation_id: &str, payload: Value) {
        let sender = self.lock().pending_responses.remove(correlation_id);
        match sender {
            Some(tx) => {
                let _ = tx.send(payload);
            }
            None => tracing::warn!(
                "{from_agent} sent a response for correlation_id {correlation_id} with no pending request"
            ),
        }
    }

    pub fn clear_agent_queue(&self, agent_id: &str) {
        let mut inner = self.lock();
        if let Some(tx) = inner.queues.get(agent_id).cloned() {
            drop(tx);
        }
        inner.queues.remove(agent_id);
    }

    pub fn message_history(&self, agent_id: Option<&str>, message_type: Option<&str>) -> Vec<Message> {
        let inner = self.lock();
        inner
            .history
            .iter()
            .filter(|m| {
                agent_id.is_none_or(|id| m.from_agent == id || m.to_agent.as_deref() == Some(id))
            })
            .filter(|m| message_type.is_none_or(|t| m.message_type == t))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> BusStats {
        let inner = self.lock();
        BusStats {
            subscriber_count: inner.queues.len(),
            pending_responses: inner.pending_responses.len(),
            history_len: inner.history.len(),
        }
    }
}

#[cfg(test)]
mod tests;
