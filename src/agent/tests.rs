use super::*;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

struct FlakyAgent {
    state: AgentState,
    fail_first_n: AtomicU32,
}

#[async_trait]
impl BaseAgent for FlakyAgent {
    fn state(&self) -> &AgentState {
        &self.state
    }

    async fn execute(&self, _request: &Request) -> Result<Value, SreError> {
        let remaining = self.fail_first_n.fetch_update(
            std::sync::atomic::Ordering::SeqCst,
            std::sync::atomic::Ordering::SeqCst,
            |n| if n > 0 { Some(n - 1) } else { None },
        );
        if remaining.is_ok() {
            return Err(SreError::TransportError("transient".to_string()));
        }
        Ok(serde_json::json!({"ok": 1}))
    }
}

#[tokio::test]
async fn succeeds_after_one_retry() {
    let agent = FlakyAgent {
        state: AgentState::new("test").with_timeout(Duration::from_secs(10)),
        fail_first_n: AtomicU32::new(1),
    };
    agent.initialize().await;

    let response = agent.handle_request(Request::new("run")).await;

    assert_eq!(response.status, "success");
    assert_eq!(response.result, Some(serde_json::json!({"ok": 1})));
    let metrics = agent.metrics();
    assert_eq!(metrics.requests_succeeded, 1);
    assert_eq!(metrics.requests_failed, 0);
}

#[tokio::test]
async fn rejects_requests_before_initialization() {
    let agent = FlakyAgent {
        state: AgentState::new("test"),
        fail_first_n: AtomicU32::new(0),
    };
    let response = agent.handle_request(Request::new("run")).await;
    assert_eq!(response.status, "error");
    assert_eq!(response.error_type.as_deref(), Some("not_initialized"));
}

#[tokio::test]
async fn non_retryable_error_fails_immediately() {
    struct AlwaysSkipped {
        state: AgentState,
    }
    #[async_trait]
    impl BaseAgent for AlwaysSkipped {
        fn state(&self) -> &AgentState {
            &self.state
        }
        async fn execute(&self, _request: &Request) -> Result<Value, SreError> {
            Err(SreError::Skipped("missing params".to_string()))
        }
    }
    let agent = AlwaysSkipped {
        state: AgentState::new("test"),
    };
    agent.initialize().await;
    let response = agent.handle_request(Request::new("run")).await;
    assert_eq!(response.error_type.as_deref(), Some("skipped"));
    assert_eq!(agent.metrics().requests_handled, 1);
}

#[tokio::test]
async fn stream_callback_receives_lifecycle_events() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let agent = FlakyAgent {
        state: AgentState::new("test"),
        fail_first_n: AtomicU32::new(0),
    };
    agent.initialize().await;
    let events_clone = events.clone();
    agent.set_stream_callback(Box::new(move |event_type, _data| {
        events_clone.lock().unwrap().push(event_type.to_string());
    }));

    agent.handle_request(Request::new("run")).await;

    let seen = events.lock().unwrap().clone();
    assert_eq!(seen, vec!["progress", "result"]);
}

#[tokio::test]
async fn status_is_healthy_below_ten_failures() {
    let agent = FlakyAgent {
        state: AgentState::new("test"),
        fail_first_n: AtomicU32::new(0),
    };
    agent.initialize().await;
    agent.handle_request(Request::new("run")).await;
    assert!(agent.status().healthy);
}
