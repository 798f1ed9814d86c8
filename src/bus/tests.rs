use super::*;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn publish_event_reaches_every_subscriber() {
    let bus = MessageBus::new();
    let mut rx_a = bus.subscribe("a", &[]);
    let mut rx_b = bus.subscribe("b", &[]);

    bus.publish_event("incident.created", "orchestrator", json!({"id": 1}));

    let m_a = rx_a.recv().await.expect("a should receive the event");
    let m_b = rx_b.recv().await.expect("b should receive the event");
    assert_eq!(m_a.message_type, "incident.created");
    assert_eq!(m_b.message_type, "incident.created");
    assert_eq!(m_a.to_agent, None);
}

#[tokio::test]
async fn send_message_is_point_to_point() {
    let bus = MessageBus::new();
    let mut rx_a = bus.subscribe("a", &[]);
    let _rx_b = bus.subscribe("b", &[]);

    bus.send_message("b", "a", "ping", json!({})).unwrap();

    let message = rx_a.recv().await.unwrap();
    assert_eq!(message.to_agent.as_deref(), Some("a"));
}

#[tokio::test]
async fn send_message_to_unsubscribed_agent_errors() {
    let bus = MessageBus::new();
    let result = bus.send_message("a", "ghost", "ping", json!({}));
    assert!(result.is_err());
}

#[tokio::test]
async fn send_request_resolves_on_matching_response() {
    let bus = std::sync::Arc::new(MessageBus::new());
    let mut rx_b = bus.subscribe("b", &[]);

    let bus_clone = bus.clone();
    let responder = tokio::spawn(async move {
        let request = rx_b.recv().await.unwrap();
        let correlation_id = request.correlation_id.unwrap();
        bus_clone.send_response("b", &correlation_id, json!({"pong": true}));
    });

    let response = bus
        .send_request("a", "b", "ping", json!({}), Duration::from_secs(2))
        .await
        .expect("should receive a response before the timeout");
    assert_eq!(response, json!({"pong": true}));
    responder.await.unwrap();
}

#[tokio::test]
async fn send_request_times_out_and_clears_pending_entry() {
    let bus = MessageBus::new();
    let _rx_b = bus.subscribe("b", &[]);

    let result = bus
        .send_request("a", "b", "ping", json!({}), Duration::from_millis(50))
        .await;

    assert!(matches!(result, Err(SreError::Timeout(_))));
    assert_eq!(bus.stats().pending_responses, 0);
}

#[tokio::test]
async fn unsubscribe_removes_the_agent_from_fan_out() {
    let bus = MessageBus::new();
    let mut rx_a = bus.subscribe("a", &[]);
    bus.unsubscribe("a");
    bus.publish_event("evt", "x", json!({}));
    assert!(rx_a.try_recv().is_err());
}

#[test]
fn history_is_filterable_by_agent_and_type() {
    let bus = MessageBus::new();
    let _rx_a = bus.subscribe("a", &[]);
    bus.send_message("x", "a", "typeA", json!(1)).unwrap();
    bus.send_message("x", "a", "typeB", json!(2)).unwrap();

    let only_type_a = bus.message_history(None, Some("typeA"));
    assert_eq!(only_type_a.len(), 1);

    let only_agent_a = bus.message_history(Some("a"), None);
    assert_eq!(only_agent_a.len(), 2);
}
