//! End-to-end: queue deliveries travel through the bridge and the fan-out
//! engine to browser sessions over real WebSockets, and data calls reach the
//! backend API through the gateway.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::fanout::{FanoutEngine, Registry, event_channel};
use crate::persistence::SledStore;
use crate::queue::{ChannelQueue, QueueBridge};
use crate::rpc::{DataApi, DataGateway, Scope};
use crate::transport::websocket::{bind, start_websocket_server};
use crate::transport::{LocalClient, ServerMessage};
use crate::utils::error::ApiError;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Backend;

#[async_trait]
impl DataApi for Backend {
    async fn get_item(&self, _scope: &Scope, _kind: &str, id: &str) -> Result<Value, ApiError> {
        Ok(json!({"_id": id}))
    }

    async fn get_items(&self, _scope: &Scope, _kind: &str) -> Result<Value, ApiError> {
        Ok(json!([]))
    }

    async fn create_item(
        &self,
        scope: &Scope,
        _kind: &str,
        _item: &Map<String, Value>,
    ) -> Result<Value, ApiError> {
        if scope.token != "secret" {
            return Err(ApiError::Status {
                status: 401,
                body: "Unauthorized".to_string(),
            });
        }
        Ok(json!({"_id": "t-1"}))
    }

    async fn update_item(
        &self,
        _scope: &Scope,
        _kind: &str,
        _id: &str,
        _item: &Map<String, Value>,
    ) -> Result<(), ApiError> {
        Ok(())
    }

    async fn delete_item(&self, _scope: &Scope, _kind: &str, _id: &str) -> Result<(), ApiError> {
        Ok(())
    }
}

struct Relay {
    url: String,
    jobs: UnboundedSender<String>,
    registry: Registry,
}

async fn start_relay() -> Relay {
    let store = Arc::new(SledStore::temporary().expect("temporary store"));
    let registry = Registry::new(store);
    let broker = Broker::shared();

    let (forwarder, queue) = event_channel();
    let forwarder = Arc::new(forwarder);
    let local = Arc::new(LocalClient::new(broker.clone(), forwarder.clone()));

    FanoutEngine::new(registry.clone(), local.clone()).spawn(queue);
    Arc::new(DataGateway::new(Arc::new(Backend)))
        .register(&local)
        .expect("register data procedures");

    let (jobs, source) = ChannelQueue::channel();
    QueueBridge::new(local).spawn(Arc::new(source), "realtime-jobs".to_string());

    let listener = bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(start_websocket_server(listener, broker, forwarder));

    Relay {
        url: format!("ws://{addr}"),
        jobs,
        registry,
    }
}

async fn recv(ws: &mut Ws) -> ServerMessage {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if msg.is_text() {
            return serde_json::from_str(msg.to_text().unwrap()).unwrap();
        }
    }
}

async fn send(ws: &mut Ws, frame: Value) {
    ws.send(WsMessage::text(frame.to_string()))
        .await
        .expect("send frame");
}

/// Connects and registers a special subscription on `{base}.{session}`.
async fn watch(url: &str, base: &str, filter: Value) -> (Ws, String) {
    let (mut ws, _) = connect_async(url).await.expect("connect");
    let session = match recv(&mut ws).await {
        ServerMessage::Welcome { session } => session,
        other => panic!("expected welcome, got {other:?}"),
    };

    let topic = format!("{base}.{session}");
    send(
        &mut ws,
        json!({"type": "subscribe", "request": 1, "topic": topic, "options": {"filter": filter}}),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::Subscribed { topic: t, .. } => assert_eq!(t, topic),
        other => panic!("expected subscribed, got {other:?}"),
    }
    (ws, topic)
}

async fn next_event(ws: &mut Ws) -> (String, Value) {
    match recv(ws).await {
        ServerMessage::Event { topic, mut args, .. } => (topic, args.remove(0)),
        other => panic!("expected event, got {other:?}"),
    }
}

fn job(id: &str, done: bool) -> Value {
    json!({"app": "todos", "type": "Task", "op": "Update", "pld": {"_id": id, "done": done}})
}

#[tokio::test]
async fn test_queue_jobs_reach_matching_sessions_only() {
    let relay = start_relay().await;
    let (mut done, done_topic) = watch(&relay.url, "todos.Task.update", json!({"done": true})).await;
    let (mut open, open_topic) = watch(&relay.url, "todos.Task.update", json!({"done": false})).await;

    for (id, state) in [("1", true), ("2", false), ("3", true)] {
        relay.jobs.send(job(id, state).to_string()).unwrap();
    }

    let mut received = Vec::new();
    for _ in 0..2 {
        let (topic, message) = next_event(&mut done).await;
        assert_eq!(topic, done_topic);
        received.push(message["pld"]["_id"].as_str().unwrap().to_string());
    }
    received.sort();
    assert_eq!(received, vec!["1", "3"]);

    let (topic, message) = next_event(&mut open).await;
    assert_eq!(topic, open_topic);
    assert_eq!(message, job("2", false));

    // "2" was fanned out already and never reached the done-filter session.
    relay.jobs.send(job("4", true).to_string()).unwrap();
    assert_eq!(next_event(&mut done).await.1, job("4", true));
}

#[tokio::test]
async fn test_browser_publish_is_fanned_out() {
    let relay = start_relay().await;
    let (mut watcher, topic) = watch(&relay.url, "room42", json!({})).await;
    let (mut publisher, _) = connect_async(relay.url.as_str()).await.expect("connect");

    let message = json!({"pld": {"text": "hi"}});
    send(
        &mut publisher,
        json!({"type": "publish", "topic": "room42", "args": [message.to_string()]}),
    )
    .await;

    assert_eq!(next_event(&mut watcher).await, (topic, message));
}

#[tokio::test]
async fn test_disconnect_drops_record_but_keeps_membership() {
    let relay = start_relay().await;
    let (ws, topic) = watch(&relay.url, "room42", json!({"a": 1})).await;
    let session = topic.rsplit('.').next().unwrap();
    let record_key = format!("{session}:room42");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while relay.registry.topic_of(&record_key).unwrap() != topic {
        assert!(tokio::time::Instant::now() < deadline, "record not stored");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    drop(ws);

    while !relay.registry.topic_of(&record_key).unwrap().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "record not dropped");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(relay.registry.members("room42").unwrap().contains(&record_key));
}

#[tokio::test]
async fn test_data_calls_over_the_transport() {
    let relay = start_relay().await;
    let (mut ws, _) = connect_async(relay.url.as_str()).await.expect("connect");
    assert!(matches!(recv(&mut ws).await, ServerMessage::Welcome { .. }));

    let task = json!({"app": "x", "type": "todos", "token": "secret", "pld": {"title": "a"}});
    send(
        &mut ws,
        json!({"type": "call", "request": 1, "procedure": "data.create", "args": [task]}),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::Result { request, args } => {
            assert_eq!(request, 1);
            assert_eq!(args, vec![json!("t-1")]);
        }
        other => panic!("expected result, got {other:?}"),
    }

    send(
        &mut ws,
        json!({"type": "call", "request": 2, "procedure": "data.remove", "args": [task]}),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::Error { request, message } => {
            assert_eq!(request, Some(2));
            assert!(message.starts_with("Incorrect payload"), "{message}");
        }
        other => panic!("expected error, got {other:?}"),
    }
}
