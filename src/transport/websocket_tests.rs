use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;

use super::message::ServerMessage;
use super::websocket::{bind, start_websocket_server};
use super::{LocalClient, PassThrough, Receipt, SessionEvent, SessionInterceptor};
use crate::broker::{Broker, Procedure, SharedBroker, lock};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Clone, Default)]
struct Recorder {
    events: Arc<Mutex<Vec<SessionEvent>>>,
}

impl SessionInterceptor for Recorder {
    fn intercept(&self, event: SessionEvent) -> Receipt {
        self.events.lock().unwrap().push(event);
        Receipt::ready()
    }
}

struct Echo;

#[async_trait]
impl Procedure for Echo {
    async fn invoke(&self, args: Vec<Value>) -> Result<Vec<Value>, String> {
        Ok(args)
    }
}

async fn start(interceptor: Arc<dyn SessionInterceptor>) -> (String, SharedBroker) {
    let listener = bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let broker = Broker::shared();
    tokio::spawn(start_websocket_server(listener, broker.clone(), interceptor));
    (format!("ws://{addr}"), broker)
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

async fn connect(url: &str) -> (Ws, u64) {
    let (mut ws, _) = connect_async(url).await.expect("connect");
    match recv(&mut ws).await {
        ServerMessage::Welcome { session } => (ws, session),
        other => panic!("expected welcome, got {other:?}"),
    }
}

async fn subscribe(ws: &mut Ws, topic: &str, options: Value) {
    send(
        ws,
        json!({"type": "subscribe", "request": 1, "topic": topic, "options": options}),
    )
    .await;
    match recv(ws).await {
        ServerMessage::Subscribed { topic: t, .. } => assert_eq!(t, topic),
        other => panic!("expected subscribed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_publish_reaches_other_sessions() {
    let (url, _) = start(Arc::new(PassThrough)).await;
    let (mut a, _) = connect(&url).await;
    let (mut b, _) = connect(&url).await;

    subscribe(&mut a, "room42", json!({})).await;
    send(
        &mut b,
        json!({"type": "publish", "topic": "room42", "args": ["hello"]}),
    )
    .await;

    match recv(&mut a).await {
        ServerMessage::Event { topic, args, .. } => {
            assert_eq!(topic, "room42");
            assert_eq!(args, vec![json!("hello")]);
        }
        other => panic!("expected event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_session_events_are_intercepted() {
    let recorder = Recorder::default();
    let (url, broker) = start(Arc::new(recorder.clone())).await;
    let (mut ws, session) = connect(&url).await;

    subscribe(&mut ws, "room42.x", json!({"filter": {}})).await;
    send(&mut ws, json!({"type": "goodbye"})).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while recorder.events.lock().unwrap().len() < 2
        || lock(&broker).clients.contains_key(&session)
    {
        assert!(tokio::time::Instant::now() < deadline, "goodbye not seen");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(
        recorder.events.lock().unwrap().as_slice(),
        &[
            SessionEvent::Subscribe {
                topic: "room42.x".to_string(),
                client_id: session,
                options: json!({"filter": {}}),
            },
            SessionEvent::Goodbye { client_id: session },
        ]
    );
}

#[tokio::test]
async fn test_call_registered_procedure() {
    let (url, broker) = start(Arc::new(PassThrough)).await;
    LocalClient::new(broker, Arc::new(PassThrough))
        .register("echo", Arc::new(Echo))
        .unwrap();
    let (mut ws, _) = connect(&url).await;

    send(
        &mut ws,
        json!({"type": "call", "request": 5, "procedure": "echo", "args": [{"a": 1}]}),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::Result { request, args } => {
            assert_eq!(request, 5);
            assert_eq!(args, vec![json!({"a": 1})]);
        }
        other => panic!("expected result, got {other:?}"),
    }

    send(
        &mut ws,
        json!({"type": "call", "request": 6, "procedure": "missing"}),
    )
    .await;
    match recv(&mut ws).await {
        ServerMessage::Error { request, message } => {
            assert_eq!(request, Some(6));
            assert_eq!(message, "no such procedure: missing");
        }
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_frame_is_reported() {
    let (url, _) = start(Arc::new(PassThrough)).await;
    let (mut ws, _) = connect(&url).await;

    ws.send(WsMessage::text(r#"{"type":"dance"}"#.to_string()))
        .await
        .unwrap();
    match recv(&mut ws).await {
        ServerMessage::Error { request, .. } => assert_eq!(request, None),
        other => panic!("expected error, got {other:?}"),
    }
}
