use super::pubsub_client::Client;
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

#[test]
fn test_client_ids_are_unique_and_non_zero() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let a = Client::new(tx.clone());
    let b = Client::new(tx);
    assert_ne!(a.id, 0);
    assert_ne!(a.id, b.id);
}

#[test]
fn test_send_reports_closed_session() {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::with_id(3, tx);
    assert!(client.send(WsMessage::text("hi".to_string())));
    drop(rx);
    assert!(!client.send(WsMessage::text("bye".to_string())));
}
