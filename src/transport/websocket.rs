//! WebSocket transport
//!
//! Accepts connections, gives each one a numeric session id, and translates
//! JSON frames into broker operations. Subscribe, publish and goodbye are
//! handed to the installed interceptor first and the session waits until
//! the event has been taken before the broker acts on it.
//!
//! Connections are accepted from any origin; the origin is only logged.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::{SharedBroker, lock};
use crate::client::{Client, SessionId};
use crate::transport::interceptor::{SessionEvent, SessionInterceptor};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::TransportError;

/// Binds the listening socket.
pub async fn bind(addr: &str) -> Result<TcpListener, TransportError> {
    Ok(TcpListener::bind(addr).await?)
}

/// Accepts connections on `listener` until it fails, one task per session.
pub async fn start_websocket_server(
    listener: TcpListener,
    broker: SharedBroker,
    interceptor: Arc<dyn SessionInterceptor>,
) {
    match listener.local_addr() {
        Ok(addr) => info!("WebSocket server listening on ws://{addr}"),
        Err(e) => warn!("WebSocket server listening on unknown address: {e}"),
    }

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(%peer, "incoming connection");
                spawn(serve_session(stream, broker.clone(), interceptor.clone()));
            }
            Err(e) => {
                error!("accept failed: {e}");
                break;
            }
        }
    }
}

fn accept_any_origin(req: &Request, resp: Response) -> Result<Response, ErrorResponse> {
    let origin = req
        .headers()
        .get("origin")
        .and_then(|o| o.to_str().ok())
        .unwrap_or("-");
    debug!(origin, "accepting websocket upgrade");
    Ok(resp)
}

fn reply(tx: &UnboundedSender<WsMessage>, frame: &ServerMessage) {
    match serde_json::to_string(frame) {
        Ok(text) => {
            let _ = tx.send(WsMessage::text(text));
        }
        Err(e) => error!("failed to encode frame: {e}"),
    }
}

/// Tears a session down exactly once, whichever side notices first.
#[derive(Clone)]
struct SessionGuard {
    session_id: SessionId,
    broker: SharedBroker,
    interceptor: Arc<dyn SessionInterceptor>,
    closed: Arc<AtomicBool>,
}

impl SessionGuard {
    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.interceptor
            .intercept(SessionEvent::Goodbye {
                client_id: self.session_id,
            })
            .taken()
            .await;
        lock(&self.broker).cleanup_client(&self.session_id);
        info!(session = self.session_id, "session closed");
    }
}

async fn serve_session(
    stream: TcpStream,
    broker: SharedBroker,
    interceptor: Arc<dyn SessionInterceptor>,
) {
    let ws_stream = match accept_hdr_async(stream, accept_any_origin).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx.clone());
    let session_id = client.id;
    lock(&broker).register_client(client);
    reply(
        &tx,
        &ServerMessage::Welcome {
            session: session_id,
        },
    );
    info!(session = session_id, "session opened");

    let guard = SessionGuard {
        session_id,
        broker: broker.clone(),
        interceptor: interceptor.clone(),
        closed: Arc::new(AtomicBool::new(false)),
    };

    {
        let guard = guard.clone();
        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    warn!(session = guard.session_id, "failed to send frame: {e}");
                    break;
                }
            }
            guard.close().await;
        });
    }

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Subscribe {
                request,
                topic,
                options,
            }) => {
                interceptor
                    .intercept(SessionEvent::Subscribe {
                        topic: topic.clone(),
                        client_id: session_id,
                        options,
                    })
                    .taken()
                    .await;
                lock(&broker).subscribe(&topic, session_id);
                debug!(session = session_id, %topic, "subscribed");
                reply(&tx, &ServerMessage::Subscribed { request, topic });
            }
            Ok(ClientMessage::Unsubscribe { request, topic }) => {
                lock(&broker).unsubscribe(&topic, &session_id);
                debug!(session = session_id, %topic, "unsubscribed");
                reply(&tx, &ServerMessage::Unsubscribed { request, topic });
            }
            Ok(ClientMessage::Publish { topic, args, .. }) => {
                interceptor
                    .intercept(SessionEvent::Publish {
                        topic: topic.clone(),
                        arguments: args.clone(),
                    })
                    .taken()
                    .await;
                if let Err(e) = lock(&broker).publish(&topic, &args, Some(session_id)) {
                    error!(session = session_id, %topic, "publish failed: {e}");
                }
            }
            Ok(ClientMessage::Call {
                request,
                procedure,
                args,
            }) => {
                let handler = lock(&broker).procedure(&procedure);
                match handler {
                    Some(handler) => {
                        let tx = tx.clone();
                        spawn(async move {
                            let frame = match handler.invoke(args).await {
                                Ok(args) => ServerMessage::Result { request, args },
                                Err(message) => ServerMessage::Error {
                                    request: Some(request),
                                    message,
                                },
                            };
                            reply(&tx, &frame);
                        });
                    }
                    None => reply(
                        &tx,
                        &ServerMessage::Error {
                            request: Some(request),
                            message: format!("no such procedure: {procedure}"),
                        },
                    ),
                }
            }
            Ok(ClientMessage::Goodbye {}) => break,
            Err(err) => {
                warn!(
                    session = session_id,
                    "invalid frame: {err} | {}",
                    text.chars().take(100).collect::<String>()
                );
                reply(
                    &tx,
                    &ServerMessage::Error {
                        request: None,
                        message: format!("invalid frame: {err}"),
                    },
                );
            }
        }
    }

    guard.close().await;
}
