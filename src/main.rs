//! CLI for the realtime relay
//!
//! Subcommands:
//! - `server`: run the relay
//! - `watch`: open a filtered subscription and print what arrives (useful for smoke tests)

use std::sync::Arc;

use clap::Parser;
use realtime_relay::broker::Broker;
use realtime_relay::config::{Settings, load_config};
use realtime_relay::fanout::{FanoutEngine, Registry, event_channel};
use realtime_relay::persistence::SledStore;
use realtime_relay::queue::{QueueBridge, WebSocketQueue};
use realtime_relay::rpc::{DataGateway, HttpDataApi};
use realtime_relay::transport::LocalClient;
use realtime_relay::transport::websocket::{bind, start_websocket_server};
use realtime_relay::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "realtime-relay")]
enum Command {
    /// Start the relay
    Server,
    /// Subscribe to `<topic>.<id>` with a filter and print every event
    Watch {
        /// Relay URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Base topic, e.g. `todos.Task.create`
        topic: String,
        /// Filter object matched against `pld`, as JSON
        #[arg(long, default_value = "{}")]
        filter: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cmd = Command::parse();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return;
        }
    };
    logging::init(&config.log.level);

    match cmd {
        Command::Server => {
            if let Err(e) = run_server(config).await {
                error!("Server failed: {}", e);
            }
        }
        Command::Watch { url, topic, filter } => {
            if let Err(e) = run_watch(&url, &topic, &filter).await {
                error!("Watch failed: {}", e);
            }
        }
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(SledStore::open(&config.store.path)?);
    let broker = Broker::shared();

    let (forwarder, queue) = event_channel();
    let forwarder = Arc::new(forwarder);
    let local = Arc::new(LocalClient::new(broker.clone(), forwarder.clone()));

    FanoutEngine::new(Registry::new(store), local.clone()).spawn(queue);

    let api = HttpDataApi::new(&config.api.url)?;
    Arc::new(DataGateway::new(Arc::new(api))).register(&local)?;

    QueueBridge::new(local.clone()).spawn(
        Arc::new(WebSocketQueue::new(
            config.queue.url.clone(),
            config.queue.token.clone(),
        )),
        config.queue.subject.clone(),
    );

    let listener = bind(&format!("{}:{}", config.server.host, config.server.port)).await?;

    tokio::select! {
        _ = start_websocket_server(listener, broker, forwarder) => {
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_watch(url: &str, topic: &str, filter: &str) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let filter: Value = serde_json::from_str(filter)?;
    let (mut ws_stream, _response) = connect_async(url).await?;

    // The session id doubles as the private suffix of the topic.
    let session = match ws_stream.next().await {
        Some(Ok(WsMessage::Text(welcome))) => {
            println!("Welcome: {welcome}");
            let v: Value = serde_json::from_str(&welcome)?;
            v.get("session").and_then(Value::as_u64).unwrap_or_default()
        }
        _ => return Err("relay did not greet the session".into()),
    };

    let subscribe = json!({
        "type": "subscribe",
        "request": 1,
        "topic": format!("{topic}.{session}"),
        "options": { "filter": filter },
    });
    ws_stream
        .send(WsMessage::Text(subscribe.to_string().into()))
        .await?;

    loop {
        tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => println!("{text}"),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                let goodbye = json!({ "type": "goodbye" });
                ws_stream
                    .send(WsMessage::Text(goodbye.to_string().into()))
                    .await?;
                break;
            }
        }
    }

    Ok(())
}
