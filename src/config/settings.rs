use serde::Deserialize;

/// Top-level configuration settings for the relay.
///
/// Groups the listening socket, the registry store, the upstream job queue,
/// the backend data API and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub queue: QueueSettings,
    pub api: ApiSettings,
    pub log: LogSettings,
}

/// Address the WebSocket transport binds to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Location of the sled database holding the subscription registry.
#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub path: String,
}

/// Upstream queue the bridge subscribes to for the process lifetime.
#[derive(Debug, Deserialize, Clone)]
pub struct QueueSettings {
    pub url: String,
    pub subject: String,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub store: Option<PartialStoreSettings>,
    pub queue: Option<PartialQueueSettings>,
    pub api: Option<PartialApiSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize)]
pub struct PartialStoreSettings {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialQueueSettings {
    pub url: Option<String>,
    pub subject: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialApiSettings {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            store: StoreSettings {
                path: "relay_db".to_string(),
            },
            queue: QueueSettings {
                url: "ws://127.0.0.1:9090".to_string(),
                subject: "realtime-jobs".to_string(),
                token: None,
            },
            api: ApiSettings {
                url: "http://127.0.0.1:5000".to_string(),
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
