mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    ApiSettings, LogSettings, QueueSettings, ServerSettings, Settings, StoreSettings,
};

/// Loads the configuration from `config/default` and environment variables
/// (`SERVER_PORT`, `QUEUE_SUBJECT`, ...) and merges it over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(Environment::default().separator("_"));

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    let server = partial.server.as_ref();
    let store = partial.store.as_ref();
    let queue = partial.queue.as_ref();
    let api = partial.api.as_ref();
    let log = partial.log.as_ref();

    Ok(Settings {
        server: ServerSettings {
            host: server
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server.and_then(|s| s.port).unwrap_or(default.server.port),
        },
        store: StoreSettings {
            path: store
                .and_then(|s| s.path.clone())
                .unwrap_or(default.store.path),
        },
        queue: QueueSettings {
            url: queue
                .and_then(|q| q.url.clone())
                .unwrap_or(default.queue.url),
            subject: queue
                .and_then(|q| q.subject.clone())
                .unwrap_or(default.queue.subject),
            token: queue.and_then(|q| q.token.clone()).or(default.queue.token),
        },
        api: ApiSettings {
            url: api.and_then(|a| a.url.clone()).unwrap_or(default.api.url),
        },
        log: LogSettings {
            level: log
                .and_then(|l| l.level.clone())
                .unwrap_or(default.log.level),
        },
    })
}

#[cfg(test)]
mod tests;
