use super::load_config;
use super::settings::Settings;
use serial_test::serial;
use std::env;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_default_settings() {
    let settings = Settings::default();
    assert_eq!(settings.server.host, "127.0.0.1");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.store.path, "relay_db");
    assert_eq!(settings.queue.subject, "realtime-jobs");
    assert!(settings.queue.token.is_none());
    assert_eq!(settings.log.level, "info");
}

#[test]
#[serial]
fn load_config_from_file_overrides_defaults() {
    let tmp = TempDir::new().expect("create tempdir");
    let orig = env::current_dir().expect("current_dir");
    env::set_current_dir(tmp.path()).expect("set current dir");

    fs::create_dir_all("config").expect("create config dir");
    let toml = r#"
        [server]
        port = 9000

        [queue]
        subject = "jobs"
        token = "secret"

        [api]
        url = "http://backend:5000"
    "#;
    fs::write("config/default.toml", toml).expect("write config file");

    let cfg = load_config();
    env::set_current_dir(orig).expect("restore cwd");

    let cfg = cfg.expect("load_config failed");
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.queue.subject, "jobs");
    assert_eq!(cfg.queue.token.as_deref(), Some("secret"));
    assert_eq!(cfg.queue.url, "ws://127.0.0.1:9090");
    assert_eq!(cfg.api.url, "http://backend:5000");
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    temp_env::with_vars(
        [("SERVER_PORT", Some("9100")), ("STORE_PATH", Some("/tmp/registry"))],
        || {
            let cfg = load_config().expect("load_config failed");
            assert_eq!(cfg.server.port, 9100);
            assert_eq!(cfg.store.path, "/tmp/registry");
            assert_eq!(cfg.server.host, "127.0.0.1");
        },
    );
}
