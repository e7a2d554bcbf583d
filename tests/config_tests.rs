#![allow(clippy::unwrap_used, clippy::expect_used)]

use brrtdispatch::config::AppConfig;
use brrtdispatch::echo::register_demo;
use brrtdispatch::pool::PoolOptions;
use brrtdispatch::{codes, Context, Dispatcher, MessageId, Payload};
use std::io::Write;

fn write_config(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(text.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(
        "dispatch:\n  pool_prewarm: 3\n  pool_max_idle: 16\n  max_payload_bytes: 32\n\
         http:\n  addr: 0.0.0.0:9100\n  path: /game\n",
    );
    let config = AppConfig::load(file.path()).unwrap();
    assert_eq!(
        config.dispatch.pool_options(),
        PoolOptions {
            prewarm: 3,
            max_idle: Some(16)
        }
    );
    assert_eq!(config.dispatch.max_payload_bytes, Some(32));
    assert!(config.dispatch.validate);
    assert_eq!(config.http.addr, "0.0.0.0:9100");
    assert_eq!(config.http.path, "/game");
    assert_eq!(config.http.id_field, "msg_id");
}

#[test]
fn test_missing_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("absent.yaml"));
}

#[test]
fn test_malformed_file_is_error() {
    let file = write_config("dispatch: [not, a, map]\n");
    assert!(AppConfig::load(file.path()).is_err());
}

#[test]
fn test_empty_file_gives_defaults() {
    let file = write_config("");
    assert_eq!(AppConfig::load(file.path()).unwrap(), AppConfig::default());
}

#[test]
fn test_dispatch_config_applies_to_builder() {
    let file = write_config("dispatch:\n  pool_prewarm: 2\n  max_payload_bytes: 20\n  validate: false\n");
    let config = AppConfig::load(file.path()).unwrap();
    let dispatcher = config.dispatch.apply(Dispatcher::builder()).build();
    register_demo(&dispatcher).unwrap();

    let echo = dispatcher.lookup(&MessageId::from("echo")).unwrap();
    assert_eq!(echo.request_pool_stats().idle, 2);

    let id = MessageId::from("echo");
    let ctx = Context::new(&id);
    // Validation is off: an empty message echoes back
    let body = dispatcher.dispatch(&ctx, &id, Payload::Empty).unwrap();
    assert_eq!(body, br#"{"message":""}"#);

    let err = dispatcher
        .dispatch(&ctx, &id, Payload::json(br#"{"message":"well over twenty bytes"}"#))
        .unwrap_err();
    assert_eq!(err.code(), codes::DECODE);
}

#[test]
fn test_round_trips_through_yaml() {
    let mut config = AppConfig::default();
    config.http.path = "/other".into();
    config.dispatch.pool_max_idle = Some(4);
    let yaml = serde_yaml::to_string(&config).unwrap();
    assert_eq!(AppConfig::from_yaml(&yaml).unwrap(), config);
}
