//! Integration tests for logging initialisation driven by configuration

use core_runtime::config::AppConfig;
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LogLevel};
use core_runtime::Error;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_logging_initializes_once_from_environment() {
    let config = AppConfig::from_lookup(lookup(&[
        ("ENVATO_PERSONAL_TOKEN", "token"),
        ("R2_ENDPOINT", "https://account.r2.cloudflarestorage.com"),
        ("R2_BUCKET", "archives"),
        ("R2_ACCESS_KEY", "access"),
        ("R2_SECRET_KEY", "secret"),
        ("SQLITE_PATH", "vault.db"),
        ("LOG_FORMAT", "compact"),
        ("LOG_LEVEL", "warn"),
    ]))
    .unwrap();

    assert_eq!(config.logging.format, LogFormat::Compact);
    assert_eq!(config.logging.level, LogLevel::Warn);

    init_logging(config.logging.clone()).unwrap();
    tracing::warn!(item_id = 42u64, "logging is live");

    // A global subscriber can only be installed once per process
    let second = init_logging(config.logging);
    assert!(matches!(second, Err(Error::Config(_))));
}

#[test]
fn test_invalid_log_level_fails_config_load() {
    let result = AppConfig::from_lookup(lookup(&[
        ("ENVATO_PERSONAL_TOKEN", "token"),
        ("R2_ENDPOINT", "https://account.r2.cloudflarestorage.com"),
        ("R2_BUCKET", "archives"),
        ("R2_ACCESS_KEY", "access"),
        ("R2_SECRET_KEY", "secret"),
        ("SQLITE_PATH", "vault.db"),
        ("LOG_LEVEL", "chatty"),
    ]));

    let err = result.unwrap_err();
    assert!(err.to_string().contains("Unknown log level"));
}

#[test]
fn test_credentials_are_redacted() {
    assert_eq!(redact_if_sensitive("ENVATO_PERSONAL_TOKEN", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("r2_secret_key", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("bucket", "archives"), "archives");
}
