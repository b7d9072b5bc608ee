//! # Application Configuration
//!
//! Configuration for the purchase archiver.
//!
//! ## Overview
//!
//! [`AppConfig`] holds every setting the service needs: catalog credentials,
//! the object store bucket, the record store backend, scheduling, concurrency
//! and logging. It is built either through [`AppConfigBuilder`] or loaded
//! from the process environment with [`AppConfig::from_env`]. Both paths run
//! the same fail-fast validation, so a misconfigured process stops before the
//! first sync cycle with a message naming the missing setting.
//!
//! ## Environment
//!
//! | Variable | Meaning |
//! |---|---|
//! | `CONCURRENCY` | Max parallel sync workers (positive integer, default 2) |
//! | `CRON` | 5- or 6-field cron expression (default `0 * * * *`) |
//! | `TZ` | IANA timezone for the schedule (default `UTC`) |
//! | `DISCORD_WEBHOOK_URL` | Notification webhook; unset disables notifications |
//! | `ENVATO_PERSONAL_TOKEN` | Catalog API token (required) |
//! | `R2_ENDPOINT`, `R2_BUCKET`, `R2_ACCESS_KEY`, `R2_SECRET_KEY` | Object store (required) |
//! | `CF_API_KEY`, `CF_ACCOUNT_ID`, `CF_D1_ID`, `CF_D1_TABLE` | D1 record store |
//! | `SQLITE_PATH` | Local SQLite record store (used when D1 is not configured) |
//! | `STAGING_DIR` | Download staging directory (default `{tmp}/purchase-vault`) |
//! | `LOG_FORMAT`, `LOG_LEVEL`, `RUST_LOG` | Logging |
//!
//! The daemon first loads a `.env` file from the working directory with
//! [`load_env_file`]. Variables already present in the process environment
//! take precedence over the file. `${VAR}` references in values are
//! substituted by dotenvy's own rules, which only see the process
//! environment and lines earlier in the file.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{AppConfig, ObjectStoreSettings, RecordStoreSettings};
//!
//! let config = AppConfig::builder()
//!     .envato_token("personal-token")
//!     .object_store(ObjectStoreSettings::new(
//!         "https://account.r2.cloudflarestorage.com",
//!         "archives",
//!         "access-key",
//!         "secret-key",
//!     ))
//!     .record_store(RecordStoreSettings::Sqlite { path: "vault.db".into() })
//!     .concurrency(4)
//!     .build()?;
//! # Ok::<(), core_runtime::Error>(())
//! ```

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LogLevel, LoggingConfig};
use chrono_tz::Tz;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Default Envato Market API root
pub const DEFAULT_ENVATO_API_BASE: &str = "https://api.envato.com/v3/market";

/// Default Cloudflare REST API root
pub const DEFAULT_CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default cron expression: top of every hour
pub const DEFAULT_SCHEDULE: &str = "0 * * * *";

/// Default number of concurrent sync workers
pub const DEFAULT_CONCURRENCY: usize = 2;

/// A credential whose value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw secret value
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Catalog API settings
#[derive(Debug, Clone)]
pub struct EnvatoSettings {
    pub token: Secret,
    pub api_base: String,
}

/// S3-compatible bucket settings
#[derive(Debug, Clone)]
pub struct ObjectStoreSettings {
    pub endpoint: String,
    pub bucket: String,
    pub region: String,
    pub access_key: Secret,
    pub secret_key: Secret,
}

impl ObjectStoreSettings {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_key: impl Into<Secret>,
        secret_key: impl Into<Secret>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            region: "auto".to_string(),
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        let endpoint = Url::parse(&self.endpoint).map_err(|e| {
            Error::Config(format!(
                "Object store endpoint '{}' is not a valid URL: {}",
                self.endpoint, e
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Object store endpoint must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }
        if self.bucket.trim().is_empty() {
            return Err(Error::Config(
                "Object store bucket cannot be empty. Set R2_BUCKET.".to_string(),
            ));
        }
        if self.access_key.is_empty() || self.secret_key.is_empty() {
            return Err(Error::Config(
                "Object store credentials cannot be empty. Set R2_ACCESS_KEY and R2_SECRET_KEY."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Cloudflare D1 settings
#[derive(Debug, Clone)]
pub struct D1Settings {
    pub api_base: String,
    pub api_token: Secret,
    pub account_id: String,
    pub database_id: String,
    pub table: String,
}

/// Where archive records are persisted
#[derive(Debug, Clone)]
pub enum RecordStoreSettings {
    /// Cloudflare D1 over its HTTP query API
    D1(D1Settings),
    /// Local SQLite database file
    Sqlite { path: PathBuf },
}

impl RecordStoreSettings {
    fn validate(&self) -> Result<()> {
        match self {
            Self::D1(d1) => {
                if d1.api_token.is_empty() {
                    return Err(Error::Config(
                        "D1 API token cannot be empty. Set CF_API_KEY.".to_string(),
                    ));
                }
                for (value, var) in [
                    (&d1.account_id, "CF_ACCOUNT_ID"),
                    (&d1.database_id, "CF_D1_ID"),
                    (&d1.table, "CF_D1_TABLE"),
                ] {
                    if value.trim().is_empty() {
                        return Err(Error::Config(format!(
                            "D1 record store is missing a value. Set {}.",
                            var
                        )));
                    }
                }
                Ok(())
            }
            Self::Sqlite { path } => {
                if path.as_os_str().is_empty() {
                    return Err(Error::Config(
                        "SQLite path cannot be empty. Set SQLITE_PATH.".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Maximum number of sync workers running at once
    pub concurrency: usize,
    /// Six-field (seconds-first) cron expression
    pub schedule: String,
    /// Timezone the schedule is evaluated in
    pub timezone: Tz,
    /// Notification webhook; `None` disables notifications
    pub webhook_url: Option<Secret>,
    pub envato: EnvatoSettings,
    pub object_store: ObjectStoreSettings,
    pub record_store: RecordStoreSettings,
    /// Directory holding in-flight downloads
    pub staging_dir: PathBuf,
    pub logging: LoggingConfig,
}

/// Default env file loaded by the daemon
pub const DOTENV_FILE: &str = ".env";

/// Load `path` into the process environment.
///
/// Returns `Ok(false)` when the file does not exist. Existing variables are
/// never overwritten.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(Error::Config(format!(
            "Failed to load environment file {}: {}",
            path.display(),
            e
        ))),
    }
}

impl AppConfig {
    /// Creates a new builder for constructing an `AppConfig`.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| {
                Error::Config(format!("Missing required environment variable {}", key))
            })
        };

        let mut builder = AppConfig::builder();

        if let Some(raw) = get("CONCURRENCY") {
            let concurrency = raw.parse::<usize>().map_err(|_| {
                Error::Config(format!(
                    "CONCURRENCY must be a positive integer, got '{}'",
                    raw
                ))
            })?;
            builder = builder.concurrency(concurrency);
        }
        if let Some(schedule) = get("CRON") {
            builder = builder.schedule(schedule);
        }
        if let Some(tz) = get("TZ") {
            builder = builder.timezone(tz);
        }
        if let Some(webhook) = get("DISCORD_WEBHOOK_URL") {
            builder = builder.webhook_url(webhook);
        }
        if let Some(dir) = get("STAGING_DIR") {
            builder = builder.staging_dir(dir);
        }

        builder = builder.envato_token(require("ENVATO_PERSONAL_TOKEN")?);
        if let Some(base) = get("ENVATO_API_BASE") {
            builder = builder.envato_api_base(base);
        }

        builder = builder.object_store(ObjectStoreSettings::new(
            require("R2_ENDPOINT")?,
            require("R2_BUCKET")?,
            require("R2_ACCESS_KEY")?,
            require("R2_SECRET_KEY")?,
        ));

        let d1_keys = ["CF_API_KEY", "CF_ACCOUNT_ID", "CF_D1_ID", "CF_D1_TABLE"];
        if d1_keys.iter().any(|key| get(key).is_some()) {
            builder = builder.record_store(RecordStoreSettings::D1(D1Settings {
                api_base: get("CF_API_BASE")
                    .unwrap_or_else(|| DEFAULT_CLOUDFLARE_API_BASE.to_string()),
                api_token: require("CF_API_KEY")?.into(),
                account_id: require("CF_ACCOUNT_ID")?,
                database_id: require("CF_D1_ID")?,
                table: require("CF_D1_TABLE")?,
            }));
        } else if let Some(path) = get("SQLITE_PATH") {
            builder = builder.record_store(RecordStoreSettings::Sqlite { path: path.into() });
        }

        let mut logging = LoggingConfig::default();
        if let Some(format) = get("LOG_FORMAT") {
            logging = logging.with_format(format.parse::<LogFormat>()?);
        }
        if let Some(level) = get("LOG_LEVEL") {
            logging = logging.with_level(level.parse::<LogLevel>()?);
        }
        if let Some(filter) = get("RUST_LOG") {
            logging = logging.with_filter(filter);
        }
        builder = builder.logging(logging);

        builder.build()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(Error::Config(
                "Concurrency must be at least 1. Set CONCURRENCY to a positive integer.".to_string(),
            ));
        }

        if self.envato.token.is_empty() {
            return Err(Error::Config(
                "Envato personal token cannot be empty. Set ENVATO_PERSONAL_TOKEN.".to_string(),
            ));
        }

        if let Some(webhook) = &self.webhook_url {
            let parsed = Url::parse(webhook.expose()).map_err(|e| {
                Error::Config(format!("Webhook URL is not a valid URL: {}", e))
            })?;
            if parsed.scheme() != "https" && parsed.scheme() != "http" {
                return Err(Error::Config(
                    "Webhook URL must use http or https".to_string(),
                ));
            }
        }

        if self.staging_dir.as_os_str().is_empty() {
            return Err(Error::Config("Staging directory cannot be empty".to_string()));
        }

        self.object_store.validate()?;
        self.record_store.validate()?;

        Ok(())
    }
}

/// Turn a cron expression into the six-field, seconds-first form.
///
/// Five-field (minute-first) expressions get a leading `0` seconds field.
/// Six- and seven-field expressions are returned unchanged.
pub fn normalize_schedule(expression: &str) -> Result<String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 | 7 => Ok(fields.join(" ")),
        n => Err(Error::Config(format!(
            "Cron expression '{}' has {} fields; expected 5 (minute-first) or 6 (seconds-first)",
            expression, n
        ))),
    }
}

/// Builder for constructing [`AppConfig`] instances.
#[derive(Default)]
pub struct AppConfigBuilder {
    concurrency: Option<usize>,
    schedule: Option<String>,
    timezone: Option<String>,
    webhook_url: Option<String>,
    envato_token: Option<String>,
    envato_api_base: Option<String>,
    object_store: Option<ObjectStoreSettings>,
    record_store: Option<RecordStoreSettings>,
    staging_dir: Option<PathBuf>,
    logging: Option<LoggingConfig>,
}

impl AppConfigBuilder {
    /// Maximum number of concurrent sync workers.
    ///
    /// Default: 2
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    /// Cron expression (5 or 6 fields).
    ///
    /// Default: `0 * * * *` (hourly)
    pub fn schedule(mut self, expression: impl Into<String>) -> Self {
        self.schedule = Some(expression.into());
        self
    }

    /// IANA timezone name the schedule is evaluated in.
    ///
    /// Default: `UTC`
    pub fn timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }

    /// Notification webhook URL.
    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Catalog personal token (required).
    pub fn envato_token(mut self, token: impl Into<String>) -> Self {
        self.envato_token = Some(token.into());
        self
    }

    /// Override the catalog API root.
    pub fn envato_api_base(mut self, base: impl Into<String>) -> Self {
        self.envato_api_base = Some(base.into());
        self
    }

    /// Object store bucket settings (required).
    pub fn object_store(mut self, settings: ObjectStoreSettings) -> Self {
        self.object_store = Some(settings);
        self
    }

    /// Record store backend (required).
    pub fn record_store(mut self, settings: RecordStoreSettings) -> Self {
        self.record_store = Some(settings);
        self
    }

    /// Directory for in-flight downloads.
    ///
    /// Default: `{tmp}/purchase-vault`
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final `AppConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a required setting is missing, the cron
    /// expression or timezone cannot be parsed, or a value is out of range.
    pub fn build(self) -> Result<AppConfig> {
        let envato_token = self.envato_token.ok_or_else(|| {
            Error::Config(
                "Envato personal token is required. Use .envato_token() or set ENVATO_PERSONAL_TOKEN."
                    .to_string(),
            )
        })?;

        let object_store = self.object_store.ok_or_else(|| {
            Error::Config(
                "Object store settings are required. Use .object_store() or set R2_ENDPOINT, \
                 R2_BUCKET, R2_ACCESS_KEY and R2_SECRET_KEY."
                    .to_string(),
            )
        })?;

        let record_store = self.record_store.ok_or_else(|| {
            Error::Config(
                "A record store is required. Use .record_store() or set either the CF_* D1 \
                 variables or SQLITE_PATH."
                    .to_string(),
            )
        })?;

        let schedule =
            normalize_schedule(self.schedule.as_deref().unwrap_or(DEFAULT_SCHEDULE))?;

        let timezone_name = self.timezone.unwrap_or_else(|| "UTC".to_string());
        let timezone = timezone_name.parse::<Tz>().map_err(|_| {
            Error::Config(format!(
                "Unknown timezone '{}'. Use an IANA name such as 'Europe/Paris'.",
                timezone_name
            ))
        })?;

        let config = AppConfig {
            concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            schedule,
            timezone,
            webhook_url: self.webhook_url.map(Secret::new),
            envato: EnvatoSettings {
                token: Secret::new(envato_token),
                api_base: self
                    .envato_api_base
                    .unwrap_or_else(|| DEFAULT_ENVATO_API_BASE.to_string()),
            },
            object_store,
            record_store,
            staging_dir: self
                .staging_dir
                .unwrap_or_else(|| std::env::temp_dir().join("purchase-vault")),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn object_store() -> ObjectStoreSettings {
        ObjectStoreSettings::new(
            "https://account.r2.cloudflarestorage.com",
            "archives",
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI",
        )
    }

    fn sqlite() -> RecordStoreSettings {
        RecordStoreSettings::Sqlite {
            path: PathBuf::from("/var/lib/vault.db"),
        }
    }

    fn minimal_builder() -> AppConfigBuilder {
        AppConfig::builder()
            .envato_token("token")
            .object_store(object_store())
            .record_store(sqlite())
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const BASE_ENV: &[(&str, &str)] = &[
        ("ENVATO_PERSONAL_TOKEN", "envato-token"),
        ("R2_ENDPOINT", "https://account.r2.cloudflarestorage.com"),
        ("R2_BUCKET", "archives"),
        ("R2_ACCESS_KEY", "access"),
        ("R2_SECRET_KEY", "secret"),
        ("SQLITE_PATH", "/tmp/vault.db"),
    ];

    #[test]
    fn test_builder_defaults() {
        let config = minimal_builder().build().unwrap();

        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.schedule, "0 0 * * * *");
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert!(config.webhook_url.is_none());
        assert_eq!(config.envato.api_base, DEFAULT_ENVATO_API_BASE);
        assert_eq!(config.object_store.region, "auto");
        assert!(config.staging_dir.ends_with("purchase-vault"));
    }

    #[test]
    fn test_builder_requires_envato_token() {
        let err = AppConfig::builder()
            .object_store(object_store())
            .record_store(sqlite())
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("Envato personal token is required"));
    }

    #[test]
    fn test_builder_requires_object_store() {
        let err = AppConfig::builder()
            .envato_token("token")
            .record_store(sqlite())
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("Object store settings are required"));
    }

    #[test]
    fn test_builder_requires_record_store() {
        let err = AppConfig::builder()
            .envato_token("token")
            .object_store(object_store())
            .build()
            .unwrap_err();

        assert!(err.to_string().contains("record store is required"));
    }

    #[test]
    fn test_concurrency_must_be_positive() {
        assert!(minimal_builder().concurrency(0).build().is_err());
        assert_eq!(minimal_builder().concurrency(1).build().unwrap().concurrency, 1);
        assert_eq!(minimal_builder().concurrency(500).build().unwrap().concurrency, 500);
    }

    #[test]
    fn test_from_lookup_accepts_large_concurrency() {
        let mut pairs = BASE_ENV.to_vec();
        pairs.push(("CONCURRENCY", "100"));
        let config = AppConfig::from_lookup(env(&pairs)).unwrap();
        assert_eq!(config.concurrency, 100);
    }

    #[test]
    fn test_from_lookup_rejects_zero_concurrency() {
        let mut pairs = BASE_ENV.to_vec();
        pairs.push(("CONCURRENCY", "0"));
        let err = AppConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("CONCURRENCY"));
    }

    #[test]
    fn test_schedule_normalization() {
        assert_eq!(normalize_schedule("*/5 * * * *").unwrap(), "0 */5 * * * *");
        assert_eq!(normalize_schedule("30 0 * * * *").unwrap(), "30 0 * * * *");
        assert!(normalize_schedule("* * *").is_err());
        assert!(minimal_builder().schedule("not a cron").build().is_err());
    }

    #[test]
    fn test_timezone_validation() {
        let config = minimal_builder().timezone("Europe/Paris").build().unwrap();
        assert_eq!(config.timezone, chrono_tz::Europe::Paris);

        let err = minimal_builder().timezone("Mars/Olympus").build().unwrap_err();
        assert!(err.to_string().contains("Unknown timezone"));
    }

    #[test]
    fn test_invalid_webhook_rejected() {
        let err = minimal_builder().webhook_url("not a url").build().unwrap_err();
        assert!(err.to_string().contains("Webhook URL"));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let err = AppConfig::builder()
            .envato_token("token")
            .object_store(ObjectStoreSettings::new("ftp://host", "b", "a", "s"))
            .record_store(sqlite())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http or https"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = minimal_builder()
            .webhook_url("https://discord.com/api/webhooks/1/abc")
            .build()
            .unwrap();
        let debug = format!("{:?}", config);

        assert!(!debug.contains("wJalrXUtnFEMI"));
        assert!(!debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("webhooks/1/abc"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_from_lookup_with_sqlite() {
        let mut pairs = BASE_ENV.to_vec();
        pairs.extend([
            ("CONCURRENCY", "4"),
            ("CRON", "*/10 * * * *"),
            ("TZ", "America/New_York"),
            ("LOG_LEVEL", "debug"),
            ("LOG_FORMAT", "json"),
        ]);
        let config = AppConfig::from_lookup(env(&pairs)).unwrap();

        assert_eq!(config.concurrency, 4);
        assert_eq!(config.schedule, "0 */10 * * * *");
        assert_eq!(config.timezone, chrono_tz::America::New_York);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert!(matches!(
            config.record_store,
            RecordStoreSettings::Sqlite { ref path } if path == &PathBuf::from("/tmp/vault.db")
        ));
    }

    #[test]
    fn test_from_lookup_prefers_d1_when_configured() {
        let mut pairs = BASE_ENV.to_vec();
        pairs.extend([
            ("CF_API_KEY", "cf-token"),
            ("CF_ACCOUNT_ID", "acct"),
            ("CF_D1_ID", "db"),
            ("CF_D1_TABLE", "purchases"),
        ]);
        let config = AppConfig::from_lookup(env(&pairs)).unwrap();

        match config.record_store {
            RecordStoreSettings::D1(d1) => {
                assert_eq!(d1.account_id, "acct");
                assert_eq!(d1.database_id, "db");
                assert_eq!(d1.table, "purchases");
                assert_eq!(d1.api_token.expose(), "cf-token");
                assert_eq!(d1.api_base, DEFAULT_CLOUDFLARE_API_BASE);
            }
            other => panic!("expected D1 settings, got {:?}", other),
        }
    }

    #[test]
    fn test_from_lookup_partial_d1_is_error() {
        let mut pairs = BASE_ENV.to_vec();
        pairs.push(("CF_ACCOUNT_ID", "acct"));
        let err = AppConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("CF_API_KEY"));
    }

    #[test]
    fn test_from_lookup_missing_token() {
        let pairs: Vec<_> = BASE_ENV
            .iter()
            .copied()
            .filter(|(k, _)| *k != "ENVATO_PERSONAL_TOKEN")
            .collect();
        let err = AppConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("ENVATO_PERSONAL_TOKEN"));
    }

    #[test]
    fn test_from_lookup_rejects_non_numeric_concurrency() {
        let mut pairs = BASE_ENV.to_vec();
        pairs.push(("CONCURRENCY", "many"));
        let err = AppConfig::from_lookup(env(&pairs)).unwrap_err();
        assert!(err.to_string().contains("CONCURRENCY"));
    }

    #[test]
    fn test_from_lookup_treats_blank_as_unset() {
        let mut pairs = BASE_ENV.to_vec();
        pairs.push(("DISCORD_WEBHOOK_URL", "   "));
        let config = AppConfig::from_lookup(env(&pairs)).unwrap();
        assert!(config.webhook_url.is_none());
    }

    #[test]
    fn test_load_env_file_missing_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!load_env_file(&dir.path().join(".env")).unwrap());
    }

    #[test]
    fn test_load_env_file_keeps_existing_variables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "PV_ENV_FILE_TEST_FRESH=from-file\nPV_ENV_FILE_TEST_PRESET=from-file\n",
        )
        .unwrap();
        std::env::set_var("PV_ENV_FILE_TEST_PRESET", "from-process");

        assert!(load_env_file(&path).unwrap());
        assert_eq!(std::env::var("PV_ENV_FILE_TEST_FRESH").unwrap(), "from-file");
        assert_eq!(
            std::env::var("PV_ENV_FILE_TEST_PRESET").unwrap(),
            "from-process"
        );
    }

    #[test]
    fn test_load_env_file_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "PV_ENV_FILE_TEST_BROKEN='unterminated\n").unwrap();

        let err = load_env_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
