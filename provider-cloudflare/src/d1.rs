//! D1 record store
//!
//! Implements `RecordStore` over the Cloudflare D1 HTTP query API:
//!
//! ```text
//! POST {api_base}/accounts/{account_id}/d1/database/{database_id}/query
//! { "sql": "...", "params": [...] }
//! ```
//!
//! The table name cannot be bound as a parameter, so it is validated as a
//! plain SQL identifier when the store is constructed and interpolated after.

use async_trait::async_trait;
use bridge_traits::catalog::ItemId;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::record::{Record, RecordStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::{CloudflareError, Result};

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_IDENTIFIER_LEN: usize = 64;

/// Settings for [`D1RecordStore`]
#[derive(Clone)]
pub struct D1Config {
    pub api_base: String,
    pub api_token: String,
    pub account_id: String,
    pub database_id: String,
    pub table: String,
}

impl std::fmt::Debug for D1Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("D1Config")
            .field("api_base", &self.api_base)
            .field("api_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .field("database_id", &self.database_id)
            .field("table", &self.table)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    sql: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default = "Option::default")]
    result: Option<Vec<QueryResult<T>>>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: Option<i64>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct QueryResult<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
    #[serde(default = "default_true")]
    success: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct RecordRow {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    updated_at: String,
}

impl From<RecordRow> for Record {
    fn from(row: RecordRow) -> Self {
        Record {
            id: ItemId(row.id),
            name: row.name.unwrap_or_default(),
            url: row.url.unwrap_or_default(),
            updated_at: row.updated_at,
        }
    }
}

/// Record store backed by a D1 table
pub struct D1RecordStore {
    http_client: Arc<dyn HttpClient>,
    query_url: String,
    api_token: String,
    table: String,
}

impl D1RecordStore {
    /// Create a record store
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::InvalidConfig`] when the table is not a
    /// plain identifier or an id is blank.
    pub fn new(http_client: Arc<dyn HttpClient>, config: D1Config) -> Result<Self> {
        validate_identifier(&config.table)?;
        for (field, value) in [
            ("account id", &config.account_id),
            ("database id", &config.database_id),
            ("api token", &config.api_token),
        ] {
            if value.trim().is_empty() {
                return Err(CloudflareError::InvalidConfig(format!("D1 {} is empty", field)));
            }
        }

        let query_url = format!(
            "{}/accounts/{}/d1/database/{}/query",
            config.api_base.trim_end_matches('/'),
            config.account_id.trim(),
            config.database_id.trim()
        );

        Ok(Self {
            http_client,
            query_url,
            api_token: config.api_token,
            table: config.table,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the records table if it does not exist
    pub async fn initialize(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY NOT NULL, name TEXT, url TEXT, updated_at TEXT NOT NULL)",
            self.table
        );
        self.query::<Value>(&sql, Vec::new()).await.map(|_| ())
    }

    /// Run one statement and return the rows of its first result set
    #[instrument(skip(self, params), fields(table = %self.table))]
    async fn query<T: DeserializeOwned>(&self, sql: &str, params: Vec<Value>) -> Result<Vec<T>> {
        let request = HttpRequest::new(HttpMethod::Post, self.query_url.as_str())
            .bearer_token(self.api_token.as_str())
            .timeout(QUERY_TIMEOUT)
            .json(&QueryBody { sql, params })?;

        let response = self.http_client.execute(request).await?;
        let envelope: Option<Envelope<T>> = serde_json::from_slice(&response.body).ok();

        if !response.is_success() {
            let message = envelope
                .map(|e| join_errors(&e.errors))
                .unwrap_or_else(|| String::from_utf8_lossy(&response.body).into_owned());
            warn!(status = response.status, "D1 request failed");
            return Err(CloudflareError::ApiError {
                status_code: response.status,
                message,
            });
        }

        let envelope = envelope.ok_or_else(|| {
            CloudflareError::ParseError("D1 response is not a query envelope".to_string())
        })?;
        if !envelope.success {
            return Err(CloudflareError::QueryFailed(join_errors(&envelope.errors)));
        }

        let first = envelope
            .result
            .and_then(|results| results.into_iter().next())
            .ok_or_else(|| CloudflareError::ParseError("D1 response has no result set".to_string()))?;
        if !first.success {
            return Err(CloudflareError::QueryFailed("statement reported failure".to_string()));
        }

        debug!(rows = first.results.len(), "D1 query succeeded");
        Ok(first.results)
    }
}

fn join_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "no error details".to_string();
    }
    errors
        .iter()
        .map(|e| match e.code {
            Some(code) => format!("[{}] {}", code, e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*` up to 64 characters
fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_start || !valid_rest || name.len() > MAX_IDENTIFIER_LEN {
        return Err(CloudflareError::InvalidConfig(format!(
            "D1 table name '{}' must be a plain SQL identifier",
            name
        )));
    }
    Ok(())
}

#[async_trait]
impl RecordStore for D1RecordStore {
    async fn list_all(&self) -> BridgeResult<Vec<Record>> {
        let sql = format!("SELECT id, name, url, updated_at FROM {}", self.table);
        let rows: Vec<RecordRow> = self.query(&sql, Vec::new()).await?;
        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn upsert(&self, record: &Record) -> BridgeResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, name, url, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, url = excluded.url, updated_at = excluded.updated_at",
            self.table
        );
        let params = vec![
            Value::from(record.id.get()),
            Value::from(record.name.as_str()),
            Value::from(record.url.as_str()),
            Value::from(record.updated_at.as_str()),
        ];
        self.query::<Value>(&sql, params).await?;
        Ok(())
    }
}
