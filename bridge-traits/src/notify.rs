//! Notification Sink Abstraction

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name/value pair rendered alongside a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl NotificationField {
    pub fn new(name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline,
        }
    }
}

/// Human-readable sync event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncNotification {
    pub title: String,
    pub description: String,
    pub url: String,
    /// RGB color packed into an integer (`0xRRGGBB`)
    pub color: u32,
    pub fields: Vec<NotificationField>,
    pub thumbnail_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Best-effort sink for sync events
///
/// Callers log and discard errors; a failed send never undoes work that
/// already completed.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &SyncNotification) -> Result<()>;
}
