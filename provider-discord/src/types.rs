//! Discord webhook payload types
//!
//! See: https://discord.com/developers/docs/resources/webhook#execute-webhook

use bridge_traits::notify::SyncNotification;
use serde::Serialize;

/// Discord rejects embeds with more fields than this
const MAX_FIELDS: usize = 25;

#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    /// ISO 8601
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

impl From<&SyncNotification> for Embed {
    fn from(notification: &SyncNotification) -> Self {
        Embed {
            title: notification.title.clone(),
            description: notification.description.clone(),
            url: notification.url.clone(),
            color: notification.color,
            fields: notification
                .fields
                .iter()
                .take(MAX_FIELDS)
                .map(|f| EmbedField {
                    name: f.name.clone(),
                    value: f.value.clone(),
                    inline: f.inline,
                })
                .collect(),
            thumbnail: notification
                .thumbnail_url
                .as_ref()
                .map(|url| EmbedImage { url: url.clone() }),
            timestamp: notification.timestamp.to_rfc3339(),
        }
    }
}

impl From<&SyncNotification> for WebhookPayload {
    fn from(notification: &SyncNotification) -> Self {
        WebhookPayload {
            embeds: vec![Embed::from(notification)],
        }
    }
}
