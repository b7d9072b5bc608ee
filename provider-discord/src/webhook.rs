//! Discord webhook notifier

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bridge_traits::notify::{Notifier, SyncNotification};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{DiscordError, Result};
use crate::types::WebhookPayload;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(15);
const ERROR_BODY_LIMIT: usize = 200;

/// Posts each notification as a single embed
///
/// Delivery is attempted once. Discord answers `204 No Content` on success;
/// any other non-2xx status is an error.
pub struct DiscordWebhookNotifier {
    http_client: Arc<dyn HttpClient>,
    webhook_url: String,
}

impl std::fmt::Debug for DiscordWebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL path embeds the webhook token
        f.debug_struct("DiscordWebhookNotifier")
            .field("webhook_url", &"[REDACTED]")
            .finish()
    }
}

impl DiscordWebhookNotifier {
    /// # Errors
    ///
    /// Returns [`DiscordError::InvalidWebhook`] unless `webhook_url` is an
    /// absolute http(s) URL.
    pub fn new(http_client: Arc<dyn HttpClient>, webhook_url: impl Into<String>) -> Result<Self> {
        let webhook_url = webhook_url.into();
        let parsed = Url::parse(webhook_url.trim())
            .map_err(|e| DiscordError::InvalidWebhook(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DiscordError::InvalidWebhook(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }

        Ok(Self {
            http_client,
            webhook_url: parsed.into(),
        })
    }

    async fn post(&self, notification: &SyncNotification) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Post, self.webhook_url.as_str())
            .timeout(WEBHOOK_TIMEOUT)
            .json(&WebhookPayload::from(notification))?;

        let response = self.http_client.execute(request).await?;
        if !response.is_success() {
            let body = String::from_utf8_lossy(&response.body);
            return Err(DiscordError::Rejected {
                status_code: response.status,
                retry_after_secs: response.retry_after_secs(),
                message: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        debug!(status = response.status, "Webhook delivered");
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordWebhookNotifier {
    #[instrument(skip(self, notification), fields(title = %notification.title))]
    async fn send(&self, notification: &SyncNotification) -> BridgeResult<()> {
        self.post(notification).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::{ByteStream, HttpResponse};
    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn download_stream(&self, url: String) -> BridgeResult<ByteStream>;
            async fn upload_stream(
                &self,
                request: HttpRequest,
                body: ByteStream,
                content_length: u64,
            ) -> BridgeResult<HttpResponse>;
        }
    }

    const WEBHOOK: &str = "https://discord.com/api/webhooks/123/abc";

    fn notification() -> SyncNotification {
        SyncNotification {
            title: "🔄 Update archived".to_string(),
            description: "A new version of **Avada** was archived.".to_string(),
            url: "https://themeforest.net/item/avada/42".to_string(),
            color: 15844367,
            fields: Vec::new(),
            thumbnail_url: Some("https://s3.envato.com/42.jpg".to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    #[tokio::test]
    async fn test_posts_embed() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert_eq!(req.method, HttpMethod::Post);
            assert_eq!(req.url, WEBHOOK);
            let body: serde_json::Value =
                serde_json::from_slice(req.body.as_ref().unwrap()).unwrap();
            assert_eq!(body["embeds"][0]["color"], 15844367);
            assert_eq!(
                body["embeds"][0]["thumbnail"]["url"],
                "https://s3.envato.com/42.jpg"
            );
            Ok(response(204))
        });

        let notifier = DiscordWebhookNotifier::new(Arc::new(mock_http), WEBHOOK).unwrap();
        notifier.send(&notification()).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_is_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(response(400)));

        let notifier = DiscordWebhookNotifier::new(Arc::new(mock_http), WEBHOOK).unwrap();
        let err = notifier.send(&notification()).await.unwrap_err();

        assert!(matches!(err, BridgeError::Http { status: 400, .. }));
    }

    #[test]
    fn test_rejects_invalid_webhook() {
        assert!(DiscordWebhookNotifier::new(Arc::new(MockHttpClient::new()), "nope").is_err());
        assert!(
            DiscordWebhookNotifier::new(Arc::new(MockHttpClient::new()), "ftp://x/y").is_err()
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let notifier =
            DiscordWebhookNotifier::new(Arc::new(MockHttpClient::new()), WEBHOOK).unwrap();
        assert!(!format!("{:?}", notifier).contains("abc"));
    }
}
