//! Envato Market API connector implementation
//!
//! Implements the `CatalogSource` trait for Envato Market API v3.

use async_trait::async_trait;
use bridge_traits::catalog::{CatalogSource, ItemId, ItemMetadata, Purchase};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::{EnvatoError, Result};
use crate::types::{CatalogItem, DownloadResponse, ListPurchasesResponse};

/// Envato Market API base URL
pub const ENVATO_API_BASE: &str = "https://api.envato.com/v3/market";

/// Hard stop for purchase pagination
const MAX_PAGES: u32 = 1000;

/// Per-request timeout for JSON endpoints
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body excerpt carried into error messages
const ERROR_BODY_LIMIT: usize = 200;

/// Envato Market API connector
///
/// Implements `CatalogSource` using a personal token sent as a bearer
/// credential. No request is retried; throttling surfaces as
/// `BridgeError::RateLimited` and the caller decides what to do.
///
/// # Example
///
/// ```ignore
/// use provider_envato::EnvatoConnector;
/// use bridge_traits::catalog::CatalogSource;
///
/// let connector = EnvatoConnector::new(http_client, token);
/// let purchases = connector.list_purchases().await?;
/// ```
pub struct EnvatoConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Personal token with the `purchase:list` and `purchase:download` scopes
    token: String,

    api_base: String,
}

impl EnvatoConnector {
    pub fn new(http_client: Arc<dyn HttpClient>, token: impl Into<String>) -> Self {
        Self {
            http_client,
            token: token.into(),
            api_base: ENVATO_API_BASE.to_string(),
        }
    }

    /// Point the connector at a different API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        let mut url = Url::parse(&format!("{}{}", self.api_base, path))
            .map_err(|e| EnvatoError::ParseError(format!("invalid API URL: {}", e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url.into())
    }

    /// GET a JSON endpoint and classify non-2xx statuses
    #[instrument(skip(self), fields(url = %url))]
    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let request = HttpRequest::new(HttpMethod::Get, url)
            .bearer_token(self.token.as_str())
            .header("Accept", "application/json")
            .timeout(REQUEST_TIMEOUT);

        let response = self.http_client.execute(request).await?;
        let response = Self::check_status(response)?;
        debug!("API request succeeded: status={}", response.status);

        serde_json::from_slice(&response.body).map_err(|e| EnvatoError::ParseError(e.to_string()))
    }

    fn check_status(response: HttpResponse) -> Result<HttpResponse> {
        if response.is_success() {
            return Ok(response);
        }

        let status = response.status;
        let body = String::from_utf8_lossy(&response.body);
        let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        warn!("API request failed: status={}", status);

        Err(match status {
            401 | 403 => EnvatoError::Unauthorized(excerpt),
            429 => EnvatoError::RateLimited {
                retry_after_secs: response.retry_after_secs(),
            },
            _ => EnvatoError::ApiError {
                status_code: status,
                message: excerpt,
            },
        })
    }

    async fn fetch_item(&self, item_id: ItemId) -> Result<CatalogItem> {
        let url = self.endpoint("/catalog/item", &[("id", item_id.to_string())])?;
        match self.get_json::<CatalogItem>(url).await {
            Err(EnvatoError::ApiError {
                status_code: 404, ..
            }) => Err(EnvatoError::ItemNotFound { item_id }),
            other => other,
        }
    }

    async fn fetch_all_purchases(&self) -> Result<Vec<Purchase>> {
        let mut purchases = Vec::new();

        for page in 1..=MAX_PAGES {
            let url = self.endpoint("/buyer/list-purchases", &[("page", page.to_string())])?;
            let response: ListPurchasesResponse = self.get_json(url).await?;

            if response.results.is_empty() {
                break;
            }
            purchases.extend(response.results.into_iter().map(|p| p.item.into_purchase()));

            if let Some(count) = response.count {
                if purchases.len() as u64 >= count {
                    break;
                }
            }
            if page == MAX_PAGES {
                warn!(pages = MAX_PAGES, "Stopped listing purchases at page limit");
            }
        }

        Ok(purchases)
    }
}

#[async_trait]
impl CatalogSource for EnvatoConnector {
    #[instrument(skip(self))]
    async fn list_purchases(&self) -> bridge_traits::error::Result<Vec<Purchase>> {
        let purchases = self.fetch_all_purchases().await?;
        info!("Retrieved {} purchases from Envato", purchases.len());
        Ok(purchases)
    }

    #[instrument(skip(self))]
    async fn get_item_metadata(&self, item_id: ItemId) -> bridge_traits::error::Result<ItemMetadata> {
        let item = self.fetch_item(item_id).await?;
        Ok(item.into_metadata())
    }

    #[instrument(skip(self))]
    async fn get_download_location(&self, item_id: ItemId) -> bridge_traits::error::Result<String> {
        let url = self.endpoint("/buyer/download", &[("item_id", item_id.to_string())])?;
        let response: DownloadResponse = self.get_json(url).await?;
        Ok(response.download_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::BridgeError;
    use bridge_traits::http::ByteStream;
    use bytes::Bytes;
    use mockall::{mock, Sequence};
    use std::collections::HashMap;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
            async fn download_stream(&self, url: String) -> bridge_traits::error::Result<ByteStream>;
            async fn upload_stream(
                &self,
                request: HttpRequest,
                body: ByteStream,
                content_length: u64,
            ) -> bridge_traits::error::Result<HttpResponse>;
        }
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn item_json(id: u64, updated_at: &str) -> String {
        format!(
            r#"{{
                "id": {id},
                "name": "Item {id}",
                "url": "https://themeforest.net/item/item-{id}/{id}",
                "site": "themeforest.net",
                "classification": "wordpress/creative",
                "updated_at": "{updated_at}",
                "previews": {{
                    "icon_with_landscape_preview": {{ "landscape_url": "https://s3.envato.com/{id}.jpg" }}
                }}
            }}"#
        )
    }

    #[tokio::test]
    async fn test_list_purchases_pages_until_count() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.ends_with("/buyer/list-purchases?page=1"));
                assert_eq!(
                    req.headers.get("Authorization").map(String::as_str),
                    Some("Bearer secret-token")
                );
                Ok(json_response(
                    200,
                    &format!(
                        r#"{{"count": 3, "results": [{{"item": {}}}, {{"item": {}}}]}}"#,
                        item_json(1, "2023-01-01T00:00:00Z"),
                        item_json(2, "2023-01-02T00:00:00Z")
                    ),
                ))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|req| {
                assert!(req.url.ends_with("page=2"));
                Ok(json_response(
                    200,
                    &format!(
                        r#"{{"count": 3, "results": [{{"item": {}}}]}}"#,
                        item_json(3, "2023-01-03T00:00:00Z")
                    ),
                ))
            });

        let connector = EnvatoConnector::new(Arc::new(mock_http), "secret-token");
        let purchases = connector.list_purchases().await.unwrap();

        assert_eq!(purchases.len(), 3);
        assert_eq!(purchases[0].item_id, ItemId(1));
        assert_eq!(purchases[2].updated_at, "2023-01-03T00:00:00Z");
        assert_eq!(
            purchases[0].preview_url.as_deref(),
            Some("https://s3.envato.com/1.jpg")
        );
    }

    #[tokio::test]
    async fn test_list_purchases_stops_on_empty_page() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();

        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(json_response(
                    200,
                    &format!(r#"{{"results": [{{"item": {}}}]}}"#, item_json(7, "t")),
                ))
            });
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(200, r#"{"results": []}"#)));

        let connector = EnvatoConnector::new(Arc::new(mock_http), "token");
        let purchases = connector.list_purchases().await.unwrap();

        assert_eq!(purchases.len(), 1);
    }

    #[tokio::test]
    async fn test_get_item_metadata_success() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with("/catalog/item?id=42"));
            Ok(json_response(200, &item_json(42, "2023-01-01T00:00:00Z")))
        });

        let connector = EnvatoConnector::new(Arc::new(mock_http), "token");
        let metadata = connector.get_item_metadata(ItemId(42)).await.unwrap();

        assert_eq!(metadata.id, ItemId(42));
        assert_eq!(metadata.site, "themeforest.net");
        assert_eq!(metadata.classification, "wordpress/creative");
    }

    #[tokio::test]
    async fn test_get_item_metadata_not_found() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(404, r#"{"error": "not found"}"#)));

        let connector = EnvatoConnector::new(Arc::new(mock_http), "token");
        let err = connector.get_item_metadata(ItemId(42)).await.unwrap_err();

        assert!(matches!(err, BridgeError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_download_location() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.ends_with("/buyer/download?item_id=42"));
            Ok(json_response(
                200,
                r#"{"download_url": "https://marketplace-downloads.example/42.zip?sig=abc"}"#,
            ))
        });

        let connector = EnvatoConnector::new(Arc::new(mock_http), "token");
        let location = connector.get_download_location(ItemId(42)).await.unwrap();

        assert_eq!(location, "https://marketplace-downloads.example/42.zip?sig=abc");
    }

    #[tokio::test]
    async fn test_download_location_classifies_auth_and_rate_limit() {
        let mut mock_http = MockHttpClient::new();
        let mut seq = Sequence::new();
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(json_response(403, r#"{"error": "forbidden"}"#)));
        mock_http
            .expect_execute()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                let mut response = json_response(429, "");
                response
                    .headers
                    .insert("Retry-After".to_string(), "120".to_string());
                Ok(response)
            });

        let connector = EnvatoConnector::new(Arc::new(mock_http), "token");

        let err = connector.get_download_location(ItemId(1)).await.unwrap_err();
        assert!(err.is_unauthorized());

        let err = connector.get_download_location(ItemId(1)).await.unwrap_err();
        assert!(matches!(
            err,
            BridgeError::RateLimited {
                retry_after_secs: Some(120)
            }
        ));
    }

    #[tokio::test]
    async fn test_custom_api_base() {
        let mut mock_http = MockHttpClient::new();
        mock_http.expect_execute().times(1).returning(|req| {
            assert!(req.url.starts_with("http://localhost:8080/v3/market/buyer/download"));
            Ok(json_response(200, r#"{"download_url": "x"}"#))
        });

        let connector = EnvatoConnector::new(Arc::new(mock_http), "token")
            .with_api_base("http://localhost:8080/v3/market/");
        connector.get_download_location(ItemId(1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_json_is_parse_error() {
        let mut mock_http = MockHttpClient::new();
        mock_http
            .expect_execute()
            .times(1)
            .returning(|_| Ok(json_response(200, "<html>")));

        let connector = EnvatoConnector::new(Arc::new(mock_http), "token");
        let err = connector.get_download_location(ItemId(1)).await.unwrap_err();

        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }
}
