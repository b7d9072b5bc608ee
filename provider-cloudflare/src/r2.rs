//! R2 object store
//!
//! Implements `ObjectStore` over the S3-compatible API using path-style URLs
//! (`{endpoint}/{bucket}/{key}`). Uploads stream the body with an explicit
//! `Content-Length`, which R2 requires for unsigned payloads.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::object_store::ObjectStore;
use bridge_traits::time::{Clock, SystemClock};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

use crate::error::{CloudflareError, Result};
use crate::sigv4::{uri_encode, SigV4Signer, UNSIGNED_PAYLOAD};

/// Region R2 expects in signatures
pub const R2_REGION: &str = "auto";

const S3_SERVICE: &str = "s3";
const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Settings for [`R2ObjectStore`]
#[derive(Clone)]
pub struct R2Config {
    /// Account endpoint, e.g. `https://<account>.r2.cloudflarestorage.com`
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

impl std::fmt::Debug for R2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Config")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"[REDACTED]")
            .field("region", &self.region)
            .finish()
    }
}

/// S3-compatible object store on Cloudflare R2
pub struct R2ObjectStore {
    http_client: Arc<dyn HttpClient>,
    endpoint: Url,
    bucket: String,
    signer: SigV4Signer,
    clock: Arc<dyn Clock>,
}

impl R2ObjectStore {
    /// Create an object store
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::InvalidConfig`] when the endpoint is not an
    /// absolute http(s) URL or the bucket name is empty.
    pub fn new(http_client: Arc<dyn HttpClient>, config: R2Config) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim()).map_err(|e| {
            CloudflareError::InvalidConfig(format!("R2 endpoint '{}': {}", config.endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
            return Err(CloudflareError::InvalidConfig(format!(
                "R2 endpoint '{}' must be an http(s) URL with a host",
                config.endpoint
            )));
        }
        let bucket = config.bucket.trim().to_string();
        if bucket.is_empty() || bucket.contains('/') {
            return Err(CloudflareError::InvalidConfig(format!(
                "R2 bucket '{}' is not a valid bucket name",
                config.bucket
            )));
        }

        Ok(Self {
            http_client,
            endpoint,
            bucket,
            signer: SigV4Signer::new(
                config.access_key,
                config.secret_key,
                config.region,
                S3_SERVICE,
            ),
            clock: Arc::new(SystemClock),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn host(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Encoded path and full URL for `key`
    fn object_location(&self, key: &str) -> (String, String) {
        let base_path = self.endpoint.path().trim_end_matches('/');
        let canonical_uri = format!(
            "{}/{}/{}",
            base_path,
            uri_encode(&self.bucket, false),
            uri_encode(key, true)
        );
        let url = format!(
            "{}://{}{}",
            self.endpoint.scheme(),
            self.host(),
            canonical_uri
        );
        (canonical_uri, url)
    }

    fn signed_request(&self, method: HttpMethod, key: &str) -> Result<HttpRequest> {
        let (canonical_uri, url) = self.object_location(key);
        let signed = self.signer.sign(
            method.as_str(),
            &self.host(),
            &canonical_uri,
            "",
            &[],
            UNSIGNED_PAYLOAD,
            self.clock.now(),
        )?;

        let mut request = HttpRequest::new(method, url);
        for (name, value) in signed.into_pairs() {
            request = request.header(name, value);
        }
        Ok(request)
    }

    fn classify(response: &HttpResponse, key: &str) -> BridgeError {
        let body = String::from_utf8_lossy(&response.body);
        BridgeError::from_status(
            response.status,
            response.retry_after_secs(),
            format!("R2 rejected {}: {}", key, s3_error_code(&body).unwrap_or("no error code")),
        )
    }
}

/// Extract `<Code>…</Code>` from an S3 XML error body
fn s3_error_code(body: &str) -> Option<&str> {
    let start = body.find("<Code>")? + "<Code>".len();
    let end = body[start..].find("</Code>")? + start;
    Some(&body[start..end])
}

#[async_trait]
impl ObjectStore for R2ObjectStore {
    #[instrument(skip(self, body), fields(bucket = %self.bucket))]
    async fn put(&self, key: &str, body: ByteStream, content_length: u64) -> BridgeResult<()> {
        let request = self
            .signed_request(HttpMethod::Put, key)?
            .header("Content-Type", ARCHIVE_CONTENT_TYPE);

        debug!(key = %key, bytes = content_length, "Uploading object");
        let response = self
            .http_client
            .upload_stream(request, body, content_length)
            .await?;

        if !response.is_success() {
            return Err(Self::classify(&response, key));
        }

        info!(key = %key, bytes = content_length, "Object stored");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn exists(&self, key: &str) -> BridgeResult<bool> {
        let request = self.signed_request(HttpMethod::Head, key)?;
        let response = self.http_client.execute(request).await?;

        match response.status {
            200..=299 => Ok(true),
            404 => Ok(false),
            _ => Err(Self::classify(&response, key)),
        }
    }
}
