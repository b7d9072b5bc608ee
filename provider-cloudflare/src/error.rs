//! Error types for the Cloudflare provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Cloudflare provider errors
#[derive(Error, Debug)]
pub enum CloudflareError {
    /// Adapter settings are unusable
    #[error("Invalid Cloudflare configuration: {0}")]
    InvalidConfig(String),

    /// R2 answered a request with a non-success status
    #[error("R2 request failed (status {status_code}): {message}")]
    ObjectStore { status_code: u16, message: String },

    /// D1 API returned a transport-level error status
    #[error("D1 API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// D1 accepted the request but reported the query as failed
    #[error("D1 query failed: {0}")]
    QueryFailed(String),

    /// Failed to parse API response
    #[error("Failed to parse Cloudflare response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Cloudflare operations
pub type Result<T> = std::result::Result<T, CloudflareError>;

impl From<CloudflareError> for BridgeError {
    fn from(error: CloudflareError) -> Self {
        match error {
            CloudflareError::InvalidConfig(msg) => BridgeError::NotAvailable(msg),
            CloudflareError::ObjectStore {
                status_code,
                message,
            } => BridgeError::from_status(status_code, None, message),
            CloudflareError::ApiError {
                status_code,
                message,
            } => BridgeError::from_status(status_code, None, message),
            CloudflareError::QueryFailed(msg) => BridgeError::DatabaseError(msg),
            CloudflareError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            CloudflareError::BridgeError(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let bridge: BridgeError = CloudflareError::ObjectStore {
            status_code: 403,
            message: "SignatureDoesNotMatch".into(),
        }
        .into();
        assert!(bridge.is_unauthorized());

        let bridge: BridgeError = CloudflareError::QueryFailed("no such table".into()).into();
        assert!(matches!(bridge, BridgeError::DatabaseError(_)));
    }
}
