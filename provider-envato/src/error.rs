//! Error types for the Envato provider

use bridge_traits::catalog::ItemId;
use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Envato Market API errors
#[derive(Error, Debug)]
pub enum EnvatoError {
    /// Personal token missing, invalid or lacking the required scope
    #[error("Envato rejected the personal token: {0}")]
    Unauthorized(String),

    /// Too many requests
    #[error("Envato rate limit exceeded (retry after {retry_after_secs:?} seconds)")]
    RateLimited { retry_after_secs: Option<u64> },

    /// Unknown item id
    #[error("Envato item not found: {item_id}")]
    ItemNotFound { item_id: ItemId },

    /// API request returned an error
    #[error("Envato API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Failed to parse API response
    #[error("Failed to parse Envato response: {0}")]
    ParseError(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Envato operations
pub type Result<T> = std::result::Result<T, EnvatoError>;

impl From<EnvatoError> for BridgeError {
    fn from(error: EnvatoError) -> Self {
        match error {
            EnvatoError::Unauthorized(msg) => BridgeError::Unauthorized(msg),
            EnvatoError::RateLimited { retry_after_secs } => {
                BridgeError::RateLimited { retry_after_secs }
            }
            EnvatoError::ItemNotFound { item_id } => {
                BridgeError::NotFound(format!("Envato item {}", item_id))
            }
            EnvatoError::ApiError {
                status_code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message,
            },
            EnvatoError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            EnvatoError::BridgeError(e) => e,
        }
    }
}
