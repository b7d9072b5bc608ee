//! Error types for the Discord provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Discord webhook errors
#[derive(Error, Debug)]
pub enum DiscordError {
    /// Webhook URL is not usable
    #[error("Invalid Discord webhook URL: {0}")]
    InvalidWebhook(String),

    /// Discord refused the message
    #[error("Discord webhook rejected the message (status {status_code}): {message}")]
    Rejected {
        status_code: u16,
        retry_after_secs: Option<u64>,
        message: String,
    },

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Discord operations
pub type Result<T> = std::result::Result<T, DiscordError>;

impl From<DiscordError> for BridgeError {
    fn from(error: DiscordError) -> Self {
        match error {
            DiscordError::InvalidWebhook(msg) => BridgeError::NotAvailable(msg),
            DiscordError::Rejected {
                status_code,
                retry_after_secs,
                message,
            } => BridgeError::from_status(status_code, retry_after_secs, message),
            DiscordError::BridgeError(e) => e,
        }
    }
}
