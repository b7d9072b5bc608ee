//! # Discord Provider
//!
//! Implements `Notifier` by posting embeds to a Discord webhook.

pub mod error;
pub mod types;
pub mod webhook;

pub use error::{DiscordError, Result};
pub use webhook::DiscordWebhookNotifier;
