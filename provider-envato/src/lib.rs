//! # Envato Market Provider
//!
//! Implements `CatalogSource` for the Envato Market API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Paged listing of every buyer purchase
//! - Catalog item lookup (name, site, classification, previews)
//! - Signed download URL acquisition
//! - Status classification (401/403, 404, 429) into `BridgeError` variants

pub mod connector;
pub mod error;
pub mod types;

pub use connector::EnvatoConnector;
pub use error::{EnvatoError, Result};
