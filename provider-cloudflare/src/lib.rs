//! # Cloudflare Provider
//!
//! Object storage and record storage on Cloudflare.
//!
//! ## Overview
//!
//! This module provides:
//! - `R2ObjectStore`: `ObjectStore` over the S3-compatible R2 API, with AWS
//!   Signature V4 request signing and streamed uploads
//! - `D1RecordStore`: `RecordStore` over the D1 HTTP query API
//!
//! Both adapters talk through the `HttpClient` bridge and report failures as
//! classified `BridgeError`s.

pub mod d1;
pub mod error;
pub mod r2;
pub mod sigv4;

pub use d1::{D1Config, D1RecordStore};
pub use error::{CloudflareError, Result};
pub use r2::{R2Config, R2ObjectStore};
pub use sigv4::SigV4Signer;
