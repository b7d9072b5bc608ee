//! # Desktop Bridge Implementations
//!
//! Default implementations of the transport and file system bridge traits
//! for native hosts (Linux, macOS, Windows, containers).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` (rustls, streamed bodies both ways)
//! - `FileSystemAccess` using `tokio::fs`
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, TokioFileSystem};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = Arc::new(ReqwestHttpClient::new()?);
//!     let fs = Arc::new(TokioFileSystem::new());
//!
//!     // Hand both to the service wiring
//!     Ok(())
//! }
//! ```

mod filesystem;
mod http;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
