//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the purchase archiver:
//! - Logging and tracing infrastructure
//! - Configuration loading and validation
//!
//! ## Overview
//!
//! Every other crate in the workspace relies on the logging conventions set
//! up here, and the service binary builds its whole dependency graph from the
//! [`AppConfig`](config::AppConfig) this crate produces.

pub mod config;
pub mod error;
pub mod logging;

pub use config::AppConfig;
pub use error::{Error, Result};
