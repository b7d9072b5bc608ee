//! Workspace placeholder crate.
//!
//! This crate exists to expose the `desktop-shims` feature that maps to
//! `core-service`. Hosts can depend on `purchase-vault-workspace` and enable
//! the documented features without wiring each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service;
