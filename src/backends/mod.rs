//! Scanning backend implementations.
//!
//! This module contains implementations of the `ContentScanner` trait.
//!
//! ## Available Backends
//!
//! - [`clamd`] - clamd-compatible daemon via the INSTREAM socket protocol
//! - [`mock`] - A mock scanner for testing
//!
//! ## Implementing a Custom Backend
//!
//! Request traversal only needs the `ContentScanner` trait:
//!
//! ```rust,ignore
//! use clamgate::core::{ContentScanner, ScanResult};
//! use async_trait::async_trait;
//! use std::path::Path;
//!
//! #[derive(Debug)]
//! pub struct MyScanner;
//!
//! #[async_trait]
//! impl ContentScanner for MyScanner {
//!     async fn scan_bytes(&mut self, content: &[u8]) -> ScanResult {
//!         todo!()
//!     }
//!
//!     async fn scan_file(&mut self, path: Option<&Path>) -> ScanResult {
//!         todo!()
//!     }
//! }
//! ```

pub mod clamd;
pub mod mock;

// Re-exports
pub use clamd::{ClamdConfig, ScanClient};
pub use mock::MockScanner;
