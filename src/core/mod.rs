//! Core types and traits for the clamgate library.
//!
//! This module provides the fundamental building blocks used throughout
//! the library:
//!
//! - [`result`] - `ScanResult` and the fail-open/fail-closed policy
//! - [`traits`] - The `ContentScanner` and `ConfigProvider` seams
//! - [`error`] - Transport and configuration errors

pub mod error;
pub mod result;
pub mod traits;

pub use error::{ConfigError, TransportError};
pub use result::{FailurePolicy, ScanResult};
pub use traits::{ConfigProvider, ContentScanner, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT};
