//! # Clamgate
//!
//! An async client for clamd-compatible antivirus daemons, with request
//! traversal for scanning every upload and parameter of an HTTP request.
//!
//! ## Overview
//!
//! Clamgate speaks the daemon's `IDSESSION`/`INSTREAM` socket protocol and
//! lets you:
//!
//! - Scan byte buffers and uploaded files over one long-lived session
//! - Walk nested upload and parameter trees, stopping at the first detection
//! - Choose fail-open or fail-closed handling when the daemon is unreachable
//! - Route alerts to a host-supplied sink
//! - Emit structured audit events through `tracing`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use clamgate::{ClamdConfig, ParamNode, RequestScanner, ScanClient, UploadNode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClamdConfig::new()
//!         .with_enabled(true)
//!         .with_endpoint("unix:///var/run/clamav/clamd.ctl");
//!
//!     let mut scanner = RequestScanner::new(ScanClient::from_config(config));
//!
//!     let uploads = UploadNode::file("/tmp/php1234");
//!     let params: ParamNode = [("comment", "hello")].into_iter().collect();
//!
//!     let result = scanner.scan_request(&uploads, &params).await;
//!     if result.is_infected() {
//!         println!("Blocked: {}", result);
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: Scan results, errors, and the scanner/config traits
//! - **Backends**: The clamd client (codec, connection, config) and a mock
//! - **Request**: Upload/parameter trees and the request scanner
//! - **Audit**: Structured audit events and alert sinks

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod backends;
pub mod core;
pub mod request;

// Re-export commonly used types at the crate root
pub use crate::audit::{AlertSeverity, AlertSink, MemoryAlertSink, TracingAlertSink};
pub use crate::backends::{ClamdConfig, MockScanner, ScanClient};
pub use crate::core::{
    ConfigError, ConfigProvider, ContentScanner, FailurePolicy, ScanResult, TransportError,
};
pub use crate::request::{ParamNode, RequestScanner, ScanLeaf, UploadNode, UploadedFile};

/// Prelude module for convenient imports.
///
/// ```rust
/// use clamgate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::audit::{AlertSeverity, AlertSink};
    pub use crate::backends::{ClamdConfig, ScanClient};
    pub use crate::core::{ConfigProvider, ContentScanner, FailurePolicy, ScanResult};
    pub use crate::request::{ParamNode, RequestScanner, UploadNode};
}
