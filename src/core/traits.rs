//! Core traits for the clamgate library.
//!
//! This module defines the seams between the scanning core and its host:
//! the `ContentScanner` trait that request traversal drives, and the
//! `ConfigProvider` trait the client reads its settings from.

use crate::core::result::{FailurePolicy, ScanResult};

use async_trait::async_trait;
use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

/// Default wait for each read of the daemon's response.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default limit on opening the daemon socket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Scans individual leaves of a request.
///
/// [`ScanClient`](crate::backends::ScanClient) is the production
/// implementation; [`MockScanner`](crate::backends::MockScanner) stands in
/// for it in tests.
///
/// # Implementation Notes
///
/// - Methods take `&mut self`: a scanner owns a single daemon session and is
///   not meant to be shared between concurrent requests.
/// - Implementations never panic and never return errors. Every outcome,
///   including "daemon unreachable", is a [`ScanResult`].
#[async_trait]
pub trait ContentScanner: Send {
    /// Scans an inline value such as a form field.
    async fn scan_bytes(&mut self, content: &[u8]) -> ScanResult;

    /// Scans an uploaded file by path. A missing path is clean.
    async fn scan_file(&mut self, path: Option<&Path>) -> ScanResult;
}

#[async_trait]
impl<S: ContentScanner + ?Sized> ContentScanner for &mut S {
    async fn scan_bytes(&mut self, content: &[u8]) -> ScanResult {
        (**self).scan_bytes(content).await
    }

    async fn scan_file(&mut self, path: Option<&Path>) -> ScanResult {
        (**self).scan_file(path).await
    }
}

/// Settings the scan client consults.
///
/// Hosts back this with whatever configuration store they use;
/// [`ClamdConfig`](crate::backends::ClamdConfig) is a ready-made
/// implementation.
pub trait ConfigProvider: Debug + Send + Sync {
    /// Returns whether scanning is switched on.
    fn is_enabled(&self) -> bool;

    /// Returns the daemon endpoint, e.g. `unix:///var/run/clamav/clamd.ctl`
    /// or `tcp://127.0.0.1:3310`.
    fn socket_endpoint(&self) -> String;

    /// Returns the smallest inline value, in bytes, worth sending to the
    /// daemon.
    fn minimum_scan_size(&self) -> usize;

    /// Returns how long each read of the daemon's response may wait.
    fn read_timeout(&self) -> Duration {
        DEFAULT_READ_TIMEOUT
    }

    /// Returns how long opening the socket may take.
    fn connect_timeout(&self) -> Duration {
        DEFAULT_CONNECT_TIMEOUT
    }

    /// Returns how unscannable content is treated.
    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::FailOpen
    }
}
