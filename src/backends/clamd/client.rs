//! Scan client for clamd-compatible daemons.
//!
//! A [`ScanClient`] owns one daemon session. Content is streamed with the
//! INSTREAM command inside an `IDSESSION` session, so consecutive scans from
//! the same client reuse a single socket.
//!
//! # Failure handling
//!
//! - An unreachable daemon makes every scan return
//!   [`ScanResult::Unavailable`]. The client gives up after the first fault
//!   and never reconnects.
//! - An `ERROR` or unparseable response becomes
//!   [`ScanResult::EngineError`] and raises an `Error` alert.
//! - An upload that cannot be read is clean under
//!   [`FailurePolicy::FailOpen`] and an engine error under
//!   [`FailurePolicy::FailClosed`].
//!
//! # Minimum scan size
//!
//! Inline values shorter than the configured minimum are reported clean
//! without contacting the daemon. This only saves round-trips for tiny form
//! fields; it is not a security exemption and does not apply to uploaded
//! files.

use crate::audit::{self, AlertSeverity, AlertSink, ScanAuditEvent, TracingAlertSink};
use crate::backends::clamd::codec;
use crate::backends::clamd::config::ClamdConfig;
use crate::backends::clamd::connection::{Connection, Connector};
use crate::core::{ConfigProvider, ContentScanner, FailurePolicy, ScanResult, TransportError};

use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source name attached to alerts.
pub const ALERT_SOURCE: &str = "clamgate";

/// Scanning API over one daemon session.
///
/// Not meant to be shared: every scanning method takes `&mut self`. Use one
/// client per request, or guard a shared one with a mutex around the whole
/// request scan.
///
/// # Example
///
/// ```rust,ignore
/// use clamgate::backends::{ClamdConfig, ScanClient};
///
/// let config = ClamdConfig::new()
///     .with_enabled(true)
///     .with_endpoint("unix:///var/run/clamav/clamd.ctl");
///
/// let mut client = ScanClient::from_config(config);
/// let result = client.scan_bytes(b"form field value").await;
/// ```
#[derive(Debug)]
pub struct ScanClient {
    config: Arc<dyn ConfigProvider>,
    connection: Connection,
    alerts: Arc<dyn AlertSink>,
}

impl ScanClient {
    /// Creates a client reading its settings from `config`.
    ///
    /// No socket is opened until the first scan or connection test.
    pub fn new(config: Arc<dyn ConfigProvider>) -> Self {
        let connection = Connection::new(config.socket_endpoint(), config.connect_timeout());
        Self {
            config,
            connection,
            alerts: Arc::new(TracingAlertSink),
        }
    }

    /// Creates a client from a [`ClamdConfig`].
    pub fn from_config(config: ClamdConfig) -> Self {
        Self::new(Arc::new(config))
    }

    /// Sends alerts to `sink` instead of the tracing sink.
    pub fn with_alert_sink(mut self, sink: Arc<dyn AlertSink>) -> Self {
        self.alerts = sink;
        self
    }

    /// Replaces the socket connector.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connection = self.connection.with_connector(connector);
        self
    }

    /// Returns whether scanning is switched on.
    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Opens the daemon session, reporting why it failed if it did.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        self.connection.connect().await
    }

    /// Forces a connection attempt and reports whether the daemon is
    /// reachable.
    pub async fn test_connection(&mut self) -> bool {
        match self.connection.connect().await {
            Ok(()) => true,
            Err(err) => {
                tracing::debug!(error = %err, "Connection test failed");
                false
            }
        }
    }

    /// Scans an inline value.
    pub async fn scan_bytes(&mut self, content: &[u8]) -> ScanResult {
        let min_scan_size = self.minimum_scan_size();
        if content.len() < min_scan_size {
            tracing::trace!(
                size = content.len(),
                min_scan_size,
                "Content below scan threshold"
            );
            return ScanResult::Clean;
        }

        self.scan_content(content).await
    }

    /// Reads a file into memory and scans it.
    ///
    /// A missing or empty path is clean.
    pub async fn scan_file(&mut self, path: Option<&Path>) -> ScanResult {
        let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
            return ScanResult::Clean;
        };

        match tokio::fs::read(path).await {
            Ok(content) => self.scan_content(&content).await,
            Err(err) => self.unreadable_file(path, &err),
        }
    }

    fn minimum_scan_size(&self) -> usize {
        self.config.minimum_scan_size().max(1)
    }

    fn unreadable_file(&self, path: &Path, err: &io::Error) -> ScanResult {
        match self.config.failure_policy() {
            FailurePolicy::FailOpen => {
                tracing::debug!(
                    path = %path.display(),
                    error = %err,
                    "Unreadable upload treated as clean"
                );
                ScanResult::Clean
            }
            FailurePolicy::FailClosed => {
                self.alerts.emit(
                    ALERT_SOURCE,
                    &format!("Could not read {} for scanning: {}", path.display(), err),
                    AlertSeverity::Error,
                );
                ScanResult::engine_error(format!("unreadable file: {}", err))
            }
        }
    }

    async fn scan_content(&mut self, content: &[u8]) -> ScanResult {
        let scan_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();

        let raw = match self.round_trip(content).await {
            Ok(raw) => raw,
            Err(err) => {
                tracing::trace!(scan_id = %scan_id, error = %err, "Daemon unavailable, scan skipped");
                return ScanResult::Unavailable;
            }
        };

        if raw.is_empty() {
            self.connection.abandon("daemon sent no response");
            return ScanResult::Unavailable;
        }
        if !raw.ends_with(b"\n") {
            // A late remainder would be read as the next scan's answer.
            self.connection.abandon("daemon response was cut short");
        }

        let result = codec::parse_response(&String::from_utf8_lossy(&raw));
        self.record(&scan_id, content, &result, started.elapsed());
        result
    }

    async fn round_trip(&mut self, content: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.connection.send(codec::encode_scan_command()).await?;
        for frame in codec::encode_stream(content) {
            self.connection.send(&frame).await?;
        }
        self.connection.flush().await?;

        self.read_response().await
    }

    /// Reads until a newline, a close, or a silent wait of one read timeout.
    ///
    /// Each read that returns data restarts the wait, so a daemon trickling
    /// bytes can hold this loop open indefinitely.
    async fn read_response(&mut self) -> Result<Vec<u8>, TransportError> {
        let timeout = self.config.read_timeout();
        let mut response = Vec::new();

        loop {
            match self.connection.receive(codec::BLOCK_SIZE, timeout).await? {
                None => break,
                Some(chunk) if chunk.is_empty() => break,
                Some(chunk) => {
                    response.extend_from_slice(&chunk);
                    if response.ends_with(b"\n") {
                        break;
                    }
                }
            }
        }

        Ok(response)
    }

    fn record(&self, scan_id: &str, content: &[u8], result: &ScanResult, elapsed: Duration) {
        match result {
            ScanResult::Infected { signature } => {
                tracing::info!(scan_id = %scan_id, signature = %signature, "Malware detected");
                self.alerts.emit(
                    ALERT_SOURCE,
                    &format!("Found {}", signature),
                    AlertSeverity::Warning,
                );
            }
            ScanResult::EngineError { detail } => {
                tracing::warn!(scan_id = %scan_id, detail = %detail, "Daemon reported an error");
                self.alerts.emit(
                    ALERT_SOURCE,
                    &format!("Error while trying to scan content: {}", detail),
                    AlertSeverity::Error,
                );
            }
            ScanResult::Clean | ScanResult::Unavailable => {
                tracing::debug!(scan_id = %scan_id, size = content.len(), "Content scanned clean");
            }
        }

        audit::emit_scan_completed(&ScanAuditEvent::new(scan_id, content, result, elapsed));
    }
}

#[async_trait]
impl ContentScanner for ScanClient {
    async fn scan_bytes(&mut self, content: &[u8]) -> ScanResult {
        ScanClient::scan_bytes(self, content).await
    }

    async fn scan_file(&mut self, path: Option<&Path>) -> ScanResult {
        ScanClient::scan_file(self, path).await
    }
}
