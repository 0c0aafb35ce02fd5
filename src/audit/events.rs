//! Audit event types and emission functions.

use crate::core::ScanResult;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Audit event for a completed daemon round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAuditEvent {
    /// Event type.
    pub event_type: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Unique scan ID.
    pub scan_id: String,

    /// BLAKE3 hash of the scanned content.
    pub content_hash_blake3: String,

    /// Size of the scanned content in bytes.
    pub content_size: u64,

    /// Scan outcome label.
    pub outcome: String,

    /// Detected signature, if any.
    pub signature: Option<String>,

    /// Engine error detail, if any.
    pub detail: Option<String>,

    /// Round-trip duration in milliseconds.
    pub duration_ms: u64,
}

impl ScanAuditEvent {
    /// Builds the event for `content` scanned with `result`.
    pub fn new(
        scan_id: impl Into<String>,
        content: &[u8],
        result: &ScanResult,
        duration: Duration,
    ) -> Self {
        let detail = match result {
            ScanResult::EngineError { detail } => Some(detail.clone()),
            _ => None,
        };

        Self {
            event_type: "scan_completed".to_string(),
            timestamp: Utc::now(),
            scan_id: scan_id.into(),
            content_hash_blake3: blake3::hash(content).to_hex().to_string(),
            content_size: content.len() as u64,
            outcome: result.label().to_string(),
            signature: result.signature().map(str::to_string),
            detail,
            duration_ms: duration.as_millis() as u64,
        }
    }
}

/// Emits an audit event for a completed scan.
pub fn emit_scan_completed(event: &ScanAuditEvent) {
    tracing::info!(
        target: "clamgate::audit",
        event_type = %event.event_type,
        timestamp = %event.timestamp,
        scan_id = %event.scan_id,
        content_hash_blake3 = %event.content_hash_blake3,
        content_size = event.content_size,
        outcome = %event.outcome,
        signature = ?event.signature,
        detail = ?event.detail,
        duration_ms = event.duration_ms,
        "Scan completed"
    );
}

/// Emits an audit event when a daemon session is given up.
pub fn emit_connection_failed(endpoint: &str, reason: &str) {
    tracing::info!(
        target: "clamgate::audit",
        event_type = "connection_failed",
        timestamp = %Utc::now(),
        endpoint = %endpoint,
        reason = %reason,
        "Daemon connection failed"
    );
}
