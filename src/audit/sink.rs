//! Alert sinks for protocol errors and detections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Severity of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Something needs attention but scanning still works.
    Warning,
    /// The daemon misbehaved.
    Error,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Receives alerts raised while scanning.
///
/// The client raises an `Error` alert for every engine error and a
/// `Warning` alert for every detection. Unreachable daemons and clean
/// results never raise alerts.
pub trait AlertSink: fmt::Debug + Send + Sync {
    /// Records one alert.
    fn emit(&self, source: &str, message: &str, severity: AlertSeverity);
}

/// Writes alerts as `tracing` events under the `clamgate::alert` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn emit(&self, source: &str, message: &str, severity: AlertSeverity) {
        match severity {
            AlertSeverity::Error => tracing::error!(
                target: "clamgate::alert",
                source = %source,
                severity = %severity,
                "{}",
                message
            ),
            AlertSeverity::Warning => tracing::warn!(
                target: "clamgate::alert",
                source = %source,
                severity = %severity,
                "{}",
                message
            ),
        }
    }
}

/// One recorded alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Component that raised the alert.
    pub source: String,
    /// Human-readable message.
    pub message: String,
    /// Severity level.
    pub severity: AlertSeverity,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
}

/// Keeps alerts in memory.
///
/// # Examples
///
/// ```rust
/// use clamgate::audit::{AlertSeverity, AlertSink, MemoryAlertSink};
///
/// let sink = MemoryAlertSink::new();
/// sink.emit("clamgate", "Found Eicar-Test-Signature", AlertSeverity::Warning);
/// assert_eq!(sink.count(AlertSeverity::Warning), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryAlertSink {
    events: Mutex<Vec<AlertEvent>>,
}

impl MemoryAlertSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded alert.
    pub fn events(&self) -> Vec<AlertEvent> {
        self.lock().clone()
    }

    /// Returns the number of alerts with `severity`.
    pub fn count(&self, severity: AlertSeverity) -> usize {
        self.lock().iter().filter(|e| e.severity == severity).count()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Discards all recorded alerts.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<AlertEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AlertSink for MemoryAlertSink {
    fn emit(&self, source: &str, message: &str, severity: AlertSeverity) {
        self.lock().push(AlertEvent {
            source: source.to_string(),
            message: message.to_string(),
            severity,
            timestamp: Utc::now(),
        });
    }
}
