//! Structured audit logging and alerting.
//!
//! Audit events are emitted through the `tracing` crate under the
//! `clamgate::audit` target, so any subscriber (JSON file, OpenTelemetry,
//! etc.) can capture them. Alerts go to a host-supplied [`AlertSink`].

mod events;
mod sink;

pub use events::{emit_connection_failed, emit_scan_completed, ScanAuditEvent};
pub use sink::{AlertEvent, AlertSeverity, AlertSink, MemoryAlertSink, TracingAlertSink};
