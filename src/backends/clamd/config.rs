//! Daemon client configuration.

use crate::backends::clamd::endpoint::Endpoint;
use crate::core::{
    ConfigError, ConfigProvider, FailurePolicy, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default daemon socket on Debian-style installs.
pub const DEFAULT_ENDPOINT: &str = "unix:///var/run/clamav/clamd.ctl";

/// Configuration for a [`ScanClient`](crate::backends::ScanClient).
///
/// Deserializes from JSON with every field optional:
///
/// ```rust
/// use clamgate::backends::ClamdConfig;
///
/// let config = ClamdConfig::from_json_str(
///     r#"{ "enabled": true, "endpoint": "tcp://127.0.0.1:3310", "min_scan_size": 16 }"#,
/// ).unwrap();
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClamdConfig {
    /// Whether scanning is switched on.
    pub enabled: bool,

    /// Daemon socket, as a Unix path or `host:port`.
    pub endpoint: String,

    /// Inline values shorter than this are not sent to the daemon.
    pub min_scan_size: usize,

    /// Wait for each read of the daemon's response.
    #[serde(rename = "read_timeout_ms", with = "duration_serde")]
    pub read_timeout: Duration,

    /// Limit on opening the socket.
    #[serde(rename = "connect_timeout_ms", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// How unscannable content is treated.
    pub failure_policy: FailurePolicy,
}

impl Default for ClamdConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            min_scan_size: 1,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            failure_policy: FailurePolicy::FailOpen,
        }
    }
}

impl ClamdConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enables or disables scanning.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the daemon endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the minimum inline value size.
    pub fn with_min_scan_size(mut self, size: usize) -> Self {
        self.min_scan_size = size;
        self
    }

    /// Sets the per-read response timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Resolves the configured endpoint.
    pub fn resolve_endpoint(&self) -> Result<Endpoint, ConfigError> {
        self.endpoint.parse()
    }
}

impl ConfigProvider for ClamdConfig {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn socket_endpoint(&self) -> String {
        self.endpoint.clone()
    }

    fn minimum_scan_size(&self) -> usize {
        self.min_scan_size
    }

    fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}

/// Serde helper for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
