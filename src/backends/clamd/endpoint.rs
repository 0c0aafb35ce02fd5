//! Daemon endpoint resolution.

use crate::core::ConfigError;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where the daemon listens.
///
/// Parsed from the configured endpoint string:
///
/// - `unix:///var/run/clamav/clamd.ctl` or `/var/run/clamav/clamd.ctl`
/// - `tcp://127.0.0.1:3310` or `127.0.0.1:3310`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// A Unix domain socket path.
    Unix(PathBuf),
    /// A `host:port` TCP address.
    Tcp(String),
}

impl FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::invalid_endpoint(value, "endpoint is empty"));
        }

        if let Some(path) = trimmed.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(ConfigError::invalid_endpoint(value, "socket path is empty"));
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }

        if let Some(addr) = trimmed.strip_prefix("tcp://") {
            return if is_host_port(addr) {
                Ok(Self::Tcp(addr.to_string()))
            } else {
                Err(ConfigError::invalid_endpoint(value, "expected host:port"))
            };
        }

        if trimmed.starts_with('/') {
            return Ok(Self::Unix(PathBuf::from(trimmed)));
        }

        if is_host_port(trimmed) {
            return Ok(Self::Tcp(trimmed.to_string()));
        }

        Err(ConfigError::invalid_endpoint(
            value,
            "expected a socket path or host:port",
        ))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp://{}", addr),
        }
    }
}

fn is_host_port(addr: &str) -> bool {
    addr.rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
}
