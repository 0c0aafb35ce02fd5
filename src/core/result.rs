//! Scan result types.
//!
//! `ScanResult` is the single value every scan produces. Exactly one variant
//! holds; only [`ScanResult::Infected`] means malware was found.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of scanning one piece of content or one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanResult {
    /// No threat was found, or the content was below the scan threshold.
    Clean,

    /// The daemon reported a signature match.
    Infected {
        /// Name of the matched signature (e.g. "Eicar-Test-Signature").
        signature: String,
    },

    /// The daemon was reachable but answered with an error or with
    /// something that could not be understood.
    EngineError {
        /// The daemon's status text or a description of the problem.
        detail: String,
    },

    /// The daemon could not be reached. Treated as "not scanned", not as an
    /// error.
    Unavailable,
}

impl ScanResult {
    /// Creates an `Infected` result.
    pub fn infected(signature: impl Into<String>) -> Self {
        Self::Infected {
            signature: signature.into(),
        }
    }

    /// Creates an `EngineError` result.
    pub fn engine_error(detail: impl Into<String>) -> Self {
        Self::EngineError {
            detail: detail.into(),
        }
    }

    /// Returns `true` if the content is clean.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::Clean)
    }

    /// Returns `true` if the daemon found a threat.
    pub fn is_infected(&self) -> bool {
        matches!(self, Self::Infected { .. })
    }

    /// Returns `true` if the daemon misbehaved.
    pub fn is_engine_error(&self) -> bool {
        matches!(self, Self::EngineError { .. })
    }

    /// Returns `true` if the daemon could not be reached.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Returns the detected signature name, if infected.
    pub fn signature(&self) -> Option<&str> {
        match self {
            Self::Infected { signature } => Some(signature),
            _ => None,
        }
    }

    /// Returns `true` if a host applying `policy` should reject the request.
    ///
    /// `Unavailable` only blocks when the deployment chose to fail closed.
    pub fn should_block(&self, policy: FailurePolicy) -> bool {
        match self {
            Self::Clean => false,
            Self::Infected { .. } | Self::EngineError { .. } => true,
            Self::Unavailable => policy == FailurePolicy::FailClosed,
        }
    }

    /// Returns a stable lowercase label for logs and audit events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Infected { .. } => "infected",
            Self::EngineError { .. } => "engine_error",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clean => write!(f, "clean"),
            Self::Infected { signature } => write!(f, "infected: {}", signature),
            Self::EngineError { detail } => write!(f, "engine error: {}", detail),
            Self::Unavailable => write!(f, "scanner unavailable"),
        }
    }
}

/// What to do when content cannot be scanned at all.
///
/// Under `FailOpen` an unreachable daemon or an unreadable upload is treated
/// as "no threat found". `FailClosed` reports unreadable uploads as engine
/// errors and makes [`ScanResult::should_block`] reject `Unavailable`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Let unscannable content through.
    #[default]
    FailOpen,
    /// Reject unscannable content.
    FailClosed,
}
