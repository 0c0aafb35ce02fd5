//! Mock scanner for testing.
//!
//! This module provides a configurable mock scanner that can be used
//! in tests to simulate scan outcomes and observe which leaves a request
//! scan visited, without a running daemon.

use crate::core::{ContentScanner, ScanResult};

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A leaf the mock scanner was asked to scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannedLeaf {
    /// An inline value.
    Bytes(Vec<u8>),
    /// An uploaded file path, if one was given.
    File(Option<PathBuf>),
}

/// A mock scanner for testing purposes.
///
/// Returns configured outcomes for specific values or file paths, and a
/// default outcome for everything else. Every call is recorded in order.
///
/// # Examples
///
/// ```rust
/// use clamgate::backends::MockScanner;
/// use clamgate::core::ScanResult;
///
/// // Report everything clean
/// let scanner = MockScanner::new_clean();
///
/// // Flag one specific value
/// let scanner = MockScanner::new()
///     .with_bytes_response("EICAR", ScanResult::infected("Eicar-Test-Signature"));
/// ```
#[derive(Debug, Default)]
pub struct MockScanner {
    /// Responses keyed by inline value.
    bytes_responses: HashMap<Vec<u8>, ScanResult>,
    /// Responses keyed by file path.
    file_responses: HashMap<PathBuf, ScanResult>,
    /// Outcome for anything without a configured response.
    default_result: Option<ScanResult>,
    /// Calls in the order they were made.
    scanned: Vec<ScannedLeaf>,
}

impl MockScanner {
    /// Creates a mock scanner that reports everything clean.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mock scanner that always reports clean.
    pub fn new_clean() -> Self {
        Self::new()
    }

    /// Creates a mock scanner that reports every leaf infected.
    pub fn new_infected(signature: impl Into<String>) -> Self {
        Self::new().with_default_result(ScanResult::infected(signature))
    }

    /// Sets the outcome for leaves without a configured response.
    pub fn with_default_result(mut self, result: ScanResult) -> Self {
        self.default_result = Some(result);
        self
    }

    /// Adds a response for a specific inline value.
    pub fn with_bytes_response(mut self, content: impl AsRef<[u8]>, result: ScanResult) -> Self {
        self.bytes_responses.insert(content.as_ref().to_vec(), result);
        self
    }

    /// Adds a response for a specific file path.
    pub fn with_file_response(mut self, path: impl Into<PathBuf>, result: ScanResult) -> Self {
        self.file_responses.insert(path.into(), result);
        self
    }

    /// Returns the number of leaves scanned.
    pub fn scan_count(&self) -> usize {
        self.scanned.len()
    }

    /// Returns every leaf scanned, in order.
    pub fn scanned(&self) -> &[ScannedLeaf] {
        &self.scanned
    }

    /// Forgets recorded calls.
    pub fn clear_scanned(&mut self) {
        self.scanned.clear();
    }

    fn fallback(&self) -> ScanResult {
        self.default_result.clone().unwrap_or(ScanResult::Clean)
    }
}

#[async_trait]
impl ContentScanner for MockScanner {
    async fn scan_bytes(&mut self, content: &[u8]) -> ScanResult {
        self.scanned.push(ScannedLeaf::Bytes(content.to_vec()));
        self.bytes_responses
            .get(content)
            .cloned()
            .unwrap_or_else(|| self.fallback())
    }

    async fn scan_file(&mut self, path: Option<&Path>) -> ScanResult {
        self.scanned.push(ScannedLeaf::File(path.map(Path::to_path_buf)));
        path.and_then(|p| self.file_responses.get(p))
            .cloned()
            .unwrap_or_else(|| self.fallback())
    }
}
