//! Request-level scanning.
//!
//! [`RequestScanner`] feeds every leaf of a request's upload and parameter
//! trees to a [`ContentScanner`], stopping at the first leaf that does not
//! come back clean.

use crate::core::{ContentScanner, ScanResult};
use crate::request::tree::{ParamNode, ScanLeaf, UploadNode};

/// Walks request trees and scans their leaves in order.
///
/// # Examples
///
/// ```rust
/// use clamgate::backends::MockScanner;
/// use clamgate::request::{ParamNode, RequestScanner, UploadNode};
///
/// # tokio_test_block(async {
/// let mut scanner = RequestScanner::new(MockScanner::new_clean());
/// let params: ParamNode = [("q", "hello")].into_iter().collect();
///
/// let result = scanner.scan_request(&UploadNode::default(), &params).await;
/// assert!(result.is_clean());
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Debug)]
pub struct RequestScanner<S> {
    scanner: S,
    leaves_scanned: usize,
}

impl<S: ContentScanner> RequestScanner<S> {
    /// Creates a request scanner over `scanner`.
    pub fn new(scanner: S) -> Self {
        Self {
            scanner,
            leaves_scanned: 0,
        }
    }

    /// Returns the underlying scanner.
    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    /// Returns the underlying scanner mutably.
    pub fn scanner_mut(&mut self) -> &mut S {
        &mut self.scanner
    }

    /// Consumes the request scanner, returning the underlying scanner.
    pub fn into_inner(self) -> S {
        self.scanner
    }

    /// Number of leaves handed to the scanner by the last scan call.
    pub fn leaves_scanned(&self) -> usize {
        self.leaves_scanned
    }

    /// Scans every uploaded file, stopping at the first non-clean result.
    ///
    /// Files are scanned whole regardless of the minimum scan size; a file
    /// leaf without a path is clean.
    pub async fn scan_uploads(&mut self, uploads: &UploadNode) -> ScanResult {
        self.leaves_scanned = 0;
        self.scan_leaves("uploads", uploads.leaves()).await
    }

    /// Scans every parameter value, stopping at the first non-clean result.
    pub async fn scan_parameters(&mut self, params: &ParamNode) -> ScanResult {
        self.leaves_scanned = 0;
        self.scan_leaves("parameters", params.leaves()).await
    }

    /// Scans uploads, then parameters.
    ///
    /// Parameters are only visited when every upload is clean.
    pub async fn scan_request(&mut self, uploads: &UploadNode, params: &ParamNode) -> ScanResult {
        self.leaves_scanned = 0;

        let result = self.scan_leaves("uploads", uploads.leaves()).await;
        if !result.is_clean() {
            return result;
        }

        self.scan_leaves("parameters", params.leaves()).await
    }

    async fn scan_leaves<'a, I>(&mut self, tree: &'static str, leaves: I) -> ScanResult
    where
        I: Iterator<Item = ScanLeaf<'a>>,
    {
        for leaf in leaves {
            self.leaves_scanned += 1;

            let result = match leaf {
                ScanLeaf::InlineBytes(value) => self.scanner.scan_bytes(value).await,
                ScanLeaf::FileReference(path) => self.scanner.scan_file(path).await,
            };

            if !result.is_clean() {
                tracing::info!(
                    tree,
                    leaf = self.leaves_scanned,
                    outcome = result.label(),
                    "Request scan stopped at non-clean leaf"
                );
                return result;
            }
        }

        tracing::debug!(tree, leaves = self.leaves_scanned, "Request tree clean");
        ScanResult::Clean
    }
}
