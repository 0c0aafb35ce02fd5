//! Request traversal.
//!
//! Converts a request's uploads and parameters into trees and scans them
//! leaf by leaf through any [`ContentScanner`](crate::core::ContentScanner).

mod scanner;
mod tree;

pub use scanner::RequestScanner;
pub use tree::{ParamLeaves, ParamNode, ScanLeaf, UploadLeaves, UploadNode, UploadedFile};
