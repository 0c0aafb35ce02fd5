//! clamd backend.
//!
//! This module provides a scanner that communicates with a clamd-compatible
//! daemon over its socket protocol.
//!
//! # Requirements
//!
//! - A running daemon (clamd) listening on a Unix socket or TCP port
//! - Access to that socket
//!
//! # Protocol
//!
//! Uses `IDSESSION` to keep one socket per client and the `INSTREAM`
//! command to send content for scanning. See [`codec`] for the byte layout.

pub mod client;
pub mod codec;
pub mod config;
pub mod connection;
pub mod endpoint;

#[cfg(test)]
pub(crate) mod testing;

pub use client::ScanClient;
pub use config::ClamdConfig;
pub use connection::{Connection, ConnectionStatus, Connector, SocketConnector};
pub use endpoint::Endpoint;
