//! Daemon socket ownership and session lifecycle.
//!
//! A [`Connection`] moves through three states:
//!
//! - **Unconnected**: nothing has been attempted yet.
//! - **SessionActive**: the socket is open and `IDSESSION` was sent.
//! - **Failed**: a socket fault happened. This state is sticky; the
//!   connection never reconnects and every later operation reports
//!   [`TransportError::Unavailable`] without touching the network.

use crate::backends::clamd::codec;
use crate::backends::clamd::endpoint::Endpoint;
use crate::core::TransportError;

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A bidirectional byte stream to the daemon.
pub trait DaemonStream: AsyncRead + AsyncWrite + Unpin + Send + Sync {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + Sync> DaemonStream for T {}

/// A boxed daemon stream.
pub type BoxedStream = Box<dyn DaemonStream>;

/// Opens sockets to the daemon.
#[async_trait]
pub trait Connector: fmt::Debug + Send + Sync {
    /// Opens a stream to `endpoint`.
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<BoxedStream>;
}

/// Connects over real Unix domain or TCP sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

#[async_trait]
impl Connector for SocketConnector {
    async fn connect(&self, endpoint: &Endpoint) -> io::Result<BoxedStream> {
        match endpoint {
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                Ok(Box::new(stream))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(_) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "Unix sockets not supported on this platform",
            )),
            Endpoint::Tcp(addr) => {
                let stream = tokio::net::TcpStream::connect(addr.as_str()).await?;
                stream.set_nodelay(true)?;
                Ok(Box::new(stream))
            }
        }
    }
}

/// Public view of a connection's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No connection attempt yet.
    Unconnected,
    /// Socket open and session started.
    SessionActive,
    /// Gave up after a socket fault.
    Failed,
}

enum ConnectionState {
    Unconnected,
    SessionActive(BoxedStream),
    Failed { reason: String },
}

/// An owned, lazily opened daemon session.
pub struct Connection {
    endpoint: String,
    connect_timeout: Duration,
    connector: Arc<dyn Connector>,
    state: ConnectionState,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("endpoint", &self.endpoint)
            .field("connect_timeout", &self.connect_timeout)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Creates an unconnected session for `endpoint`.
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            connector: Arc::new(SocketConnector),
            state: ConnectionState::Unconnected,
        }
    }

    /// Replaces the socket connector.
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Returns the configured endpoint string.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the current state.
    pub fn status(&self) -> ConnectionStatus {
        match self.state {
            ConnectionState::Unconnected => ConnectionStatus::Unconnected,
            ConnectionState::SessionActive(_) => ConnectionStatus::SessionActive,
            ConnectionState::Failed { .. } => ConnectionStatus::Failed,
        }
    }

    /// Returns `true` while a session is open.
    pub fn is_available(&self) -> bool {
        self.status() == ConnectionStatus::SessionActive
    }

    /// Opens the socket and starts a session.
    ///
    /// Does nothing once a session is active. After a failure it keeps
    /// returning the cached failure without another attempt.
    pub async fn connect(&mut self) -> Result<(), TransportError> {
        match &self.state {
            ConnectionState::SessionActive(_) => return Ok(()),
            ConnectionState::Failed { reason } => {
                return Err(TransportError::unavailable(reason.clone()));
            }
            ConnectionState::Unconnected => {}
        }

        match self.open_session().await {
            Ok(stream) => {
                tracing::debug!(endpoint = %self.endpoint, "Daemon session started");
                self.state = ConnectionState::SessionActive(stream);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    async fn open_session(&self) -> Result<BoxedStream, TransportError> {
        let endpoint: Endpoint = self.endpoint.parse()?;

        let connecting = self.connector.connect(&endpoint);
        let mut stream = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| TransportError::Timeout(self.connect_timeout))?
            .map_err(|source| TransportError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;

        stream.write_all(codec::encode_session_init()).await?;
        stream.flush().await?;
        Ok(stream)
    }

    /// Writes raw bytes to the session, connecting first if needed.
    pub async fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.connect().await?;
        let stream = self.stream_mut()?;
        let written = stream.write_all(bytes).await;

        written.map_err(|err| self.fail(TransportError::Io(err)))
    }

    /// Flushes buffered writes.
    pub async fn flush(&mut self) -> Result<(), TransportError> {
        let stream = self.stream_mut()?;
        let flushed = stream.flush().await;

        flushed.map_err(|err| self.fail(TransportError::Io(err)))
    }

    /// Waits up to `timeout` for data and reads at most `max_bytes`.
    ///
    /// Returns `Ok(None)` if the wait elapsed with nothing to read, and an
    /// empty buffer if the daemon closed the socket. A close leaves the
    /// connection failed.
    pub async fn receive(
        &mut self,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, TransportError> {
        let stream = self.stream_mut()?;
        let mut buf = vec![0u8; max_bytes];

        let outcome = tokio::time::timeout(timeout, stream.read(&mut buf)).await;

        let read = match outcome {
            Err(_) => return Ok(None),
            Ok(Err(err)) => return Err(self.fail(TransportError::Io(err))),
            Ok(Ok(read)) => read,
        };

        if read == 0 {
            self.abandon("daemon closed the connection");
        }
        buf.truncate(read);
        Ok(Some(buf))
    }

    /// Drops the session and marks the connection failed.
    pub fn abandon(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if !matches!(self.state, ConnectionState::Failed { .. }) {
            tracing::debug!(endpoint = %self.endpoint, reason = %reason, "Daemon session abandoned");
        }
        self.state = ConnectionState::Failed { reason };
    }

    fn stream_mut(&mut self) -> Result<&mut BoxedStream, TransportError> {
        match &mut self.state {
            ConnectionState::SessionActive(stream) => Ok(stream),
            ConnectionState::Failed { reason } => Err(TransportError::unavailable(reason.clone())),
            ConnectionState::Unconnected => Err(TransportError::unavailable("not connected")),
        }
    }

    fn fail(&mut self, err: TransportError) -> TransportError {
        tracing::warn!(
            endpoint = %self.endpoint,
            error = %err,
            "Daemon unreachable, scanning disabled for this session"
        );
        crate::audit::emit_connection_failed(&self.endpoint, &err.to_string());
        self.state = ConnectionState::Failed {
            reason: err.to_string(),
        };
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::clamd::testing::{FakeDaemon, Reply};

    fn connection(daemon: &FakeDaemon) -> Connection {
        Connection::new("unix:///tmp/clamd.ctl", Duration::from_secs(1))
            .with_connector(daemon.connector())
    }

    #[tokio::test]
    async fn test_connect_starts_session_once() {
        let daemon = FakeDaemon::new(|_| Reply::status("OK"));
        let mut conn = connection(&daemon);
        assert_eq!(conn.status(), ConnectionStatus::Unconnected);
        assert!(!conn.is_available());

        conn.connect().await.unwrap();
        conn.connect().await.unwrap();

        assert!(conn.is_available());
        assert_eq!(daemon.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_failed_connection_is_sticky() {
        let daemon = FakeDaemon::refusing();
        let mut conn = connection(&daemon);

        let first = conn.connect().await.unwrap_err();
        assert!(matches!(first, TransportError::Connect { .. }));
        assert_eq!(conn.status(), ConnectionStatus::Failed);

        let second = conn.connect().await.unwrap_err();
        assert!(second.is_sticky());
        assert!(conn.send(b"nINSTREAM\n").await.unwrap_err().is_sticky());
        assert!(conn
            .receive(16, Duration::from_millis(10))
            .await
            .unwrap_err()
            .is_sticky());

        assert_eq!(daemon.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_fails_connection() {
        let daemon = FakeDaemon::new(|_| Reply::status("OK"));
        let mut conn = Connection::new("not an endpoint", Duration::from_secs(1))
            .with_connector(daemon.connector());

        let err = conn.connect().await.unwrap_err();
        assert!(matches!(err, TransportError::Config(_)));
        assert_eq!(conn.status(), ConnectionStatus::Failed);
        assert_eq!(daemon.connect_attempts(), 0);
    }

    #[tokio::test]
    async fn test_receive_times_out_without_data() {
        let daemon = FakeDaemon::new(|_| Reply::Silent);
        let mut conn = connection(&daemon);
        conn.connect().await.unwrap();

        let received = conn.receive(64, Duration::from_millis(20)).await.unwrap();
        assert!(received.is_none());
        assert!(conn.is_available());
    }

    #[tokio::test]
    async fn test_abandon_marks_failed() {
        let daemon = FakeDaemon::new(|_| Reply::status("OK"));
        let mut conn = connection(&daemon);
        conn.connect().await.unwrap();

        conn.abandon("no response");
        assert_eq!(conn.status(), ConnectionStatus::Failed);
        assert!(conn.connect().await.unwrap_err().is_sticky());
    }
}
