//! Scripted in-memory daemon used by the unit tests.
//!
//! Speaks the daemon side of the session protocol over `tokio::io::duplex`
//! and records every command and decoded content stream it receives.

use crate::backends::clamd::codec::{self, DecodedStream};
use crate::backends::clamd::connection::{BoxedStream, Connector};
use crate::backends::clamd::endpoint::Endpoint;

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

/// How the fake daemon answers one INSTREAM scan.
pub(crate) enum Reply {
    /// Answers `<n>: INSTREAM: <status>\n`.
    Status(String),
    /// Writes exactly these bytes.
    Raw(String),
    /// Writes each piece separately with a short pause in between.
    Pieces(Vec<String>),
    /// Sends nothing and keeps the socket open.
    Silent,
    /// Closes the socket.
    Close,
}

impl Reply {
    pub(crate) fn status(status: impl Into<String>) -> Self {
        Self::Status(status.into())
    }
}

type ReplyFn = Box<dyn Fn(&[u8]) -> Reply + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Serve,
    Refuse,
    HangUpAfterSession,
}

struct DaemonState {
    behavior: Behavior,
    reply: ReplyFn,
    attempts: AtomicUsize,
    commands: Mutex<Vec<String>>,
    streams: Mutex<Vec<DecodedStream>>,
}

/// Handle to a fake daemon and what it has seen.
#[derive(Clone)]
pub(crate) struct FakeDaemon {
    state: Arc<DaemonState>,
}

impl FakeDaemon {
    /// A daemon answering each scan with `reply(payload)`.
    pub(crate) fn new(reply: impl Fn(&[u8]) -> Reply + Send + Sync + 'static) -> Self {
        Self::build(Behavior::Serve, Box::new(reply))
    }

    /// A daemon whose socket refuses every connection.
    pub(crate) fn refusing() -> Self {
        Self::build(Behavior::Refuse, Box::new(|_| Reply::Close))
    }

    /// A daemon that accepts the session, then drops the socket before
    /// reading any scan command.
    pub(crate) fn hanging_up() -> Self {
        Self::build(Behavior::HangUpAfterSession, Box::new(|_| Reply::Close))
    }

    /// A daemon reporting any payload containing `marker` as infected.
    pub(crate) fn detecting(marker: &'static [u8], signature: &'static str) -> Self {
        Self::new(move |payload| {
            if payload.windows(marker.len()).any(|w| w == marker) {
                Reply::status(format!("{} FOUND", signature))
            } else {
                Reply::status("OK")
            }
        })
    }

    fn build(behavior: Behavior, reply: ReplyFn) -> Self {
        Self {
            state: Arc::new(DaemonState {
                behavior,
                reply,
                attempts: AtomicUsize::new(0),
                commands: Mutex::new(Vec::new()),
                streams: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn connector(&self) -> Arc<dyn Connector> {
        Arc::new(self.clone())
    }

    pub(crate) fn connect_attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.state.commands.lock().unwrap().clone()
    }

    pub(crate) fn streams(&self) -> Vec<DecodedStream> {
        self.state.streams.lock().unwrap().clone()
    }

    /// Waits until the daemon has seen `command`.
    pub(crate) async fn wait_for_command(&self, command: &str) {
        while !self.commands().iter().any(|c| c == command) {
            tokio::task::yield_now().await;
        }
    }
}

impl fmt::Debug for FakeDaemon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeDaemon")
            .field("behavior", &self.state.behavior)
            .field("attempts", &self.connect_attempts())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for FakeDaemon {
    async fn connect(&self, _endpoint: &Endpoint) -> io::Result<BoxedStream> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.behavior == Behavior::Refuse {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ));
        }

        let (client, server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(serve(server, Arc::clone(&self.state)));
        Ok(Box::new(client))
    }
}

async fn serve(mut stream: DuplexStream, state: Arc<DaemonState>) -> io::Result<()> {
    let mut scan_number = 0u32;

    while let Some(command) = read_command(&mut stream).await? {
        state.commands.lock().unwrap().push(command.clone());
        if state.behavior == Behavior::HangUpAfterSession {
            return Ok(());
        }
        if command != "nINSTREAM" {
            continue;
        }

        let decoded = read_instream(&mut stream).await?;
        scan_number += 1;
        let reply = (state.reply)(&decoded.payload);
        state.streams.lock().unwrap().push(decoded);

        match reply {
            Reply::Status(status) => {
                let line = format!("{}: INSTREAM: {}\n", scan_number, status);
                stream.write_all(line.as_bytes()).await?;
            }
            Reply::Raw(raw) => stream.write_all(raw.as_bytes()).await?,
            Reply::Pieces(pieces) => {
                for piece in pieces {
                    stream.write_all(piece.as_bytes()).await?;
                    stream.flush().await?;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            }
            Reply::Silent => {}
            Reply::Close => return Ok(()),
        }
        stream.flush().await?;
    }

    Ok(())
}

async fn read_command(stream: &mut DuplexStream) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        if stream.read(&mut byte).await? == 0 {
            return Ok(None);
        }
        if byte[0] == b'\n' {
            return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
        }
        line.push(byte[0]);
    }
}

async fn read_instream(stream: &mut DuplexStream) -> io::Result<DecodedStream> {
    let mut wire = Vec::new();
    loop {
        let mut prefix = [0u8; codec::LENGTH_PREFIX_SIZE];
        stream.read_exact(&mut prefix).await?;
        wire.extend_from_slice(&prefix);

        let len = u32::from_be_bytes(prefix) as usize;
        if len == 0 {
            break;
        }
        let start = wire.len();
        wire.resize(start + len, 0);
        stream.read_exact(&mut wire[start..]).await?;
    }

    codec::decode_stream(&wire)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "incomplete stream"))
}
