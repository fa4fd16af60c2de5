//! Blocking, cancellable byte-stream sockets.
//!
//! [`TcpSocket`] wraps a blocking `std::net::TcpStream` (optionally inside a
//! rustls session) with short read/write timeouts. Each timeout tick is a
//! check point: the active [`CancellationToken`] is consulted and the operation
//! either retries or gives up. Partial progress is kept in the socket's read
//! buffer and is never rolled back.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};
use tracing::{debug, trace};

use crate::cancel::CancellationToken;
use crate::error::SocketError;
use crate::types::ProgressCallback;

/// Interval between cancellation checks while blocked on I/O.
pub const IO_TICK: Duration = Duration::from_millis(25);

/// Longest status/header/chunk-size line accepted.
pub const MAX_LINE_LEN: usize = 64 * 1024;

const READ_CHUNK: usize = 16 * 1024;

/// Largest up-front allocation `read_bytes` makes, whatever length is asked for.
const MAX_PREALLOC: usize = 1024 * 1024;

/// Result of [`Socket::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollResult {
    /// Data is available to read.
    Readable,
    /// Another thread called [`SocketWaker::wake`].
    Woken,
    /// The timeout elapsed with nothing to read.
    Timeout,
    /// The peer closed the connection, or the socket is not connected.
    Closed,
    /// The socket reported an error.
    Error,
}

/// Handle that interrupts a thread blocked in [`Socket::poll`].
#[derive(Debug, Clone, Default)]
pub struct SocketWaker(Arc<AtomicBool>);

impl SocketWaker {
    /// Wake the polling thread.
    pub fn wake(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub(crate) fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A connected byte stream as seen by the connection engine.
///
/// Every blocking method takes the cancellation token of the current phase and
/// must return promptly once it fires.
pub trait Socket: Send {
    /// Connect to `host:port`.
    fn connect(&mut self, host: &str, port: u16, token: &CancellationToken)
        -> Result<(), SocketError>;

    /// Write all of `data`.
    fn write_all(&mut self, data: &[u8], token: &CancellationToken) -> Result<(), SocketError>;

    /// Read one line, returned without its CRLF (or bare LF) terminator.
    fn read_line(&mut self, token: &CancellationToken) -> Result<String, SocketError>;

    /// Read exactly `len` bytes, reporting progress as they arrive.
    fn read_bytes(
        &mut self,
        len: usize,
        progress: Option<&ProgressCallback>,
        token: &CancellationToken,
    ) -> Result<Bytes, SocketError>;

    /// Close the connection. Idempotent.
    fn close(&mut self);

    /// Block until readable, woken, closed, or `timeout` elapses.
    fn poll(&mut self, timeout: Option<Duration>) -> PollResult;

    /// Handle for waking a thread blocked in [`poll`](Socket::poll).
    fn waker(&self) -> SocketWaker;
}

enum Transport {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl Transport {
    fn tcp(&self) -> &TcpStream {
        match self {
            Transport::Plain(stream) => stream,
            Transport::Tls(tls) => &tls.sock,
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.read(buf),
            Transport::Tls(tls) => tls.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Plain(stream) => stream.write(buf),
            Transport::Tls(tls) => tls.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Plain(stream) => stream.flush(),
            Transport::Tls(tls) => tls.flush(),
        }
    }
}

/// TCP socket, plain or TLS, with a read buffer for line-oriented parsing.
pub struct TcpSocket {
    transport: Option<Transport>,
    pending: Option<TcpStream>,
    tls: Option<Arc<ClientConfig>>,
    buffer: BytesMut,
    waker: SocketWaker,
}

impl TcpSocket {
    /// Plain TCP socket.
    pub fn plain() -> Self {
        Self::new(None, None)
    }

    /// Socket that will run a TLS handshake with `config` after connecting.
    /// An `existing` stream, if given, is adopted instead of dialing.
    pub fn new(tls: Option<Arc<ClientConfig>>, existing: Option<TcpStream>) -> Self {
        TcpSocket {
            transport: None,
            pending: existing,
            tls,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            waker: SocketWaker::default(),
        }
    }

    /// Whether the socket uses TLS.
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    fn fill(&mut self, token: &CancellationToken) -> Result<usize, SocketError> {
        let transport = self.transport.as_mut().ok_or(SocketError::NotConnected)?;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            token.check()?;
            match transport.read(&mut chunk) {
                Ok(0) => return Err(SocketError::Closed),
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if is_retryable(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Socket for TcpSocket {
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        token: &CancellationToken,
    ) -> Result<(), SocketError> {
        self.close();
        self.waker.clear();

        let stream = match self.pending.take() {
            Some(stream) => stream,
            None => dial(host, port, token)?,
        };
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(IO_TICK))?;
        stream.set_write_timeout(Some(IO_TICK))?;

        let transport = match &self.tls {
            Some(config) => {
                let name = ServerName::try_from(host.to_string())
                    .map_err(|e| SocketError::Tls(format!("invalid server name {}: {}", host, e)))?;
                let conn = ClientConnection::new(config.clone(), name)?;
                let mut tls = StreamOwned::new(conn, stream);
                handshake(&mut tls, token)?;
                Transport::Tls(Box::new(tls))
            }
            None => Transport::Plain(stream),
        };

        self.transport = Some(transport);
        Ok(())
    }

    fn write_all(&mut self, data: &[u8], token: &CancellationToken) -> Result<(), SocketError> {
        let transport = self.transport.as_mut().ok_or(SocketError::NotConnected)?;

        let mut written = 0;
        while written < data.len() {
            token.check()?;
            match transport.write(&data[written..]) {
                Ok(0) => return Err(SocketError::Closed),
                Ok(n) => written += n,
                Err(e) if is_retryable(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        loop {
            token.check()?;
            match transport.flush() {
                Ok(()) => return Ok(()),
                Err(e) if is_retryable(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_line(&mut self, token: &CancellationToken) -> Result<String, SocketError> {
        let mut scanned = 0;
        loop {
            if let Some(offset) = self.buffer[scanned..].iter().position(|&b| b == b'\n') {
                let end = scanned + offset;
                let mut line = self.buffer.split_to(end + 1);
                line.truncate(end);
                if line.last() == Some(&b'\r') {
                    line.truncate(end - 1);
                }
                return Ok(String::from_utf8_lossy(&line).into_owned());
            }
            if self.buffer.len() > MAX_LINE_LEN {
                return Err(SocketError::LineTooLong(MAX_LINE_LEN));
            }
            scanned = self.buffer.len();
            self.fill(token)?;
        }
    }

    fn read_bytes(
        &mut self,
        len: usize,
        progress: Option<&ProgressCallback>,
        token: &CancellationToken,
    ) -> Result<Bytes, SocketError> {
        let mut out = BytesMut::with_capacity(len.min(MAX_PREALLOC));
        loop {
            let take = (len - out.len()).min(self.buffer.len());
            if take > 0 {
                out.extend_from_slice(&self.buffer.split_to(take));
                if let Some(on_progress) = progress {
                    if !on_progress(out.len() as u64, len as u64) {
                        return Err(SocketError::Aborted);
                    }
                }
            }
            if out.len() == len {
                return Ok(out.freeze());
            }
            self.fill(token)?;
        }
    }

    fn close(&mut self) {
        match self.transport.take() {
            Some(Transport::Tls(mut tls)) => {
                tls.conn.send_close_notify();
                let _ = tls.conn.complete_io(&mut tls.sock);
                let _ = tls.sock.shutdown(Shutdown::Both);
                trace!("tls socket closed");
            }
            Some(Transport::Plain(stream)) => {
                let _ = stream.shutdown(Shutdown::Both);
                trace!("socket closed");
            }
            None => {}
        }
        self.buffer.clear();
    }

    fn poll(&mut self, timeout: Option<Duration>) -> PollResult {
        if !self.buffer.is_empty() {
            return PollResult::Readable;
        }
        let Some(transport) = self.transport.as_ref() else {
            return PollResult::Closed;
        };

        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut peeked = [0u8; 1];
        loop {
            if self.waker.take() {
                return PollResult::Woken;
            }
            match transport.tcp().peek(&mut peeked) {
                Ok(0) => return PollResult::Closed,
                Ok(_) => return PollResult::Readable,
                Err(e) if is_retryable(&e) => {}
                Err(_) => return PollResult::Error,
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return PollResult::Timeout;
            }
        }
    }

    fn waker(&self) -> SocketWaker {
        self.waker.clone()
    }
}

impl Drop for TcpSocket {
    fn drop(&mut self) {
        self.close();
    }
}

fn dial(host: &str, port: u16, token: &CancellationToken) -> Result<TcpStream, SocketError> {
    token.check()?;

    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| SocketError::Resolve {
            host: host.to_string(),
            reason: e.to_string(),
        })?
        .collect();
    if addrs.is_empty() {
        return Err(SocketError::Resolve {
            host: host.to_string(),
            reason: "no addresses".to_string(),
        });
    }

    let mut last_error = None;
    for addr in addrs {
        token.check()?;
        let attempt = match token.remaining() {
            Some(remaining) => {
                TcpStream::connect_timeout(&addr, remaining.max(Duration::from_millis(1)))
            }
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                debug!(%addr, "connected");
                return Ok(stream);
            }
            Err(e) => {
                debug!(%addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    token.check()?;
    Err(last_error.map_or(SocketError::NotConnected, SocketError::Io))
}

fn handshake(
    tls: &mut StreamOwned<ClientConnection, TcpStream>,
    token: &CancellationToken,
) -> Result<(), SocketError> {
    while tls.conn.is_handshaking() {
        token.check()?;
        match tls.conn.complete_io(&mut tls.sock) {
            Ok(_) => {}
            Err(e) if is_retryable(&e) => {}
            Err(e) => return Err(SocketError::Tls(format!("handshake failed: {}", e))),
        }
    }
    Ok(())
}

fn is_retryable(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
