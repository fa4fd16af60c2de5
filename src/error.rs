//! Error types for the HTTP client.
//!
//! Two layers of errors exist in this crate:
//!
//! - [`ErrorKind`] classifies the outcome of a single HTTP exchange. It is carried
//!   inside every [`HttpResponse`](crate::HttpResponse), including successful ones
//!   (`ErrorKind::Ok`). Exchanges never fail through `Result`; a failed exchange is
//!   a fully populated response record.
//! - [`HttpError`] covers misuse of the client API and configuration problems,
//!   things that happen *outside* of an exchange (submitting to a synchronous
//!   client, loading a broken configuration file, ...).
//!
//! Collaborators have their own error enums ([`SocketError`], [`CodecError`]) which
//! the connection engine folds into an [`ErrorKind`] plus a diagnostic message.

use std::fmt;
use std::io;

/// Outcome classification of one HTTP exchange.
///
/// Checks performed by the connection engine are strictly ordered; the first
/// failing check determines the kind and no later step is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorKind {
    /// The exchange completed.
    #[default]
    Ok,
    /// The URL could not be parsed.
    UrlMalformed,
    /// The socket factory refused to create a socket.
    CannotCreateSocket,
    /// Connecting to the remote host failed or timed out.
    CannotConnect,
    /// Writing the serialized request failed.
    SendError,
    /// No status line could be read.
    CannotReadStatusLine,
    /// The status line did not carry a numeric status code.
    MissingStatus,
    /// The response header block was malformed.
    HeaderParsingError,
    /// A redirect response had no `Location` header.
    MissingLocation,
    /// The redirect budget was exhausted.
    TooManyRedirects,
    /// Reading a fixed-length or chunked body failed.
    ChunkReadError,
    /// The response had no recognizable body framing.
    CannotReadBody,
    /// Gzip decoding failed or is not supported by this build.
    Gzip,
}

impl ErrorKind {
    /// Stable name of the kind, as used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Ok => "Ok",
            ErrorKind::UrlMalformed => "UrlMalformed",
            ErrorKind::CannotCreateSocket => "CannotCreateSocket",
            ErrorKind::CannotConnect => "CannotConnect",
            ErrorKind::SendError => "SendError",
            ErrorKind::CannotReadStatusLine => "CannotReadStatusLine",
            ErrorKind::MissingStatus => "MissingStatus",
            ErrorKind::HeaderParsingError => "HeaderParsingError",
            ErrorKind::MissingLocation => "MissingLocation",
            ErrorKind::TooManyRedirects => "TooManyRedirects",
            ErrorKind::ChunkReadError => "ChunkReadError",
            ErrorKind::CannotReadBody => "CannotReadBody",
            ErrorKind::Gzip => "Gzip",
        }
    }

    /// Whether this kind denotes a successful exchange.
    #[inline]
    pub fn is_ok(&self) -> bool {
        matches!(self, ErrorKind::Ok)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by the client API itself, as opposed to exchange outcomes.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// `submit` was called on a client constructed in synchronous mode.
    #[error("client was not created in asynchronous mode")]
    NotAsync,

    /// The dispatcher is shutting down and no longer accepts work.
    #[error("client is shutting down")]
    ShuttingDown,

    /// The configuration could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error while loading configuration or certificates.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors produced by socket collaborators.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// The operation was cancelled through the instance stop flag.
    #[error("operation cancelled")]
    Cancelled,

    /// The phase deadline elapsed.
    #[error("operation timed out")]
    TimedOut,

    /// The peer closed the connection before the operation completed.
    #[error("connection closed by peer")]
    Closed,

    /// The socket has not been connected.
    #[error("socket is not connected")]
    NotConnected,

    /// Host name resolution failed.
    #[error("could not resolve {host}: {reason}")]
    Resolve {
        /// The host that failed to resolve.
        host: String,
        /// Resolver message.
        reason: String,
    },

    /// A line exceeded the maximum accepted length.
    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),

    /// The caller's progress callback asked to abort the transfer.
    #[error("transfer aborted by progress callback")]
    Aborted,

    /// TLS configuration or handshake error.
    #[error("tls error: {0}")]
    Tls(String),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<rustls::Error> for SocketError {
    fn from(err: rustls::Error) -> Self {
        SocketError::Tls(err.to_string())
    }
}

/// Errors produced by content codecs.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// This build has no gzip backend.
    #[error("gzip is not supported by this build")]
    Unsupported,

    /// The input is not a valid gzip member.
    #[error("corrupt gzip data: {0}")]
    Corrupt(String),

    /// The input ended before the gzip member was complete.
    #[error("truncated gzip data")]
    Truncated,

    /// I/O error from the streaming backend.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for client API operations.
pub type Result<T> = std::result::Result<T, HttpError>;
