//! Response parsing over a live socket.
//!
//! Line-oriented readers for the status line and header block, framing
//! selection, and the fixed-length and chunked body decoders. Every reader
//! takes the transfer-phase [`CancellationToken`] and maps socket failures to
//! the [`ErrorKind`] of the step that failed.
//!
//! # Parsing Flow
//!
//! 1. **Status line**: `HTTP/1.1 <code> <reason>`
//! 2. **Headers**: `Name: value` lines up to the first blank line
//! 3. **Framing**: `Content-Length`, else `Transfer-Encoding: chunked`, else 204
//! 4. **Body**: exactly `Content-Length` bytes, or chunks until a zero size

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::cancel::CancellationToken;
use crate::client::connection::Failure;
use crate::client::utils::is_chunked;
use crate::error::{ErrorKind, SocketError};
use crate::net::Socket;
use crate::protocol::constants::{headers, NO_CONTENT};
use crate::protocol::{parse_chunk_size, parse_header_line, parse_status_line, Headers};
use crate::types::ProgressCallback;

/// Most header lines accepted in one response.
pub(crate) const MAX_HEADERS: usize = 256;

/// How the response body is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Framing {
    /// Exactly this many bytes follow the header block.
    Fixed(u64),
    /// Chunked transfer coding.
    Chunked,
    /// `204 No Content`: no body.
    Empty,
}

/// Read the status line and extract the status code.
pub(crate) fn read_status(
    socket: &mut dyn Socket,
    token: &CancellationToken,
) -> Result<u16, Failure> {
    let line = socket.read_line(token).map_err(|e| {
        Failure::new(
            ErrorKind::CannotReadStatusLine,
            format!("cannot read status line: {}", e),
        )
    })?;
    trace!(%line, "status line");

    parse_status_line(&line).ok_or_else(|| {
        Failure::new(
            ErrorKind::MissingStatus,
            format!("no status code in status line {:?}", line),
        )
    })
}

/// Read header lines into `out` until the blank line that ends the block.
///
/// Headers read before a failure stay in `out`.
pub(crate) fn read_headers(
    socket: &mut dyn Socket,
    token: &CancellationToken,
    out: &mut Headers,
) -> Result<(), Failure> {
    let mut count = 0;
    loop {
        let line = socket.read_line(token).map_err(|e| {
            Failure::new(
                ErrorKind::HeaderParsingError,
                format!("cannot read header line: {}", e),
            )
        })?;
        if line.is_empty() {
            return Ok(());
        }

        count += 1;
        if count > MAX_HEADERS {
            return Err(Failure::new(
                ErrorKind::HeaderParsingError,
                format!("more than {} header lines", MAX_HEADERS),
            ));
        }

        let (name, value) = parse_header_line(&line).ok_or_else(|| {
            Failure::new(
                ErrorKind::HeaderParsingError,
                format!("malformed header line {:?}", line),
            )
        })?;
        out.insert(name, value);
    }
}

/// Decide how the body is framed.
///
/// `Content-Length` wins over a 204 status; carrying both `Content-Length` and
/// `Transfer-Encoding: chunked` is rejected.
pub(crate) fn select_framing(status: u16, response: &Headers) -> Result<Framing, Failure> {
    let chunked = is_chunked(response);

    match response.get(headers::CONTENT_LENGTH) {
        Some(_) if chunked => Err(Failure::new(
            ErrorKind::HeaderParsingError,
            "response has both Content-Length and Transfer-Encoding: chunked",
        )),
        Some(length) => length.trim().parse().map(Framing::Fixed).map_err(|_| {
            Failure::new(
                ErrorKind::HeaderParsingError,
                format!("invalid Content-Length {:?}", length),
            )
        }),
        None if chunked => Ok(Framing::Chunked),
        None if status == NO_CONTENT => Ok(Framing::Empty),
        None => Err(Failure::new(
            ErrorKind::CannotReadBody,
            "response has neither Content-Length nor chunked encoding",
        )),
    }
}

/// Read a `Content-Length` body.
pub(crate) fn read_fixed(
    socket: &mut dyn Socket,
    length: u64,
    progress: Option<&ProgressCallback>,
    token: &CancellationToken,
) -> Result<Bytes, Failure> {
    let length = usize::try_from(length).map_err(|_| {
        Failure::new(
            ErrorKind::ChunkReadError,
            format!("Content-Length {} does not fit in memory", length),
        )
    })?;

    socket
        .read_bytes(length, progress, token)
        .map_err(|e| body_failure("cannot read body", e))
}

/// Read a chunked body, returning the concatenated chunk payloads.
pub(crate) fn read_chunked(
    socket: &mut dyn Socket,
    progress: Option<&ProgressCallback>,
    token: &CancellationToken,
) -> Result<Bytes, Failure> {
    let mut body = BytesMut::new();
    loop {
        let line = socket
            .read_line(token)
            .map_err(|e| body_failure("cannot read chunk size", e))?;
        let size = parse_chunk_size(&line).ok_or_else(|| {
            Failure::new(
                ErrorKind::ChunkReadError,
                format!("invalid chunk size {:?}", line),
            )
        })?;
        trace!(size, "chunk");
        if size == 0 {
            socket
                .read_line(token)
                .map_err(|e| body_failure("cannot read final chunk terminator", e))?;
            return Ok(body.freeze());
        }

        let size = usize::try_from(size).map_err(|_| {
            Failure::new(ErrorKind::ChunkReadError, format!("chunk of {} bytes", size))
        })?;
        let chunk = socket
            .read_bytes(size, progress, token)
            .map_err(|e| body_failure("cannot read chunk", e))?;
        body.extend_from_slice(&chunk);

        socket
            .read_line(token)
            .map_err(|e| body_failure("cannot read chunk terminator", e))?;
    }
}

fn body_failure(context: &str, err: SocketError) -> Failure {
    Failure::new(ErrorKind::ChunkReadError, format!("{}: {}", context, err))
}
