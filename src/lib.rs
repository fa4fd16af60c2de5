#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! ## Overview
//!
//! One [`HttpClient`] owns one connection. An exchange walks a fixed sequence
//! of steps, and the first one that fails decides the [`ErrorKind`] of the
//! returned [`HttpResponse`]:
//!
//! 1. **URL** - parse into scheme, host, port and request target
//! 2. **Socket** - plain or TLS, created through a [`net::SocketFactory`]
//! 3. **Connect / send** - bounded by the connect and transfer deadlines
//! 4. **Status line and headers**
//! 5. **Redirects** - 301..=308 with a `Location`, up to the redirect budget
//! 6. **Body** - `Content-Length`, chunked, or empty for 204
//! 7. **Decode** - gzip through the build's [`codec::ContentCodec`]
//!
//! Failures never surface as `Err`: the response carries the status code and
//! headers obtained before the failing step plus a diagnostic message.
//!
//! ## Timeouts and cancellation
//!
//! Every blocking socket call takes a [`CancellationToken`] combining the
//! phase deadline with the client's stop flag. The transfer deadline covers
//! sending the request and reading the whole response; it is not renewed when
//! bytes arrive. Each redirect hop gets fresh deadlines.
//!
//! ## Cargo features
//!
//! | Feature | Default | Effect |
//! |---------|---------|--------|
//! | `gzip` | yes | streaming gzip backend as the default codec |
//! | `gzip-sized` | no | trailer-sized gzip backend as the default when `gzip` is off |
//!
//! Either feature builds both backends, so [`codec::SizedGzip`] and
//! [`codec::StreamingGzip`] can always be injected when gzip is enabled.
//! With neither, gzip is not advertised and gzip responses fail with
//! [`ErrorKind::Gzip`].
//!
//! ## Module Structure
//!
//! - **[client]** - `HttpClient`, the connection engine and the dispatcher
//! - **[protocol]** - wire constants, header parsing, request serialization, form encoding
//! - **[net]** - URL parsing, sockets, TLS
//! - **[codec]** - gzip backends
//! - **[cancel]** - cancellation tokens
//! - **[types]** - `HttpRequest` and `HttpResponse`
//! - **[error]** - error kinds and error types

pub mod cancel;
pub mod client;
pub mod codec;
pub mod error;
pub mod net;
pub mod protocol;
pub mod types;

pub use cancel::CancellationToken;
pub use client::{ClientConfig, HttpClient};
pub use error::{ErrorKind, HttpError, Result};
pub use net::TlsOptions;
pub use types::{HttpRequest, HttpResponse};
