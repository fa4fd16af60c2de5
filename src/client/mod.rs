//! HTTP/1.1 client.
//!
//! This module holds the client-facing half of the crate:
//!
//! - **Connection engine**: one exchange at a time over the client's socket,
//!   with redirects, chunked bodies and gzip decoding
//! - **Dispatcher**: optional worker thread running queued requests in order
//! - **Configuration**: serde-backed [`ClientConfig`]
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── fetch       - HttpClient and the convenience verbs
//! ├── connection  - the connection engine
//! ├── parser      - status line, headers, body framing
//! ├── dispatcher  - FIFO queue and worker thread
//! ├── config      - ClientConfig
//! └── utils       - status and header classification
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`HttpClient`] | The client; owns one connection |
//! | [`ClientConfig`] | Construction-time options |
//!
//! # Examples
//!
//! ```
//! use strand_http::client::{is_redirect, ClientConfig, HttpClient};
//!
//! let client = HttpClient::new(ClientConfig::default()).unwrap();
//! assert!(!client.is_async());
//! assert!(is_redirect(307));
//! ```

mod config;
mod connection;
mod dispatcher;
mod fetch;
mod parser;
mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use fetch::HttpClient;
pub use utils::*;
