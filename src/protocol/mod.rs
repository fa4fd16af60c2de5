//! HTTP/1.1 wire protocol: constants, header parsing, request serialization,
//! and parameter/multipart encoding.
//!
//! Everything in here is pure: no sockets, no clocks. The connection engine in
//! [`client`](crate::client) drives these functions over a live socket.

pub mod constants;
mod headers;
mod params;
mod request;

pub use headers::{parse_chunk_size, parse_header_line, parse_status_line, Headers};
pub use params::{
    generate_multipart_boundary, serialize_multipart, serialize_params, url_decode, url_encode,
};
pub use request::{carries_body, serialize_request, RequestLine};

/// Default `User-Agent` sent when the request does not override it.
///
/// ```
/// assert!(strand_http::protocol::user_agent().starts_with("strand_http/"));
/// ```
pub fn user_agent() -> String {
    format!(
        "{}/{} ({}; {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
