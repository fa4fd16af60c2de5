//! Wire-level constants for HTTP/1.1.

/// Header names, in the canonical casing emitted on the wire.
pub mod headers {
    /// `Host`
    pub const HOST: &str = "Host";
    /// `Accept`
    pub const ACCEPT: &str = "Accept";
    /// `Accept-Encoding`
    pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
    /// `User-Agent`
    pub const USER_AGENT: &str = "User-Agent";
    /// `Content-Length`
    pub const CONTENT_LENGTH: &str = "Content-Length";
    /// `Content-Type`
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// `Content-Encoding`
    pub const CONTENT_ENCODING: &str = "Content-Encoding";
    /// `Transfer-Encoding`
    pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";
    /// `Location`
    pub const LOCATION: &str = "Location";
}

/// Header values the engine emits or recognizes.
pub mod values {
    /// Default `Accept` value.
    pub const ACCEPT_ANY: &str = "*/*";
    /// The only content coding supported.
    pub const GZIP: &str = "gzip";
    /// Chunked transfer coding.
    pub const CHUNKED: &str = "chunked";
    /// Default `Content-Type` for request bodies.
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    /// `Content-Type` prefix for multipart bodies; the boundary is appended.
    pub const MULTIPART_FORM_DATA: &str = "multipart/form-data; boundary=";
    /// `Content-Type` of file parts in a multipart body.
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Line terminator.
pub const CRLF: &str = "\r\n";

/// Protocol token written on the request line.
pub const HTTP_VERSION: &str = "HTTP/1.1";

/// Status codes treated as redirects when redirect following is enabled.
pub const REDIRECT_CODES: std::ops::RangeInclusive<u16> = 301..=308;

/// `204 No Content`, the only status allowed to omit body framing.
pub const NO_CONTENT: u16 = 204;
