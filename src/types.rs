//! Request and response types.
//!
//! [`HttpRequest`] describes what to send and how (timeouts, redirects,
//! compression, callbacks). [`HttpResponse`] is the immutable record of one
//! exchange outcome, successful or not.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;

use crate::error::ErrorKind;
use crate::protocol::Headers;

/// Progress callback: `(bytes_so_far, bytes_expected)`. Return `false` to abort.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) -> bool + Send + Sync>;

/// Verbose log sink, invoked only when [`HttpRequest::verbose`] is set.
pub type LogCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Completion callback for queued requests.
pub type ResponseCallback = Box<dyn FnOnce(HttpResponse) + Send + 'static>;

/// Default connect-phase timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default transfer-phase timeout.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(1800);

/// Default redirect budget.
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;

/// An HTTP request specification.
///
/// Header overrides are sent verbatim in the order given. Their names are
/// case-sensitive: `with_header("Foo", ..)` and `with_header("foo", ..)` send
/// two headers. `Accept`, `User-Agent` and `Content-Type` defaults are only
/// added when no override with that name (ignoring case) exists.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use strand_http::HttpRequest;
///
/// let request = HttpRequest::get("http://example.com/data")
///     .with_header("X-Trace", "abc")
///     .with_transfer_timeout(Duration::from_secs(5))
///     .with_max_redirects(2);
///
/// assert_eq!(request.max_redirects, 2);
/// assert_eq!(request.headers.get("x-trace"), Some("abc"));
/// ```
#[derive(Clone)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// HTTP verb.
    pub method: Method,
    /// Request body. Only sent for body-carrying verbs (or with `force_body`).
    pub body: Bytes,
    /// Header overrides, emitted in order.
    pub headers: Headers,
    /// Advertise `Accept-Encoding: gzip` and decode gzip responses.
    pub compress: bool,
    /// Send `Content-Encoding: gzip` with the body.
    pub compress_request: bool,
    /// Connect-phase deadline.
    pub connect_timeout: Duration,
    /// Transfer-phase deadline, cumulative over send, headers and body.
    pub transfer_timeout: Duration,
    /// Redirect budget.
    pub max_redirects: u32,
    /// Follow 301..=308 responses.
    pub follow_redirects: bool,
    /// Emit verbose diagnostics through `logger`.
    pub verbose: bool,
    /// Body download progress.
    pub on_progress: Option<ProgressCallback>,
    /// Verbose log sink.
    pub logger: Option<LogCallback>,
    pub(crate) multipart_boundary: Option<String>,
}

impl HttpRequest {
    /// Create a request with default settings.
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        HttpRequest {
            url: url.into(),
            method,
            body: Bytes::new(),
            headers: Headers::new(),
            compress: true,
            compress_request: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            transfer_timeout: DEFAULT_TRANSFER_TIMEOUT,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            follow_redirects: true,
            verbose: false,
            on_progress: None,
            logger: None,
            multipart_boundary: None,
        }
    }

    /// `GET` request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, Method::GET)
    }

    /// `HEAD` request.
    pub fn head(url: impl Into<String>) -> Self {
        Self::new(url, Method::HEAD)
    }

    /// `DELETE` request.
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(url, Method::DELETE)
    }

    /// `POST` request with a raw body.
    pub fn post(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(url, Method::POST).with_body(body)
    }

    /// `PUT` request with a raw body.
    pub fn put(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(url, Method::PUT).with_body(body)
    }

    /// `PATCH` request with a raw body.
    pub fn patch(url: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(url, Method::PATCH).with_body(body)
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header override, replacing one with exactly the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert_exact(name, value);
        self
    }

    /// Toggle gzip response negotiation.
    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Toggle gzip request bodies.
    pub fn with_compress_request(mut self, compress_request: bool) -> Self {
        self.compress_request = compress_request;
        self
    }

    /// Set the connect-phase timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the transfer-phase timeout.
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = timeout;
        self
    }

    /// Set the redirect budget.
    pub fn with_max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = max;
        self
    }

    /// Enable or disable redirect following.
    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Install a verbose log sink and turn verbose logging on.
    pub fn with_logger<F>(mut self, logger: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.logger = Some(Arc::new(logger));
        self.verbose = true;
        self
    }

    /// Install a download progress callback.
    pub fn with_progress<F>(mut self, on_progress: F) -> Self
    where
        F: Fn(u64, u64) -> bool + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(on_progress));
        self
    }

    /// Multipart boundary assigned by the client for form-data bodies.
    pub fn multipart_boundary(&self) -> Option<&str> {
        self.multipart_boundary.as_deref()
    }

    pub(crate) fn log(&self, message: &str) {
        if !self.verbose {
            return;
        }
        if let Some(logger) = &self.logger {
            logger(message);
        }
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("body_len", &self.body.len())
            .field("headers", &self.headers)
            .field("compress", &self.compress)
            .field("compress_request", &self.compress_request)
            .field("connect_timeout", &self.connect_timeout)
            .field("transfer_timeout", &self.transfer_timeout)
            .field("max_redirects", &self.max_redirects)
            .field("follow_redirects", &self.follow_redirects)
            .field("verbose", &self.verbose)
            .field("multipart_boundary", &self.multipart_boundary)
            .finish_non_exhaustive()
    }
}

/// The outcome of one HTTP exchange.
///
/// Built exactly once per terminal outcome. A failed exchange still carries
/// whatever was obtained before the failing step: the status code (0 if the
/// status line was never parsed), headers, and the upload size once the request
/// bytes left the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    error: ErrorKind,
    headers: Headers,
    payload: Bytes,
    description: String,
    upload_size: u64,
    download_size: u64,
}

impl HttpResponse {
    pub(crate) fn new(
        status: u16,
        error: ErrorKind,
        headers: Headers,
        payload: Bytes,
        description: String,
        upload_size: u64,
        download_size: u64,
    ) -> Self {
        HttpResponse {
            status,
            error,
            headers,
            payload,
            description,
            upload_size,
            download_size,
        }
    }

    /// Status code, or 0 if none was obtained.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Outcome classification.
    pub fn error(&self) -> ErrorKind {
        self.error
    }

    /// Whether the exchange completed (regardless of the status code).
    pub fn is_ok(&self) -> bool {
        self.error.is_ok()
    }

    /// Response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Response body, decoded if it was gzip-encoded.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Body as UTF-8 text, lossily converted.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Diagnostic message; empty on success.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Bytes of the serialized request written to the socket.
    pub fn upload_size(&self) -> u64 {
        self.upload_size
    }

    /// Bytes of body received, before content decoding.
    pub fn download_size(&self) -> u64 {
        self.download_size
    }

    /// Consume the response, returning the payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}
