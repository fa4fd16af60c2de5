//! HTTP/1.1 request serialization.

use bytes::{BufMut, BytesMut};
use http::Method;

use crate::protocol::constants::{headers, values, CRLF, HTTP_VERSION};
use crate::types::HttpRequest;

/// Per-exchange inputs to [`serialize_request`] that don't live on the request.
#[derive(Debug, Clone, Copy)]
pub struct RequestLine<'a> {
    /// Request target (path plus query).
    pub target: &'a str,
    /// Value of the `Host` header.
    pub host: &'a str,
    /// Default `User-Agent`, used when the request has no override.
    pub user_agent: &'a str,
    /// Emit body headers and the body even for verbs that normally have none.
    pub force_body: bool,
    /// Whether a gzip codec is available in this build.
    pub gzip_supported: bool,
}

/// Whether a request with this verb carries a body.
pub fn carries_body(method: &Method, force_body: bool) -> bool {
    force_body || matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Serialize the request line, headers and (when applicable) the body.
///
/// Header order: `Host`, `Accept-Encoding`, caller overrides, defaulted
/// `Accept` and `User-Agent`, then for body-carrying requests
/// `Content-Encoding`, `Content-Length` and a defaulted `Content-Type`.
pub fn serialize_request(request: &HttpRequest, line: RequestLine<'_>) -> BytesMut {
    let mut buf = BytesMut::with_capacity(256 + request.body.len());

    put_line(&mut buf, &format!("{} {} {}", request.method, line.target, HTTP_VERSION));
    put_header(&mut buf, headers::HOST, line.host);

    if request.compress && line.gzip_supported {
        put_header(&mut buf, headers::ACCEPT_ENCODING, values::GZIP);
    }

    for (name, value) in request.headers.iter() {
        put_header(&mut buf, name, value);
    }

    if !request.headers.contains(headers::ACCEPT) {
        put_header(&mut buf, headers::ACCEPT, values::ACCEPT_ANY);
    }
    if !request.headers.contains(headers::USER_AGENT) {
        put_header(&mut buf, headers::USER_AGENT, line.user_agent);
    }

    if carries_body(&request.method, line.force_body) {
        if request.compress_request && line.gzip_supported {
            put_header(&mut buf, headers::CONTENT_ENCODING, values::GZIP);
        }
        put_header(&mut buf, headers::CONTENT_LENGTH, &request.body.len().to_string());

        if !request.headers.contains(headers::CONTENT_TYPE) {
            match request.multipart_boundary() {
                Some(boundary) => put_header(
                    &mut buf,
                    headers::CONTENT_TYPE,
                    &format!("{}{}", values::MULTIPART_FORM_DATA, boundary),
                ),
                None => put_header(&mut buf, headers::CONTENT_TYPE, values::FORM_URLENCODED),
            }
        }

        buf.put_slice(CRLF.as_bytes());
        buf.put_slice(&request.body);
    } else {
        buf.put_slice(CRLF.as_bytes());
    }

    buf
}

fn put_line(buf: &mut BytesMut, line: &str) {
    buf.put_slice(line.as_bytes());
    buf.put_slice(CRLF.as_bytes());
}

fn put_header(buf: &mut BytesMut, name: &str, value: &str) {
    buf.put_slice(name.as_bytes());
    buf.put_slice(b": ");
    buf.put_slice(value.as_bytes());
    buf.put_slice(CRLF.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line<'a>(force_body: bool) -> RequestLine<'a> {
        RequestLine {
            target: "/path?q=1",
            host: "example.com",
            user_agent: "test-agent",
            force_body,
            gzip_supported: true,
        }
    }

    fn text(buf: BytesMut) -> String {
        String::from_utf8(buf.to_vec()).unwrap()
    }

    #[test]
    fn test_get_has_no_body_headers() {
        let request = HttpRequest::get("http://example.com/path?q=1").with_body("ignored");
        let wire = text(serialize_request(&request, line(false)));
        assert_eq!(
            wire,
            "GET /path?q=1 HTTP/1.1\r\n\
             Host: example.com\r\n\
             Accept-Encoding: gzip\r\n\
             Accept: */*\r\n\
             User-Agent: test-agent\r\n\
             \r\n"
        );
    }

    #[test]
    fn test_post_defaults() {
        let request = HttpRequest::post("http://example.com/", "a=1").with_compress(false);
        let wire = text(serialize_request(&request, line(false)));
        assert_eq!(
            wire,
            "POST /path?q=1 HTTP/1.1\r\n\
             Host: example.com\r\n\
             Accept: */*\r\n\
             User-Agent: test-agent\r\n\
             Content-Length: 3\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             \r\n\
             a=1"
        );
    }

    #[test]
    fn test_override_names_are_case_sensitive() {
        let request = HttpRequest::get("http://example.com/")
            .with_compress(false)
            .with_header("X-Tag", "upper")
            .with_header("x-tag", "lower");
        let wire = text(serialize_request(&request, line(false)));
        assert!(wire.contains("X-Tag: upper\r\nx-tag: lower\r\n"));
    }

    #[test]
    fn test_overrides_suppress_defaults() {
        let request = HttpRequest::put("http://example.com/", "{}")
            .with_compress(false)
            .with_header("accept", "application/json")
            .with_header("User-Agent", "mine")
            .with_header("Content-Type", "application/json");
        let wire = text(serialize_request(&request, line(false)));
        assert!(wire.contains("accept: application/json\r\n"));
        assert!(!wire.contains("Accept: */*"));
        assert!(!wire.contains("test-agent"));
        assert!(!wire.contains("x-www-form-urlencoded"));
        assert!(wire.ends_with("Content-Type: application/json\r\nContent-Length: 2\r\n\r\n{}"));
    }

    #[test]
    fn test_multipart_content_type_and_gzip() {
        let mut request =
            HttpRequest::post("http://example.com/", "xx").with_compress_request(true);
        request.multipart_boundary = Some("BOUNDARY".to_string());
        let wire = text(serialize_request(&request, line(false)));
        assert!(wire.contains("Content-Encoding: gzip\r\n"));
        assert!(wire.contains("Content-Type: multipart/form-data; boundary=BOUNDARY\r\n"));
    }

    #[test]
    fn test_force_body_on_get() {
        let request = HttpRequest::get("http://example.com/").with_body("b");
        let wire = text(serialize_request(&request, line(true)));
        assert!(wire.contains("Content-Length: 1\r\n"));
        assert!(wire.ends_with("\r\n\r\nb"));
    }

    #[test]
    fn test_no_gzip_headers_without_codec() {
        let request = HttpRequest::post("http://example.com/", "x").with_compress_request(true);
        let mut no_gzip = line(false);
        no_gzip.gzip_supported = false;
        let wire = text(serialize_request(&request, no_gzip));
        assert!(!wire.contains("gzip"));
    }

    #[test]
    fn test_carries_body() {
        assert!(carries_body(&Method::POST, false));
        assert!(carries_body(&Method::PATCH, false));
        assert!(!carries_body(&Method::DELETE, false));
        assert!(carries_body(&Method::DELETE, true));
    }
}
