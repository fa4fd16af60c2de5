//! Small response classification helpers.

use crate::protocol::constants::{headers, values, REDIRECT_CODES};
use crate::protocol::Headers;

/// Whether `status` is one of the redirect codes the client follows (301..=308).
///
/// # Examples
///
/// ```
/// use strand_http::client::is_redirect;
///
/// assert!(is_redirect(302));
/// assert!(is_redirect(308));
/// assert!(!is_redirect(300));
/// assert!(!is_redirect(200));
/// ```
pub fn is_redirect(status: u16) -> bool {
    REDIRECT_CODES.contains(&status)
}

/// Whether `status` is a 2xx code.
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Whether the response declares `Content-Encoding: gzip`.
pub fn is_gzip_encoded(response: &Headers) -> bool {
    header_is(response, headers::CONTENT_ENCODING, values::GZIP)
}

/// Whether the response declares `Transfer-Encoding: chunked`.
pub fn is_chunked(response: &Headers) -> bool {
    header_is(response, headers::TRANSFER_ENCODING, values::CHUNKED)
}

fn header_is(response: &Headers, name: &str, expected: &str) -> bool {
    response
        .get(name)
        .is_some_and(|value| value.trim().eq_ignore_ascii_case(expected))
}
