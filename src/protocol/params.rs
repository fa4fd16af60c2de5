//! URL parameter encoding and multipart form-data bodies.
//!
//! # Examples
//!
//! ```
//! use strand_http::protocol::{url_encode, url_decode, serialize_params};
//!
//! assert_eq!(url_encode(b"a b&c"), "a%20b%26c");
//! assert_eq!(url_decode("a%20b%26c"), b"a b&c");
//!
//! let body = serialize_params([("q", "rust lang"), ("page", "2")]);
//! assert_eq!(body, "q=rust%20lang&page=2");
//! ```

use rand::seq::SliceRandom;

use crate::protocol::constants::{values, CRLF};

/// Characters a multipart boundary is drawn from.
const BOUNDARY_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Percent-encode arbitrary bytes.
///
/// ASCII alphanumerics and `-_.~` pass through; every other byte becomes `%XX`
/// with uppercase hex digits.
pub fn url_encode(value: &[u8]) -> String {
    let mut out = String::with_capacity(value.len());
    for &b in value {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX_UPPER[(b >> 4) as usize] as char);
            out.push(HEX_UPPER[(b & 0x0f) as usize] as char);
        }
    }
    out
}

/// Decode a percent-encoded string into raw bytes.
///
/// A `%` not followed by two hex digits is kept literally.
pub fn url_decode(value: &str) -> Vec<u8> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    out
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Serialize key/value pairs as `application/x-www-form-urlencoded`.
///
/// Pairs are emitted in iteration order; pass an ordered collection when the
/// output must be stable.
pub fn serialize_params<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<[u8]>,
    V: AsRef<[u8]>,
{
    params
        .into_iter()
        .map(|(k, v)| format!("{}={}", url_encode(k.as_ref()), url_encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build a `multipart/form-data` body.
///
/// `files` become parts with a `filename` and an octet-stream content type;
/// `params` become plain form fields. The body ends with the closing
/// `--boundary--` line.
pub fn serialize_multipart<F, FK, FV, P, PK, PV>(boundary: &str, files: F, params: P) -> Vec<u8>
where
    F: IntoIterator<Item = (FK, FV)>,
    FK: AsRef<str>,
    FV: AsRef<[u8]>,
    P: IntoIterator<Item = (PK, PV)>,
    PK: AsRef<str>,
    PV: AsRef<[u8]>,
{
    let mut body = Vec::new();

    for (name, value) in files {
        let name = name.as_ref();
        body.extend_from_slice(format!("--{boundary}{CRLF}").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}\"{CRLF}")
                .as_bytes(),
        );
        body.extend_from_slice(
            format!("Content-Type: {}{CRLF}{CRLF}", values::OCTET_STREAM).as_bytes(),
        );
        body.extend_from_slice(value.as_ref());
        body.extend_from_slice(CRLF.as_bytes());
    }

    for (name, value) in params {
        let name = name.as_ref();
        body.extend_from_slice(format!("--{boundary}{CRLF}").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"{CRLF}{CRLF}").as_bytes(),
        );
        body.extend_from_slice(value.as_ref());
        body.extend_from_slice(CRLF.as_bytes());
    }

    body.extend_from_slice(format!("--{boundary}--{CRLF}").as_bytes());
    body
}

/// Generate a 62-character multipart boundary.
///
/// The boundary is a random permutation of the alphanumeric alphabet, drawn from
/// the calling thread's generator. Collisions with body content are not checked.
pub fn generate_multipart_boundary() -> String {
    let mut alphabet = *BOUNDARY_ALPHABET;
    alphabet.shuffle(&mut rand::rng());
    alphabet.iter().map(|&b| b as char).collect()
}
