//! Header storage and line-level parsing for HTTP/1.1.
//!
//! # Formats
//!
//! | Line | Format | Example |
//! |------|--------|---------|
//! | Status line | `HTTP/1.1 <code> <reason>` | `HTTP/1.1 200 OK` |
//! | Header | `Name: value` | `Content-Length: 5` |
//! | Chunk size | hex digits, optional `;ext` | `1a;name=value` |
//!
//! # Examples
//!
//! ```
//! use strand_http::protocol::{parse_status_line, parse_header_line, parse_chunk_size};
//!
//! assert_eq!(parse_status_line("HTTP/1.1 404 Not Found"), Some(404));
//! assert_eq!(
//!     parse_header_line("Content-Type: text/plain"),
//!     Some(("Content-Type".to_string(), "text/plain".to_string()))
//! );
//! assert_eq!(parse_chunk_size("1A"), Some(26));
//! ```

use std::fmt;

/// Ordered header collection with case-insensitive lookup.
///
/// Names keep the casing they were inserted with and the order callers chose.
/// Inserting a name that is already present (ignoring case) replaces the value in
/// place, so the last value received wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Create an empty header collection.
    pub fn new() -> Self {
        Headers {
            entries: Vec::new(),
        }
    }

    /// Insert or replace a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Insert a header, replacing only an entry whose name matches `name`
    /// exactly. `Foo` and `foo` become two entries.
    pub fn insert_exact(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter().position(|(n, _)| *n == name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Look up a header value, ignoring the case of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    /// Whether a header is present, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Remove a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Headers {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.entries {
            write!(f, "{}: {}\r\n", k, v)?;
        }
        Ok(())
    }
}

/// Extract the numeric status code from a status line.
///
/// Accepts `HTTP/1.1` (and `HTTP/1.0`) followed by a space and a run of up to
/// three digits. The reason phrase is ignored.
///
/// # Examples
///
/// ```
/// use strand_http::protocol::parse_status_line;
///
/// assert_eq!(parse_status_line("HTTP/1.1 204 No Content"), Some(204));
/// assert_eq!(parse_status_line("HTTP/1.1 301"), Some(301));
/// assert_eq!(parse_status_line("SPDY/3 200 OK"), None);
/// assert_eq!(parse_status_line("HTTP/1.1 OK"), None);
/// ```
pub fn parse_status_line(line: &str) -> Option<u16> {
    let rest = line
        .strip_prefix("HTTP/1.1 ")
        .or_else(|| line.strip_prefix("HTTP/1.0 "))?
        .trim_start();

    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 || digits > 3 {
        return None;
    }
    rest[..digits].parse().ok()
}

/// Split a `Name: value` header line.
///
/// The name must be non-empty and free of whitespace; surrounding whitespace
/// is trimmed from the value. Returns `None` for anything else.
///
/// # Examples
///
/// ```
/// use strand_http::protocol::parse_header_line;
///
/// let (name, value) = parse_header_line("Location:  /next ").unwrap();
/// assert_eq!(name, "Location");
/// assert_eq!(value, "/next");
///
/// assert!(parse_header_line("no colon here").is_none());
/// assert!(parse_header_line(": empty name").is_none());
/// ```
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let colon = line.find(':')?;
    let name = &line[..colon];
    if name.is_empty() || name.bytes().any(|b| b.is_ascii_whitespace()) {
        return None;
    }
    let value = line[colon + 1..].trim();
    Some((name.to_string(), value.to_string()))
}

/// Parse a chunk-size line of a chunked body.
///
/// Chunk extensions (after `;`) are ignored. Non-hex input and sizes that do
/// not fit in a `u64` yield `None`.
///
/// # Examples
///
/// ```
/// use strand_http::protocol::parse_chunk_size;
///
/// assert_eq!(parse_chunk_size("0"), Some(0));
/// assert_eq!(parse_chunk_size("ff;foo=bar"), Some(255));
/// assert_eq!(parse_chunk_size("zz"), None);
/// assert_eq!(parse_chunk_size(""), None);
/// ```
pub fn parse_chunk_size(line: &str) -> Option<u64> {
    let size = line.split(';').next().unwrap_or("").trim();
    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(size, 16).ok()
}
