//! URL decomposition for the connection engine.

use url::{Host, Url};

/// The pieces of a URL the engine needs to open a connection and write the
/// request line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    /// Scheme, lowercase (`http`, `https`, `ws`, `wss`).
    pub protocol: String,
    /// Host to connect to. IPv6 literals are unbracketed.
    pub host: String,
    /// Request target: path plus `?query` when a query is present.
    pub path: String,
    /// Query string without the leading `?`; empty when absent.
    pub query: String,
    /// Explicit port, or the scheme default.
    pub port: u16,
}

impl UrlParts {
    /// Whether the scheme requires TLS.
    pub fn is_tls(&self) -> bool {
        matches!(self.protocol.as_str(), "https" | "wss")
    }

    /// Value for the `Host` header: brackets IPv6 literals and appends the port
    /// when it differs from the scheme default.
    pub fn host_header(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let default_port = if self.is_tls() { 443 } else { 80 };
        if self.port == default_port {
            host
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

/// Split `url` into connection parts. Returns `None` for unparsable URLs,
/// unsupported schemes and URLs without a host.
///
/// # Examples
///
/// ```
/// use strand_http::net::parse_url;
///
/// let parts = parse_url("https://example.com/a/b?x=1").unwrap();
/// assert_eq!(parts.host, "example.com");
/// assert_eq!(parts.port, 443);
/// assert_eq!(parts.path, "/a/b?x=1");
/// assert!(parts.is_tls());
///
/// assert!(parse_url("ftp://example.com/").is_none());
/// assert!(parse_url("not a url").is_none());
/// ```
pub fn parse_url(url: &str) -> Option<UrlParts> {
    let parsed = Url::parse(url).ok()?;
    let protocol = parsed.scheme().to_ascii_lowercase();
    if !matches!(protocol.as_str(), "http" | "https" | "ws" | "wss") {
        return None;
    }

    let host = match parsed.host()? {
        Host::Domain(domain) if !domain.is_empty() => domain.to_string(),
        Host::Domain(_) => return None,
        Host::Ipv4(addr) => addr.to_string(),
        Host::Ipv6(addr) => addr.to_string(),
    };
    let port = parsed.port_or_known_default()?;
    let query = parsed.query().unwrap_or("").to_string();

    let mut path = parsed.path().to_string();
    if path.is_empty() {
        path.push('/');
    }
    if let Some(q) = parsed.query() {
        path.push('?');
        path.push_str(q);
    }

    Some(UrlParts {
        protocol,
        host,
        path,
        query,
        port,
    })
}

/// Resolve a redirect `Location` against the URL that produced it.
///
/// Absolute locations are returned normalized; relative ones are joined onto
/// `base`. Returns `None` when neither works.
pub fn resolve_location(base: &str, location: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(location) {
        return Some(absolute.into());
    }
    Url::parse(base)
        .ok()?
        .join(location)
        .ok()
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(parse_url("http://a.test/").unwrap().port, 80);
        assert_eq!(parse_url("https://a.test/").unwrap().port, 443);
        assert_eq!(parse_url("ws://a.test/").unwrap().port, 80);
        assert_eq!(parse_url("wss://a.test/").unwrap().port, 443);
    }

    #[test]
    fn test_explicit_port_and_host_header() {
        let parts = parse_url("http://127.0.0.1:8080").unwrap();
        assert_eq!(parts.port, 8080);
        assert_eq!(parts.path, "/");
        assert_eq!(parts.host_header(), "127.0.0.1:8080");
        assert!(!parts.is_tls());
    }

    #[test]
    fn test_ipv6_host() {
        let parts = parse_url("http://[::1]:9000/x").unwrap();
        assert_eq!(parts.host, "::1");
        assert_eq!(parts.host_header(), "[::1]:9000");
    }

    #[test]
    fn test_query_is_kept_in_path() {
        let parts = parse_url("http://a.test/search?q=a%20b").unwrap();
        assert_eq!(parts.path, "/search?q=a%20b");
        assert_eq!(parts.query, "q=a%20b");
    }

    #[test]
    fn test_malformed() {
        assert!(parse_url("").is_none());
        assert!(parse_url("http://").is_none());
        assert!(parse_url("mailto:someone@example.com").is_none());
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location("http://a.test/x/y", "/z").as_deref(),
            Some("http://a.test/z")
        );
        assert_eq!(
            resolve_location("http://a.test/x/y", "w").as_deref(),
            Some("http://a.test/x/w")
        );
        assert_eq!(
            resolve_location("http://a.test/", "https://b.test/q").as_deref(),
            Some("https://b.test/q")
        );
    }
}
