//! HTTP/1.0 Framing Types
//!
//! The proxy speaks a deliberately small subset of HTTP: CRLF-terminated
//! lines, a request or status line, a header block closed by a blank line,
//! and a body that ends when the origin closes the connection.
//!
//! ## Request Shapes
//!
//! ```text
//! GET http://example.com:8080/a.html HTTP/1.1\r\n     <- absolute target
//! GET /a.html HTTP/1.1\r\n                            <- relative target,
//! Host: example.com:8080\r\n                             host from header
//! ```
//!
//! Both resolve to the same [`Request`]:
//! `host = "example.com"`, `port = 8080`, `path = "/a.html"`.

/// CRLF line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Port used when the target carries none
pub const DEFAULT_ORIGIN_PORT: u16 = 80;

/// Path used when the target carries none
pub const DEFAULT_PATH: &str = "/";

/// Version token written on every request sent to an origin.
///
/// Downgrading to 1.0 keeps origins from answering with chunked bodies or
/// holding the connection open, which the close-delimited relay relies on.
pub const HTTP_1_0: &str = "HTTP/1.0";

/// Maximum length of a single request, status, or header line (8 KB)
pub const MAX_LINE_LENGTH: usize = 8192;

/// The three tokens of a request line, before any target resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: String,
}

/// The pieces of an authority-plus-path split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authority {
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// A fully resolved client request.
///
/// Lives for exactly one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Request method, forwarded as-is
    pub method: String,
    /// Absolute form of the target; used as the cache key
    pub target_uri: String,
    /// Version the client declared (never forwarded)
    pub version: String,
    /// Origin host name or address
    pub host: String,
    /// Origin port
    pub port: u16,
    /// Origin-relative path, always starting with `/`
    pub path: String,
}

impl Request {
    /// Renders the request line sent to the origin: `METHOD SP path SP HTTP/1.0 CRLF`.
    pub fn origin_request_line(&self) -> String {
        format!("{} {} {}\r\n", self.method, self.path, HTTP_1_0)
    }

    /// Returns true if responses to this request may be cached.
    #[inline]
    pub fn is_cacheable(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Header categories that drive the request forwarding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Connection,
    ProxyConnection,
    Host,
    UserAgent,
    Cookie,
    KeepAlive,
    Other,
}

impl HeaderKind {
    /// Maps a header name to its kind, ignoring ASCII case.
    pub fn from_name(name: &str) -> Self {
        const KNOWN: [(&str, HeaderKind); 6] = [
            ("Connection", HeaderKind::Connection),
            ("Proxy-Connection", HeaderKind::ProxyConnection),
            ("Host", HeaderKind::Host),
            ("User-Agent", HeaderKind::UserAgent),
            ("Cookie", HeaderKind::Cookie),
            ("Keep-Alive", HeaderKind::KeepAlive),
        ];

        KNOWN
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, kind)| *kind)
            .unwrap_or(HeaderKind::Other)
    }
}

/// Returns true if `line` is the blank line closing a header block.
#[inline]
pub fn is_blank_line(line: &[u8]) -> bool {
    line == CRLF || line == b"\n"
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, path: &str) -> Request {
        Request {
            method: method.to_string(),
            target_uri: format!("http://example.com{}", path),
            version: "HTTP/1.1".to_string(),
            host: "example.com".to_string(),
            port: DEFAULT_ORIGIN_PORT,
            path: path.to_string(),
        }
    }

    #[test]
    fn test_origin_request_line_downgrades_version() {
        let req = request("GET", "/a.html");
        assert_eq!(req.origin_request_line(), "GET /a.html HTTP/1.0\r\n");
    }

    #[test]
    fn test_only_get_is_cacheable() {
        assert!(request("GET", "/").is_cacheable());
        assert!(request("get", "/").is_cacheable());
        assert!(!request("POST", "/").is_cacheable());
        assert!(!request("HEAD", "/").is_cacheable());
    }

    #[test]
    fn test_header_kind_from_name() {
        assert_eq!(HeaderKind::from_name("Connection"), HeaderKind::Connection);
        assert_eq!(
            HeaderKind::from_name("proxy-connection"),
            HeaderKind::ProxyConnection
        );
        assert_eq!(HeaderKind::from_name("HOST"), HeaderKind::Host);
        assert_eq!(HeaderKind::from_name("User-Agent"), HeaderKind::UserAgent);
        assert_eq!(HeaderKind::from_name("Cookie"), HeaderKind::Cookie);
        assert_eq!(HeaderKind::from_name("Keep-Alive"), HeaderKind::KeepAlive);
        assert_eq!(HeaderKind::from_name("X-Custom"), HeaderKind::Other);
        assert_eq!(HeaderKind::from_name("Cookies"), HeaderKind::Other);
    }

    #[test]
    fn test_blank_line() {
        assert!(is_blank_line(b"\r\n"));
        assert!(is_blank_line(b"\n"));
        assert!(!is_blank_line(b" \r\n"));
        assert!(!is_blank_line(b""));
    }
}
