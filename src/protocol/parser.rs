//! Request Line and Header Parsing
//!
//! Pure functions that turn the text a client sends into a resolved
//! [`Request`]. None of them touch a socket; the relay reads lines and
//! hands them over as `&str`.
//!
//! ## Resolution Order
//!
//! 1. [`parse_request_line`] splits `METHOD SP target SP version`
//! 2. An absolute target (`http://host[:port]/path`) goes through [`split_authority`]
//! 3. A relative target (`/path`) takes host and port from the `Host` header
//!
//! A relative target with no `Host` header is an error: the proxy has no
//! default virtual host to fall back on.

use crate::protocol::types::{
    Authority, HeaderKind, Request, RequestLine, DEFAULT_ORIGIN_PORT, DEFAULT_PATH,
};
use thiserror::Error;

/// Errors that can occur while parsing a client request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer than three tokens on the request line
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),

    /// A line exceeded the maximum line length
    #[error("line too long (max: {max} bytes)")]
    LineTooLong { max: usize },

    /// Request line or header was not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Target scheme other than http
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// Relative target that is not an origin-form path
    #[error("invalid request target: {0:?}")]
    InvalidTarget(String),

    /// No host in the target and no Host header
    #[error("no host in request target and no Host header")]
    MissingHost,

    /// Port that is not a number in 1..=65535
    #[error("invalid port: {0:?}")]
    InvalidPort(String),
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses `METHOD SP target SP version`.
///
/// Tokens are split on any ASCII whitespace, so the trailing CRLF may be
/// left on the line. Tokens after the third are ignored.
pub fn parse_request_line(line: &str) -> ParseResult<RequestLine> {
    let mut tokens = line.split_ascii_whitespace();

    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(method), Some(target), Some(version)) => Ok(RequestLine {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
        }),
        _ => Err(ParseError::MalformedRequestLine(line.trim_end().to_string())),
    }
}

/// Returns true if `target` carries a `scheme://` prefix.
///
/// A `://` later in the target, such as inside a query string, does not
/// count.
pub fn is_absolute_uri(target: &str) -> bool {
    match target.split_once("://") {
        Some((scheme, _)) => is_scheme(scheme),
        None => false,
    }
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`
fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Splits `[scheme://]host[:port][/path]` into host, port and path.
///
/// The authority ends at the first `/` after the scheme (path defaults to
/// `/`), and the port starts at the first `:` in the authority (defaults
/// to 80). A bare `host[:port]`, such as a `Host` header value, is accepted.
pub fn split_authority(uri: &str) -> ParseResult<Authority> {
    let rest = match uri.split_once("://") {
        Some((scheme, rest)) => {
            if !scheme.eq_ignore_ascii_case("http") {
                return Err(ParseError::UnsupportedScheme(scheme.to_string()));
            }
            rest
        }
        None => uri,
    };

    let (authority, path) = match rest.find('/') {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, DEFAULT_PATH),
    };

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, parse_port(port)?),
        None => (authority, DEFAULT_ORIGIN_PORT),
    };

    if host.is_empty() {
        return Err(ParseError::MissingHost);
    }

    Ok(Authority {
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}

fn parse_port(port: &str) -> ParseResult<u16> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(ParseError::InvalidPort(port.to_string())),
        Ok(port) => Ok(port),
    }
}

/// Classifies a raw header line by its name.
///
/// A line without a `:` is not a header and classifies as `Other`.
pub fn classify_header(line: &str) -> HeaderKind {
    match line.split_once(':') {
        Some((name, _)) => HeaderKind::from_name(name.trim()),
        None => HeaderKind::Other,
    }
}

/// Returns the header name as written by the client.
pub fn header_name(line: &str) -> Option<&str> {
    line.split_once(':').map(|(name, _)| name.trim())
}

/// Returns the trimmed value of a header line.
pub fn header_value(line: &str) -> Option<&str> {
    line.split_once(':').map(|(_, value)| value.trim())
}

/// Resolves a parsed request line against the client's headers.
///
/// For a relative target, the `Host` header supplies the origin and the
/// cache key is rebuilt in absolute form.
pub fn resolve_request<S: AsRef<str>>(line: RequestLine, headers: &[S]) -> ParseResult<Request> {
    let RequestLine {
        method,
        target,
        version,
    } = line;

    if is_absolute_uri(&target) {
        let Authority { host, port, path } = split_authority(&target)?;
        return Ok(Request {
            method,
            target_uri: target,
            version,
            host,
            port,
            path,
        });
    }

    if !target.starts_with('/') {
        return Err(ParseError::InvalidTarget(target));
    }

    let host_value = headers
        .iter()
        .map(AsRef::<str>::as_ref)
        .find(|line| classify_header(line) == HeaderKind::Host)
        .and_then(header_value)
        .filter(|value| !value.is_empty())
        .ok_or(ParseError::MissingHost)?;

    let Authority { host, port, .. } = split_authority(host_value)?;

    Ok(Request {
        method,
        target_uri: format!("http://{}{}", host_value, target),
        version,
        host,
        port,
        path: target,
    })
}
