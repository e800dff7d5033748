//! Request header forwarding policy.
//!
//! | Header                          | Action                     |
//! |---------------------------------|----------------------------|
//! | `Connection`, `Proxy-Connection`| value rewritten to `close` |
//! | `Host`                          | forwarded unchanged        |
//! | `User-Agent`, `Cookie`, `Keep-Alive` | dropped               |
//! | anything else                   | forwarded verbatim         |

use crate::protocol::{classify_header, header_name, HeaderKind, Request};
use std::borrow::Cow;

/// Applies the forwarding policy to one raw header line.
///
/// Returns the line to send to the origin, or `None` if it is suppressed.
/// Forwarded lines keep their original terminator; rewritten ones end in CRLF.
pub fn forward_header(line: &str) -> Option<Cow<'_, str>> {
    match classify_header(line) {
        HeaderKind::Connection | HeaderKind::ProxyConnection => {
            let name = header_name(line).unwrap_or(line);
            Some(Cow::Owned(format!("{}: close\r\n", name)))
        }
        HeaderKind::UserAgent | HeaderKind::Cookie | HeaderKind::KeepAlive => None,
        HeaderKind::Host | HeaderKind::Other => Some(Cow::Borrowed(line)),
    }
}

/// Filters a client's header block down to what the origin receives.
pub fn filter_request_headers<S: AsRef<str>>(headers: &[S]) -> impl Iterator<Item = Cow<'_, str>> {
    headers.iter().filter_map(|line| forward_header(line.as_ref()))
}

/// Renders the full request head sent to the origin: the downgraded
/// request line, the filtered headers, and the closing blank line.
pub fn render_origin_request<S: AsRef<str>>(request: &Request, headers: &[S]) -> String {
    let mut head = request.origin_request_line();
    for line in filter_request_headers(headers) {
        head.push_str(&line);
    }
    head.push_str("\r\n");
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_request_line, resolve_request};

    #[test]
    fn test_connection_headers_rewritten_to_close() {
        assert_eq!(
            forward_header("Connection: keep-alive\r\n").as_deref(),
            Some("Connection: close\r\n")
        );
        assert_eq!(
            forward_header("Proxy-Connection: keep-alive\r\n").as_deref(),
            Some("Proxy-Connection: close\r\n")
        );
        assert_eq!(
            forward_header("connection:Upgrade\r\n").as_deref(),
            Some("connection: close\r\n")
        );
    }

    #[test]
    fn test_suppressed_headers() {
        assert_eq!(forward_header("User-Agent: foo\r\n"), None);
        assert_eq!(forward_header("Cookie: bar\r\n"), None);
        assert_eq!(forward_header("Keep-Alive: 300\r\n"), None);
    }

    #[test]
    fn test_verbatim_headers() {
        assert_eq!(
            forward_header("Host: example.com\r\n").as_deref(),
            Some("Host: example.com\r\n")
        );
        assert_eq!(
            forward_header("X-Custom: baz\r\n").as_deref(),
            Some("X-Custom: baz\r\n")
        );
    }

    #[test]
    fn test_filter_header_block() {
        let headers = [
            "User-Agent: foo\r\n",
            "Cookie: bar\r\n",
            "Connection: keep-alive\r\n",
            "X-Custom: baz\r\n",
        ];

        let forwarded: Vec<_> = filter_request_headers(&headers).collect();
        assert_eq!(forwarded, vec!["Connection: close\r\n", "X-Custom: baz\r\n"]);
    }

    #[test]
    fn test_render_origin_request() {
        let headers = vec![
            "Host: example.com\r\n".to_string(),
            "User-Agent: foo\r\n".to_string(),
            "Proxy-Connection: keep-alive\r\n".to_string(),
            "Accept: */*\r\n".to_string(),
        ];
        let line = parse_request_line("GET http://example.com/a.html HTTP/1.1\r\n").unwrap();
        let request = resolve_request(line, &headers).unwrap();

        assert_eq!(
            render_origin_request(&request, &headers),
            "GET /a.html HTTP/1.0\r\n\
             Host: example.com\r\n\
             Proxy-Connection: close\r\n\
             Accept: */*\r\n\
             \r\n"
        );
    }
}
