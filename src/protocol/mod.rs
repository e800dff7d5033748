//! HTTP Request Parsing
//!
//! This module holds the stateless half of the proxy: the framing types and
//! the pure functions that resolve a client request into an origin
//! host, port and path.
//!
//! ## Modules
//!
//! - `types`: `Request`, `HeaderKind` and framing constants
//! - `parser`: request line, authority and header parsing
//!
//! ## Example
//!
//! ```
//! use proxycache::protocol::{parse_request_line, resolve_request};
//!
//! let line = parse_request_line("GET http://example.com:8080/a.html HTTP/1.1\r\n").unwrap();
//! let request = resolve_request(line, &["Host: example.com:8080\r\n"]).unwrap();
//!
//! assert_eq!(request.host, "example.com");
//! assert_eq!(request.port, 8080);
//! assert_eq!(request.origin_request_line(), "GET /a.html HTTP/1.0\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{
    classify_header, header_name, header_value, is_absolute_uri, parse_request_line,
    resolve_request, split_authority, ParseError, ParseResult,
};
pub use types::{
    is_blank_line, Authority, HeaderKind, Request, RequestLine, CRLF, DEFAULT_ORIGIN_PORT,
    HTTP_1_0, MAX_LINE_LENGTH,
};
