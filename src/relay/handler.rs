//! Request/Response Relay
//!
//! This module runs one proxy transaction per client connection: read and
//! resolve the request, answer from the cache if possible, otherwise relay
//! it to the origin and stream the response back.
//!
//! ## Transaction Lifecycle
//!
//! ```text
//! 1. Read request line + header block
//!        │
//!        ▼
//! 2. Resolve target (absolute URI or Host header)
//!        │
//!        ├──── cache hit ────> write cached body ──────────────┐
//!        │                                                     │
//!        ▼ cache miss                                          │
//! 3. Connect to origin                                         │
//!        │                                                     │
//!        ▼                                                     │
//! 4. Send "METHOD path HTTP/1.0" + filtered headers + CRLF     │
//!        │                                                     │
//!        ▼                                                     │
//! 5. Relay status line and headers verbatim                    │
//!        │                                                     │
//!        ▼                                                     │
//! 6. Relay body chunks until origin EOF,                       │
//!    mirroring them into a bounded capture buffer              │
//!        │                                                     │
//!        ▼                                                     │
//! 7. Insert captured body into the cache (if it fit)           │
//!        │                                                     │
//!        ▼                                                     ▼
//! 8. Close client (and origin) ◄───────────────────────────────┘
//! ```
//!
//! Any failure jumps straight to step 8. The client gets no error page;
//! its connection is simply closed.

use crate::cache::Cache;
use crate::protocol::{
    is_blank_line, parse_request_line, resolve_request, ParseError, Request, MAX_LINE_LENGTH,
};
use crate::relay::connector::{Connect, TcpConnector};
use crate::relay::filter::render_origin_request;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream,
};
use tracing::{debug, info, trace, warn};

/// Size of each body chunk read from the origin (8 KB)
pub const RELAY_CHUNK_SIZE: usize = 8192;

/// Statistics for proxy transactions
#[derive(Debug, Default)]
pub struct ProxyStats {
    /// Total number of connections handled
    pub connections_accepted: AtomicU64,
    /// Connections currently inside a transaction
    pub active_connections: AtomicU64,
    /// Transactions answered from the cache
    pub cache_hits: AtomicU64,
    /// Transactions relayed to an origin
    pub origin_fetches: AtomicU64,
    /// Transactions that ended in an error
    pub failed_transactions: AtomicU64,
    /// Total body bytes written to clients
    pub bytes_to_clients: AtomicU64,
}

impl ProxyStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn origin_fetch(&self) {
        self.origin_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transaction_failed(&self) {
        self.failed_transactions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_to_client(&self, count: usize) {
        self.bytes_to_clients
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Counts a connection as active until dropped, including on unwind.
struct ActiveConnection<'a> {
    stats: &'a ProxyStats,
}

impl<'a> ActiveConnection<'a> {
    fn open(stats: &'a ProxyStats) -> Self {
        stats.connection_opened();
        Self { stats }
    }
}

impl Drop for ActiveConnection<'_> {
    fn drop(&mut self) {
        self.stats.connection_closed();
    }
}

/// How a successful transaction was served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Answered from the cache; no origin connection was opened
    CacheHit {
        /// Body bytes written to the client
        bytes: usize,
    },
    /// Relayed from the origin
    Relayed {
        /// Body bytes written to the client
        bytes: usize,
        /// Whether the body was inserted into the cache
        cached: bool,
    },
}

/// Errors that end a transaction.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Malformed request line or target
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The origin could not be reached
    #[error("failed to connect to {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Read or write failure mid-relay
    #[error("I/O error: {0}")]
    Transport(#[from] std::io::Error),

    /// Client closed the connection before sending a request line
    #[error("client disconnected before sending a request")]
    ClientDisconnected,

    /// Origin closed the connection inside the response header block
    #[error("origin closed connection before end of response headers")]
    TruncatedResponse,
}

/// The relay shared by every worker.
///
/// Holds the cache and the origin connector; each call to
/// [`Proxy::handle`] runs one independent transaction.
pub struct Proxy<C = TcpConnector> {
    cache: Arc<Cache>,
    connector: C,
    stats: Arc<ProxyStats>,
}

impl Proxy<TcpConnector> {
    /// Creates a proxy that reaches origins over TCP.
    pub fn new(cache: Arc<Cache>) -> Self {
        Self::with_connector(cache, TcpConnector)
    }
}

impl<C: Connect> Proxy<C> {
    /// Creates a proxy with a custom origin connector.
    pub fn with_connector(cache: Arc<Cache>, connector: C) -> Self {
        Self {
            cache,
            connector,
            stats: Arc::new(ProxyStats::new()),
        }
    }

    /// The cache this proxy reads and fills.
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// Shared transaction statistics.
    pub fn stats(&self) -> &Arc<ProxyStats> {
        &self.stats
    }

    /// Runs one transaction and logs how it ended.
    ///
    /// Errors are contained here; nothing propagates to the caller.
    pub async fn serve<S>(&self, stream: S, peer: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let _active = ActiveConnection::open(&self.stats);

        match self.handle(stream, peer).await {
            Ok(outcome) => debug!(client = %peer, ?outcome, "Transaction complete"),
            Err(e) => {
                self.stats.transaction_failed();
                match e {
                    RelayError::ClientDisconnected => {
                        debug!(client = %peer, "Client disconnected")
                    }
                    RelayError::Transport(ref io_err)
                        if matches!(
                            io_err.kind(),
                            std::io::ErrorKind::ConnectionReset | std::io::ErrorKind::BrokenPipe
                        ) =>
                    {
                        debug!(client = %peer, error = %e, "Connection reset mid-relay")
                    }
                    _ => warn!(client = %peer, error = %e, "Transaction failed"),
                }
            }
        }
    }

    /// Runs one transaction to completion.
    ///
    /// Both streams are closed when this returns, whatever the result.
    pub async fn handle<S>(&self, stream: S, peer: SocketAddr) -> Result<Outcome, RelayError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let mut client = BufStream::new(stream);

        let (request, headers) = read_request(&mut client).await?;
        info!(
            client = %peer,
            method = %request.method,
            uri = %request.target_uri,
            "Request"
        );

        if request.is_cacheable() {
            if let Some(body) = self.cache.lookup(&request.target_uri) {
                client.write_all(&body).await?;
                client.flush().await?;
                close(&mut client).await;

                self.stats.cache_hit();
                self.stats.bytes_to_client(body.len());
                debug!(uri = %request.target_uri, bytes = body.len(), "Served from cache");
                return Ok(Outcome::CacheHit { bytes: body.len() });
            }
        }

        let origin = self
            .connector
            .connect(&request.host, request.port)
            .await
            .map_err(|source| RelayError::Connect {
                host: request.host.clone(),
                port: request.port,
                source,
            })?;
        let mut origin = BufStream::new(origin);
        self.stats.origin_fetch();

        let head = render_origin_request(&request, &headers);
        trace!(uri = %request.target_uri, head = %head.trim_end(), "Forwarding request");
        origin.write_all(head.as_bytes()).await?;
        origin.flush().await?;

        relay_response_head(&mut origin, &mut client).await?;

        let capture_limit = if request.is_cacheable() {
            Some(self.cache.config().max_object_size)
        } else {
            None
        };
        let (bytes, captured) = relay_body(&mut origin, &mut client, capture_limit).await?;
        self.stats.bytes_to_client(bytes);
        close(&mut client).await;

        let cached = match captured {
            Some(body) => {
                let outcome = self.cache.insert(request.target_uri.clone(), body.freeze());
                debug!(uri = %request.target_uri, bytes = bytes, ?outcome, "Cached response");
                outcome.is_stored()
            }
            None => false,
        };

        Ok(Outcome::Relayed { bytes, cached })
    }
}

/// Reads one line, terminator included, refusing lines over the limit.
///
/// Returns 0 at end of stream.
async fn read_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<usize, RelayError>
where
    R: AsyncBufRead + Unpin,
{
    let n = (&mut *reader)
        .take(MAX_LINE_LENGTH as u64)
        .read_until(b'\n', buf)
        .await?;

    if n == MAX_LINE_LENGTH && !buf.ends_with(b"\n") {
        return Err(ParseError::LineTooLong {
            max: MAX_LINE_LENGTH,
        }
        .into());
    }

    Ok(n)
}

fn into_text(line: Vec<u8>) -> Result<String, ParseError> {
    String::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))
}

/// Reads and resolves the request line and the client's header block.
///
/// End of stream inside the header block is treated as its end.
async fn read_request<R>(reader: &mut R) -> Result<(Request, Vec<String>), RelayError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    if read_line(reader, &mut line).await? == 0 {
        return Err(RelayError::ClientDisconnected);
    }
    let request_line = parse_request_line(&into_text(line)?)?;

    let mut headers = Vec::new();
    loop {
        let mut line = Vec::new();
        if read_line(reader, &mut line).await? == 0 || is_blank_line(&line) {
            break;
        }
        headers.push(into_text(line)?);
    }

    Ok((resolve_request(request_line, &headers)?, headers))
}

/// Copies the status line and response headers to the client, unmodified,
/// through the blank line.
async fn relay_response_head<O, W>(origin: &mut O, client: &mut W) -> Result<(), RelayError>
where
    O: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::with_capacity(256);
    loop {
        line.clear();
        if read_line(origin, &mut line).await? == 0 {
            return Err(RelayError::TruncatedResponse);
        }
        client.write_all(&line).await?;
        if is_blank_line(&line) {
            break;
        }
    }
    client.flush().await?;
    Ok(())
}

/// Streams the body to the client until the origin closes.
///
/// With a `capture_limit`, the body is mirrored into a buffer; the capture
/// is dropped as soon as it would exceed the limit, without affecting the
/// client. Returns the byte count and the capture, if it survived.
async fn relay_body<O, W>(
    origin: &mut O,
    client: &mut W,
    capture_limit: Option<usize>,
) -> Result<(usize, Option<BytesMut>), RelayError>
where
    O: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut capture =
        capture_limit.map(|limit| BytesMut::with_capacity(limit.min(RELAY_CHUNK_SIZE)));
    let limit = capture_limit.unwrap_or(0);
    let mut chunk = vec![0u8; RELAY_CHUNK_SIZE];
    let mut total = 0;

    loop {
        let n = origin.read(&mut chunk).await?;
        if n == 0 {
            break;
        }

        client.write_all(&chunk[..n]).await?;
        client.flush().await?;
        total += n;
        trace!(bytes = n, total = total, "Relayed body chunk");

        let overflow = capture.as_ref().is_some_and(|buf| buf.len() + n > limit);
        if overflow {
            trace!(limit = limit, "Response exceeds object cap, not caching");
            capture = None;
        } else if let Some(buf) = capture.as_mut() {
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    Ok((total, capture))
}

/// Shuts down the client's write half so it sees end of stream.
async fn close<S: AsyncWrite + Unpin>(client: &mut S) {
    if let Err(e) = client.shutdown().await {
        trace!(error = %e, "Shutdown after transaction failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use bytes::Bytes;
    use std::io;
    use std::sync::atomic::AtomicUsize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::mpsc;

    const ORIGIN_RESPONSE: &[u8] = b"HTTP/1.0 200 OK\r\nContent-Type: text/html\r\n\r\nhello";

    /// Sends every origin connection to one local address.
    struct LocalConnector {
        addr: SocketAddr,
        connects: Arc<AtomicUsize>,
    }

    impl Connect for LocalConnector {
        type Stream = TcpStream;

        async fn connect(&self, _host: &str, _port: u16) -> io::Result<TcpStream> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            TcpStream::connect(self.addr).await
        }
    }

    /// Refuses every connection attempt.
    struct RefusingConnector;

    impl Connect for RefusingConnector {
        type Stream = TcpStream;

        async fn connect(&self, _host: &str, _port: u16) -> io::Result<TcpStream> {
            Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        }
    }

    fn test_peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    /// Starts an origin that records each request head and answers with `response`.
    async fn spawn_origin(response: &'static [u8]) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let mut reader = BufReader::new(stream);
                    let mut head = String::new();
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).await.unwrap() == 0 {
                            break;
                        }
                        head.push_str(&line);
                        if line == "\r\n" {
                            break;
                        }
                    }
                    let _ = tx.send(head);

                    let mut stream = reader.into_inner();
                    stream.write_all(response).await.unwrap();
                });
            }
        });

        (addr, rx)
    }

    async fn create_test_proxy(
        response: &'static [u8],
        config: CacheConfig,
    ) -> (
        Arc<Proxy<LocalConnector>>,
        Arc<AtomicUsize>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (addr, heads) = spawn_origin(response).await;
        let connects = Arc::new(AtomicUsize::new(0));
        let connector = LocalConnector {
            addr,
            connects: Arc::clone(&connects),
        };
        let cache = Arc::new(Cache::with_config(config));
        (
            Arc::new(Proxy::with_connector(cache, connector)),
            connects,
            heads,
        )
    }

    /// Sends `request` through the proxy over an in-memory pipe and reads
    /// everything it writes back.
    async fn roundtrip<C: Connect>(
        proxy: &Arc<Proxy<C>>,
        request: &str,
    ) -> (Vec<u8>, Result<Outcome, RelayError>) {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let proxy = Arc::clone(proxy);
        let task = tokio::spawn(async move { proxy.handle(server, test_peer()).await });

        client.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();

        (response, task.await.unwrap())
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (proxy, connects, mut heads) =
            create_test_proxy(ORIGIN_RESPONSE, CacheConfig::default()).await;
        let request = "GET http://example.com/a.html HTTP/1.1\r\n\
                       Host: example.com\r\n\
                       User-Agent: test-agent\r\n\
                       Cookie: session=1\r\n\
                       Proxy-Connection: keep-alive\r\n\
                       Accept: text/html\r\n\
                       \r\n";

        let (response, outcome) = roundtrip(&proxy, request).await;
        assert_eq!(response, ORIGIN_RESPONSE);
        assert_eq!(
            outcome.unwrap(),
            Outcome::Relayed {
                bytes: 5,
                cached: true
            }
        );

        let head = heads.recv().await.unwrap();
        assert_eq!(
            head,
            "GET /a.html HTTP/1.0\r\n\
             Host: example.com\r\n\
             Proxy-Connection: close\r\n\
             Accept: text/html\r\n\
             \r\n"
        );

        assert!(proxy.cache().contains("http://example.com/a.html"));
        assert_eq!(proxy.cache().total_size(), 5);

        let (response, outcome) = roundtrip(&proxy, request).await;
        assert_eq!(response, b"hello");
        assert_eq!(outcome.unwrap(), Outcome::CacheHit { bytes: 5 });
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        let stats = proxy.stats();
        assert_eq!(stats.cache_hits.load(Ordering::Relaxed), 1);
        assert_eq!(stats.origin_fetches.load(Ordering::Relaxed), 1);
        assert_eq!(stats.bytes_to_clients.load(Ordering::Relaxed), 10);
    }

    #[tokio::test]
    async fn test_relative_target_uses_host_header() {
        let (proxy, _, mut heads) =
            create_test_proxy(ORIGIN_RESPONSE, CacheConfig::default()).await;

        let (response, outcome) = roundtrip(
            &proxy,
            "GET /index.html HTTP/1.1\r\nHost: example.com:8080\r\nConnection: keep-alive\r\n\r\n",
        )
        .await;

        assert_eq!(response, ORIGIN_RESPONSE);
        assert!(outcome.is_ok());
        assert_eq!(
            heads.recv().await.unwrap(),
            "GET /index.html HTTP/1.0\r\nHost: example.com:8080\r\nConnection: close\r\n\r\n"
        );
        assert!(proxy.cache().contains("http://example.com:8080/index.html"));
    }

    #[tokio::test]
    async fn test_oversized_body_relayed_but_not_cached() {
        let config = CacheConfig {
            max_object_size: 4,
            max_cache_size: 1024,
            max_entries: 16,
        };
        let (proxy, _, _heads) = create_test_proxy(ORIGIN_RESPONSE, config).await;

        let (response, outcome) =
            roundtrip(&proxy, "GET http://example.com/big HTTP/1.0\r\n\r\n").await;

        assert_eq!(response, ORIGIN_RESPONSE);
        assert_eq!(
            outcome.unwrap(),
            Outcome::Relayed {
                bytes: 5,
                cached: false
            }
        );
        assert!(proxy.cache().is_empty());
    }

    #[tokio::test]
    async fn test_non_get_bypasses_cache() {
        let (proxy, connects, _heads) =
            create_test_proxy(ORIGIN_RESPONSE, CacheConfig::default()).await;
        proxy
            .cache()
            .insert("http://example.com/form", Bytes::from("stale"));

        let request = "POST http://example.com/form HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let (response, outcome) = roundtrip(&proxy, request).await;

        assert_eq!(response, ORIGIN_RESPONSE);
        assert_eq!(
            outcome.unwrap(),
            Outcome::Relayed {
                bytes: 5,
                cached: false
            }
        );
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert_eq!(
            proxy.cache().lookup("http://example.com/form"),
            Some(Bytes::from("stale"))
        );
    }

    #[tokio::test]
    async fn test_truncated_response_head() {
        let (proxy, _, _heads) =
            create_test_proxy(b"HTTP/1.0 200 OK\r\nServer: x\r\n", CacheConfig::default()).await;

        let (_, outcome) =
            roundtrip(&proxy, "GET http://example.com/ HTTP/1.0\r\n\r\n").await;

        assert!(matches!(outcome, Err(RelayError::TruncatedResponse)));
        assert!(proxy.cache().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_request_line_closes_silently() {
        let (proxy, connects, _heads) =
            create_test_proxy(ORIGIN_RESPONSE, CacheConfig::default()).await;

        let (response, outcome) = roundtrip(&proxy, "GARBAGE\r\n\r\n").await;

        assert!(response.is_empty());
        assert!(matches!(
            outcome,
            Err(RelayError::Parse(ParseError::MalformedRequestLine(_)))
        ));
        assert_eq!(connects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_host_for_relative_target() {
        let proxy = Proxy::with_connector(Arc::new(Cache::new()), RefusingConnector);
        let client = tokio_test::io::Builder::new()
            .read(b"GET /a.html HTTP/1.1\r\nAccept: */*\r\n\r\n")
            .build();

        let result = proxy.handle(client, test_peer()).await;
        assert!(matches!(
            result,
            Err(RelayError::Parse(ParseError::MissingHost))
        ));
    }

    #[tokio::test]
    async fn test_cache_hit_writes_only_body() {
        let cache = Arc::new(Cache::new());
        cache.insert("http://example.com/a.html", Bytes::from("hello"));
        let proxy = Proxy::with_connector(cache, RefusingConnector);

        let client = tokio_test::io::Builder::new()
            .read(b"GET http://example.com/a.html HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .write(b"hello")
            .build();

        let outcome = proxy.handle(client, test_peer()).await.unwrap();
        assert_eq!(outcome, Outcome::CacheHit { bytes: 5 });
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let proxy = Proxy::with_connector(Arc::new(Cache::new()), RefusingConnector);
        let client = tokio_test::io::Builder::new()
            .read(b"GET http://unreachable.invalid:81/ HTTP/1.1\r\n\r\n")
            .build();

        match proxy.handle(client, test_peer()).await {
            Err(RelayError::Connect { host, port, .. }) => {
                assert_eq!(host, "unreachable.invalid");
                assert_eq!(port, 81);
            }
            other => panic!("expected connect error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_disconnect_before_request() {
        let proxy = Proxy::with_connector(Arc::new(Cache::new()), RefusingConnector);
        let client = tokio_test::io::Builder::new().build();

        let result = proxy.handle(client, test_peer()).await;
        assert!(matches!(result, Err(RelayError::ClientDisconnected)));
    }

    #[tokio::test]
    async fn test_serve_counts_failures() {
        let proxy = Proxy::with_connector(Arc::new(Cache::new()), RefusingConnector);
        let client = tokio_test::io::Builder::new()
            .read(b"GET http://example.com/ HTTP/1.1\r\n\r\n")
            .build();

        proxy.serve(client, test_peer()).await;

        let stats = proxy.stats();
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.failed_transactions.load(Ordering::Relaxed), 1);
    }

    /// Panics on every connection attempt.
    struct PanickingConnector;

    impl Connect for PanickingConnector {
        type Stream = TcpStream;

        async fn connect(&self, _host: &str, _port: u16) -> io::Result<TcpStream> {
            panic!("connector exploded")
        }
    }

    #[tokio::test]
    async fn test_serve_releases_active_count_on_panic() {
        let proxy = Arc::new(Proxy::with_connector(
            Arc::new(Cache::new()),
            PanickingConnector,
        ));
        let (mut client, server) = tokio::io::duplex(1024);
        client
            .write_all(b"GET http://example.com/ HTTP/1.1\r\n\r\n")
            .await
            .unwrap();

        let task = {
            let proxy = Arc::clone(&proxy);
            tokio::spawn(async move { proxy.serve(server, test_peer()).await })
        };
        assert!(task.await.unwrap_err().is_panic());

        let stats = proxy.stats();
        assert_eq!(stats.connections_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(stats.active_connections.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_line_too_long() {
        let data = vec![b'a'; MAX_LINE_LENGTH + 10];
        let mut reader = BufReader::new(&data[..]);
        let mut buf = Vec::new();

        let result = read_line(&mut reader, &mut buf).await;
        assert!(matches!(
            result,
            Err(RelayError::Parse(ParseError::LineTooLong { .. }))
        ));
    }

    #[tokio::test]
    async fn test_relay_body_abandons_capture_past_limit() {
        let mut origin = &b"0123456789"[..];
        let mut client = Vec::new();

        let (bytes, capture) = relay_body(&mut origin, &mut client, Some(4)).await.unwrap();
        assert_eq!(bytes, 10);
        assert_eq!(client, b"0123456789");
        assert!(capture.is_none());

        let mut origin = &b"0123"[..];
        let mut client = Vec::new();
        let (_, capture) = relay_body(&mut origin, &mut client, Some(4)).await.unwrap();
        assert_eq!(capture.unwrap().freeze(), Bytes::from("0123"));
    }
}
