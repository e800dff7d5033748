//! proxycache - A Caching HTTP Forward Proxy
//!
//! This is the main entry point for the proxycache server.
//! It sets up the cache, the worker pool, and the TCP acceptor that feeds it.

use anyhow::Context;
use proxycache::cache::Cache;
use proxycache::config::ProxyConfig;
use proxycache::pool::{connection_queue, ClientConnection, QueueSender, WorkerPool};
use proxycache::relay::Proxy;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Parse configuration from command-line arguments
fn config_from_args() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--host" | "-h" => {
                config.host = value_of(&args, i).to_string();
                i += 2;
            }
            "--port" | "-p" => {
                config.port = parse_value(&args, i, "port number");
                i += 2;
            }
            "--workers" | "-w" => {
                config.workers = parse_value(&args, i, "worker count");
                i += 2;
            }
            "--queue" | "-q" => {
                config.queue_capacity = parse_value(&args, i, "queue capacity");
                i += 2;
            }
            "--max-object" => {
                config.cache.max_object_size = parse_value(&args, i, "object size");
                i += 2;
            }
            "--cache-size" => {
                config.cache.max_cache_size = parse_value(&args, i, "cache size");
                i += 2;
            }
            "--max-entries" => {
                config.cache.max_entries = parse_value(&args, i, "entry count");
                i += 2;
            }
            "--help" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-v" => {
                println!("proxycache version {}", proxycache::VERSION);
                std::process::exit(0);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
    }

    config
}

fn value_of(args: &[String], i: usize) -> &str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", args[i]);
            std::process::exit(1);
        }
    }
}

fn parse_value<T: FromStr>(args: &[String], i: usize, what: &str) -> T {
    value_of(args, i).parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid {}", what);
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
proxycache - A Caching HTTP Forward Proxy

USAGE:
    proxycache [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>          Port to listen on (default: 8080)
    -w, --workers <N>          Number of worker tasks (default: 8)
    -q, --queue <N>            Connection queue capacity (default: 16)
        --max-object <BYTES>   Largest cacheable response body (default: 102400)
        --cache-size <BYTES>   Total cache budget (default: 1049000)
        --max-entries <N>      Maximum number of cached objects (default: 4096)
    -v, --version              Print version information
        --help                 Print this help message

EXAMPLES:
    proxycache                         # Start on 127.0.0.1:8080
    proxycache --port 15213            # Start on port 15213
    proxycache --host 0.0.0.0 -w 32    # All interfaces, 32 workers

LOGGING:
    Set RUST_LOG to change verbosity, e.g. RUST_LOG=proxycache=debug

CONNECTING:
    Point any HTTP client at the proxy:
    $ curl -x http://127.0.0.1:8080 http://example.com/
"#
    );
}

fn print_banner(config: &ProxyConfig) {
    println!(
        r#"
proxycache v{} - Caching HTTP Forward Proxy
──────────────────────────────────────────────────────────────
Listening on {}
Workers: {}    Queue: {}    Cache: {} bytes ({} per object)

Use Ctrl+C to shutdown.
"#,
        proxycache::VERSION,
        config.bind_address(),
        config.workers,
        config.queue_capacity,
        config.cache.max_cache_size,
        config.cache.max_object_size,
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = config_from_args();
    config.validate().context("invalid configuration")?;

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Bind before anything else so a busy port fails fast
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;

    print_banner(&config);

    // Create the cache and the relay (shared across all workers)
    let cache = Arc::new(Cache::with_config(config.cache));
    info!(
        max_cache_size = config.cache.max_cache_size,
        max_object_size = config.cache.max_object_size,
        max_entries = config.cache.max_entries,
        "Cache initialized"
    );
    let proxy = Arc::new(Proxy::new(Arc::clone(&cache)));

    // Start the workers
    let (queue, receiver) = connection_queue(config.queue_capacity);
    let mut pool = WorkerPool::start(config.workers, receiver, Arc::clone(&proxy));

    info!("Listening on {}", config.bind_address());

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    let result = tokio::select! {
        _ = accept_loop(listener, queue) => Ok(()),
        res = pool.wait() => res.context("worker pool failed"),
        _ = shutdown => Ok(()),
    };

    pool.shutdown();

    let stats = proxy.stats();
    let cache_stats = cache.stats();
    info!(
        connections = stats.connections_accepted.load(Ordering::Relaxed),
        cache_hits = stats.cache_hits.load(Ordering::Relaxed),
        origin_fetches = stats.origin_fetches.load(Ordering::Relaxed),
        failed = stats.failed_transactions.load(Ordering::Relaxed),
        cached_objects = cache_stats.entries,
        cached_bytes = cache_stats.total_size,
        evictions = cache_stats.evictions,
        "Server shutdown complete"
    );

    result
}

/// Accepts connections and hands them to the worker pool.
///
/// Waits on the queue when every worker is busy and the queue is full.
async fn accept_loop(listener: TcpListener, queue: QueueSender<ClientConnection>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                if queue.push(ClientConnection::new(stream, addr)).await.is_err() {
                    warn!("Connection queue closed, no longer accepting");
                    return;
                }
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
