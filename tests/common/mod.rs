//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use traffic_control::broker::{BrokerHandler, InMemoryQueue};
use traffic_control::config::HealthCheckConfig;
use traffic_control::http::HttpServer;
use traffic_control::lifecycle::Shutdown;
use traffic_control::load_balancer::ServerPool;
use traffic_control::net::serve_lines;
use traffic_control::rate_limiter::server::{serve_http, LimiterHandler};
use traffic_control::rate_limiter::{Admission, RateLimiter};

/// Read an HTTP request head (no body) from `socket`.
async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        404 => "404 Not Found",
        429 => "429 Too Many Requests",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Start a programmable mock backend on an ephemeral port. `f` receives the
/// raw request head and returns the status and body to send.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let (status, body) = f(head).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> SocketAddr {
    start_programmable_backend(move |_| async move { (200, body.to_string()) }).await
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Start a load balancer over `backends`; returns its address.
pub async fn start_load_balancer(
    backends: &[SocketAddr],
    admission: Admission,
    health_check: HealthCheckConfig,
    shutdown: &Shutdown,
) -> SocketAddr {
    let addresses: Vec<String> = backends.iter().map(ToString::to_string).collect();
    let pool = Arc::new(ServerPool::new(&addresses).unwrap());
    let server = HttpServer::new(pool, admission, health_check, Duration::from_secs(5));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.run(listener, shutdown.clone()));
    addr
}

pub fn health_check_disabled() -> HealthCheckConfig {
    HealthCheckConfig {
        enabled: false,
        ..HealthCheckConfig::default()
    }
}

/// Start a broker on an ephemeral port.
pub async fn start_broker(shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(BrokerHandler::new(Arc::new(InMemoryQueue::new())));
    tokio::spawn(serve_lines(listener, handler, shutdown.subscribe()));
    addr
}

/// Start both limiter bindings over one set of buckets. Returns the TCP and
/// HTTP addresses.
pub async fn start_rate_limiter(rate: f64, burst: f64, shutdown: &Shutdown) -> (SocketAddr, SocketAddr) {
    let limiter = Arc::new(RateLimiter::new(rate, burst));

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let tcp_addr = tcp.local_addr().unwrap();
    tokio::spawn(serve_lines(
        tcp,
        Arc::new(LimiterHandler::new(limiter.clone())),
        shutdown.subscribe(),
    ));

    let http = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let http_addr = http.local_addr().unwrap();
    tokio::spawn(serve_http(http, limiter, shutdown.subscribe()));

    (tcp_addr, http_addr)
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}
