//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use balancerd::config::BalancerConfig;
use balancerd::http::HttpServer;
use balancerd::lifecycle::Shutdown;
use balancerd::load_balancer::pool::BackendPool;

/// Start a mock backend that returns a fixed 200 response.
/// Binds an ephemeral port and returns its address.
#[allow(dead_code)]
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_head| async move { (200, response.to_string()) }).await
}

/// Start a mock backend that sleeps before answering, to keep requests
/// in flight while tests observe connection accounting.
#[allow(dead_code)]
pub async fn start_slow_backend(delay: Duration, response: &'static str) -> SocketAddr {
    start_programmable_backend(move |_head| async move {
        tokio::time::sleep(delay).await;
        (200, response.to_string())
    })
    .await
}

/// Start a programmable mock backend. The callback receives the raw request
/// head (request line + headers) and returns `(status, body)`.
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
                        // Read the request head before answering, so the
                        // client never sees a response racing its request.
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }
                        let head = String::from_utf8_lossy(&head).to_string();

                        let (status, body) = f(head).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A config pointing at the given backends, with health checks off and an
/// ephemeral listener. Tests enable and tune what they exercise.
pub fn test_config(servers: Vec<String>) -> BalancerConfig {
    let mut config = BalancerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.servers = servers;
    config.health_check.enabled = false;
    config
}

/// Start the balancer on an ephemeral port.
/// Returns its address, the shutdown handle, and the backend pool.
pub async fn start_proxy(config: BalancerConfig) -> (SocketAddr, Shutdown, Arc<BackendPool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let pool = server.pool();

    let sd = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, sd).await;
    });

    // Give the accept loop a moment to come up.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown, pool)
}

/// A client that opens a fresh connection per request, so connection reuse
/// never skews balancing observations.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `f` until it holds or the deadline passes.
#[allow(dead_code)]
pub async fn wait_until<F: Fn() -> bool>(deadline: Duration, f: F) -> bool {
    let start = tokio::time::Instant::now();
    while start.elapsed() < deadline {
        if f() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    f()
}
