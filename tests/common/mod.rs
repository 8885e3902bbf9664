//! Shared utilities for integration testing.

#![allow(dead_code)]

use chrono::NaiveDate;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use rates_service::config::ServiceConfig;
use rates_service::http::HttpServer;
use rates_service::lifecycle::startup::build_service_with_clock;
use rates_service::lifecycle::Shutdown;
use rates_service::rates::FixedClock;

/// The pinned "today" every integration test runs on. A Friday.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 18).unwrap()
}

/// Request head as seen by the mock provider.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub path: String,
    pub head: String,
}

impl MockRequest {
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Start a programmable mock provider on an ephemeral port.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
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
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = f(MockRequest { path, head }).await;
                        let status_text = match status {
                            200 => "200 OK",
                            401 => "401 Unauthorized",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
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

/// A provider payload for series SF43718 with the given `(fecha, dato)` pairs.
pub fn banxico_body(points: &[(&str, &str)]) -> String {
    let datos: Vec<serde_json::Value> = points
        .iter()
        .map(|(fecha, dato)| serde_json::json!({ "fecha": fecha, "dato": dato }))
        .collect();
    serde_json::json!({
        "bmx": {
            "series": [{
                "idSerie": "SF43718",
                "titulo": "Tipo de cambio Pesos por dólar E.U.A.",
                "datos": datos
            }]
        }
    })
    .to_string()
}

/// Defaults pointed at `upstream`, with an in-process cache.
pub fn test_config(upstream: SocketAddr) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.upstream.base_url = format!("http://{}/v1", upstream);
    config.upstream.token = "test-token".into();
    config.upstream.timeout_secs = 2;
    config.cache.enabled = false;
    config.circuit_breaker.failure_threshold = 2;
    config.circuit_breaker.open_timeout_secs = 60;
    config
}

/// A running service and the handle that stops it.
pub struct TestService {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Start the full service on an ephemeral port with the clock pinned to [`today`].
pub async fn start_service(config: ServiceConfig) -> TestService {
    let service = build_service_with_clock(&config, Arc::new(FixedClock(today())))
        .await
        .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, Arc::new(service));
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    TestService { addr, shutdown, handle }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
