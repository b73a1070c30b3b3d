#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Once};

use simplemq::{ApiConfig, QueueService, QueueStore, ServiceError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = simplemq::logging::init_logging();
    });
}

pub struct RunningService {
    pub service: Arc<QueueService>,
    pub addr: SocketAddr,
    pub server: JoinHandle<Result<(), ServiceError>>,
}

/// Starts a service on an ephemeral localhost port and waits until it listens.
pub async fn start_service(store: Arc<QueueStore>, config: ApiConfig) -> RunningService {
    init_logging();

    let service = Arc::new(QueueService::new(store, config));
    let server = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.start("127.0.0.1:0").await })
    };
    let addr = service
        .wait_until_listening()
        .await
        .expect("service failed to start listening");

    RunningService {
        service,
        addr,
        server,
    }
}

/// Opens a connection and writes a POST head announcing `content_length` body bytes.
pub async fn open_post(addr: SocketAddr, path: &str, content_length: usize) -> TcpStream {
    let mut stream = TcpStream::connect(addr)
        .await
        .expect("failed to connect to server");
    let head = format!(
        "POST {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();
    stream
}

/// Reads one response: status code and body, using `Content-Length` to find the end.
pub async fn read_response(stream: &mut TcpStream) -> (u16, String) {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Some((status, body)) = parse_response(&raw) {
            return (status, body);
        }
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return parse_response(&raw).expect("connection closed before a full response");
        }
        raw.extend_from_slice(&chunk[..n]);
    }
}

fn parse_response(raw: &[u8]) -> Option<(u16, String)> {
    let text = String::from_utf8_lossy(raw);
    let (head, body) = text.split_once("\r\n\r\n")?;

    let status = head.split_whitespace().nth(1)?.parse().ok()?;
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    (body.len() >= content_length).then(|| (status, body[..content_length].to_string()))
}

/// Sends one HTTP/1.1 request over a fresh connection and returns status and body.
pub async fn http_request(addr: SocketAddr, method: &str, path: &str, body: &[u8]) -> (u16, String) {
    let mut stream = TcpStream::connect(addr)
        .await
        .expect("failed to connect to server");

    let head = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(head.as_bytes()).await.unwrap();
    stream.write_all(body).await.unwrap();
    stream.flush().await.unwrap();

    read_response(&mut stream).await
}
