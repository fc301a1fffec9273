//! Integration tests for the HTTP front end, over a real socket.

use std::io::Write;
use std::time::Duration;

use tailcast::config::{ServerConfig, TailConfig};
use tailcast::hub::TailHub;
use tailcast::transport::{AppState, TailServer};
use tempfile::{NamedTempFile, TempDir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// Serve the router on an ephemeral port and return its address.
async fn serve(state: AppState, web_root: &std::path::Path) -> std::net::SocketAddr {
    let server = TailServer::new(state).with_config(ServerConfig {
        web_root: web_root.to_path_buf(),
        ..Default::default()
    });
    let router = server.build_router();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn send_get(addr: std::net::SocketAddr, path: &str) -> TcpStream {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    stream
}

/// Read from `stream` until the accumulated text contains `needle`.
async fn read_until(stream: &mut TcpStream, buffer: &mut String, needle: &str) {
    let mut chunk = [0u8; 4096];
    while !buffer.contains(needle) {
        let n = timeout(Duration::from_secs(3), stream.read(&mut chunk))
            .await
            .expect("Timed out waiting for response data")
            .unwrap();
        assert!(n > 0, "Connection closed before {needle:?} arrived");
        buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
    }
}

fn fast_config() -> TailConfig {
    TailConfig {
        poll_interval_ms: 20,
        ..Default::default()
    }
}

/// The SSE stream delivers history first, then appended lines.
#[tokio::test]
async fn test_stream_initial_then_update() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "existing line").unwrap();
    file.flush().unwrap();

    let hub = TailHub::start(file.path(), &fast_config()).unwrap();
    let web = TempDir::new().unwrap();
    let addr = serve(AppState::from_hub(&hub), web.path()).await;

    let mut stream = send_get(addr, "/api/stream").await;
    let mut buffer = String::new();
    read_until(&mut stream, &mut buffer, "event: initial").await;
    read_until(&mut stream, &mut buffer, r#"{"type":"initial","lines":["existing line"]}"#).await;
    assert!(buffer.contains("text/event-stream"));

    writeln!(file, "brand new").unwrap();
    file.flush().unwrap();

    read_until(&mut stream, &mut buffer, r#"{"type":"update","line":"brand new"}"#).await;
    assert!(buffer.contains("event: update"));

    drop(stream);
    hub.shutdown().await;
}

/// History and status endpoints return JSON snapshots.
#[tokio::test]
async fn test_history_and_status_endpoints() {
    let mut file = NamedTempFile::new().unwrap();
    for i in 1..=12 {
        writeln!(file, "L{i}").unwrap();
    }
    file.flush().unwrap();

    let hub = TailHub::start(file.path(), &fast_config()).unwrap();
    let web = TempDir::new().unwrap();
    let addr = serve(AppState::from_hub(&hub), web.path()).await;

    let mut stream = send_get(addr, "/api/history").await;
    let mut body = String::new();
    read_until(&mut stream, &mut body, "L12\"]}").await;
    assert!(body.contains(r#"{"lines":["L3","L4","#));
    assert!(!body.contains("\"L2\""));

    let mut stream = send_get(addr, "/api/status").await;
    let mut body = String::new();
    read_until(&mut stream, &mut body, "started_at").await;
    assert!(body.contains(r#""state":"running""#));
    assert!(body.contains(r#""history_len":10"#));

    hub.shutdown().await;
}

/// Non-API paths come from the web root.
#[tokio::test]
async fn test_static_files_served_from_web_root() {
    let file = NamedTempFile::new().unwrap();
    let hub = TailHub::start(file.path(), &fast_config()).unwrap();

    let web = TempDir::new().unwrap();
    std::fs::write(web.path().join("index.html"), "<h1>tailcast test page</h1>").unwrap();
    let addr = serve(AppState::from_hub(&hub), web.path()).await;

    let mut stream = send_get(addr, "/").await;
    let mut body = String::new();
    read_until(&mut stream, &mut body, "tailcast test page").await;
    assert!(body.starts_with("HTTP/1.1 200"));

    let mut stream = send_get(addr, "/missing.js").await;
    let mut body = String::new();
    read_until(&mut stream, &mut body, "\r\n").await;
    assert!(body.starts_with("HTTP/1.1 404"));

    hub.shutdown().await;
}
