//! Shared mock servers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use pool_warden::registry::RegisteredEndpoint;

/// Bind an ephemeral local port.
pub async fn bind_local() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let (listener, addr) = bind_local().await;
    drop(listener);
    addr
}

async fn read_http_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Some(String::from_utf8_lossy(&buf).into_owned());
        }
    }
}

async fn write_http_response(socket: &mut TcpStream, status: u16, body: &str) {
    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Plain HTTP server answering every request with `status` and `body`.
pub async fn start_mock_directory(status: u16, body: String) -> SocketAddr {
    let (listener, addr) = bind_local().await;

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let body = body.clone();
                    tokio::spawn(async move {
                        if read_http_head(&mut socket).await.is_some() {
                            write_http_response(&mut socket, status, &body).await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Complete the no-auth SOCKS5 handshake and a CONNECT request.
async fn socks5_accept(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut greeting = [0u8; 2];
    socket.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    socket.read_exact(&mut methods).await?;
    socket.write_all(&[0x05, 0x00]).await?;

    let mut request = [0u8; 4];
    socket.read_exact(&mut request).await?;
    let addr_len = match request[3] {
        0x01 => 4,
        0x04 => 16,
        0x03 => {
            let mut len = [0u8; 1];
            socket.read_exact(&mut len).await?;
            len[0] as usize
        }
        other => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown address type {other}"),
            ))
        }
    };
    let mut rest = vec![0u8; addr_len + 2];
    socket.read_exact(&mut rest).await?;

    socket
        .write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0])
        .await
}

/// SOCKS5 proxy that answers the tunnelled HTTP request itself.
///
/// `delay` is applied before the response is written.
pub async fn start_mock_socks(status: u16, delay: Duration) -> SocketAddr {
    let (listener, addr) = bind_local().await;

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if socks5_accept(&mut socket).await.is_err() {
                            return;
                        }
                        if read_http_head(&mut socket).await.is_none() {
                            return;
                        }
                        tokio::time::sleep(delay).await;
                        write_http_response(&mut socket, status, r#"{"ok":true}"#).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Accepts connections and never says a word.
pub async fn start_silent_socks() -> SocketAddr {
    let (listener, addr) = bind_local().await;

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    addr
}

/// Endpoint pointing at a local mock.
pub fn endpoint_at(name: &str, addr: SocketAddr, suspended: bool) -> RegisteredEndpoint {
    RegisteredEndpoint::new_suspended(name, addr.ip().to_string(), addr.port())
        .with_suspended(suspended)
}

/// Directory listing JSON for `(host, port, protocol)` triples.
pub fn listing(entries: &[(&str, u16, &str)]) -> String {
    let items: Vec<serde_json::Value> = entries
        .iter()
        .map(|(host, port, protocol)| {
            serde_json::json!({
                "server": host,
                "port": port,
                "protocol": protocol,
                "iso_code": "NL",
                "country": "Netherlands",
                "ping_time_ms": 80,
                "loss_ratio": 0.0,
            })
        })
        .collect();
    serde_json::Value::Array(items).to_string()
}
