//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use transparent_proxy::config::parse_config;
use transparent_proxy::lifecycle::startup;
use transparent_proxy::net::Listener;
use transparent_proxy::Shutdown;

/// A proxy running on an ephemeral port.
pub struct TestProxy {
    pub address: SocketAddr,
    pub shutdown: Shutdown,
    pub task: JoinHandle<()>,
}

impl TestProxy {
    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.address).await.unwrap()
    }

    /// Trigger shutdown and wait for the proxy to stop.
    pub async fn stop(self) {
        self.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), self.task)
            .await
            .expect("proxy did not stop")
            .unwrap();
    }
}

/// Start a proxy in front of `target`. `extra` is appended to the TOML.
pub async fn start_proxy(target: SocketAddr, extra: &str) -> TestProxy {
    let config = parse_config(&format!(
        "[target]\naddress = \"{}\"\nport = {}\nconnect_timeout_ms = 1000\n\n{extra}",
        target.ip(),
        target.port()
    ))
    .unwrap();

    let tcp = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = tcp.local_addr().unwrap();
    let listener = Listener::from_tcp(tcp, 64);
    let shutdown = Shutdown::new();

    let serving = shutdown.clone();
    let task = tokio::spawn(async move {
        startup::serve(&config, listener, &serving).await;
    });

    TestProxy {
        address,
        shutdown,
        task,
    }
}

/// Start a raw TCP target that records every request it receives.
///
/// `respond` maps the raw request bytes to the raw response; `None` keeps
/// the connection open without answering.
pub async fn start_raw_target<F>(respond: F) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>)
where
    F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (requests_tx, requests_rx) = mpsc::unbounded_channel();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let respond = Arc::clone(&respond);
            let requests_tx = requests_tx.clone();
            tokio::spawn(async move {
                let mut socket = BufReader::new(socket);
                while let Some(request) = read_message(&mut socket).await {
                    let _ = requests_tx.send(request.clone());
                    match respond(&request) {
                        Some(response) => {
                            if socket.get_mut().write_all(&response).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            let mut rest = Vec::new();
                            let _ = socket.read_to_end(&mut rest).await;
                            break;
                        }
                    }
                }
            });
        }
    });

    (address, requests_rx)
}

/// Read one message framed by `content-length` (or without a body).
pub async fn read_message<R>(reader: &mut R) -> Option<Vec<u8>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let mut message = Vec::new();
    let mut content_length = 0usize;

    loop {
        let start = message.len();
        let read = reader.read_until(b'\n', &mut message).await.ok()?;
        if read == 0 {
            return None;
        }
        let line = String::from_utf8_lossy(&message[start..]).to_ascii_lowercase();
        if line == "\r\n" {
            break;
        }
        if let Some(value) = line.strip_prefix("content-length:") {
            content_length = value.trim().parse().ok()?;
        }
    }

    let start = message.len();
    message.resize(start + content_length, 0);
    reader.read_exact(&mut message[start..]).await.ok()?;
    Some(message)
}

/// A fixed `200 OK` response with `body`.
pub fn ok_response(body: &str) -> Vec<u8> {
    format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{body}", body.len()).into_bytes()
}

/// Read exactly `expected.len()` bytes and compare them as text.
pub async fn expect_bytes(stream: &mut TcpStream, expected: &[u8]) {
    let mut received = vec![0; expected.len()];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut received))
        .await
        .expect("timed out waiting for bytes")
        .unwrap();
    assert_eq!(String::from_utf8_lossy(&received), String::from_utf8_lossy(expected));
}

/// Everything the peer sends until it closes the connection.
pub async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let _ = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received))
        .await
        .expect("connection was not closed");
    received
}
