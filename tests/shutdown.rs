//! Graceful shutdown behaviour.

mod common;

use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use common::{expect_bytes, ok_response, read_until_closed, start_proxy, start_raw_target};

#[tokio::test]
async fn idle_connection_gets_503_and_proxy_stops() {
    let (target, _requests) = start_raw_target(|_| Some(ok_response("ok"))).await;
    let proxy = start_proxy(target, "").await;
    let address = proxy.address;

    let mut client = proxy.connect().await;
    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    expect_bytes(&mut client, b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok").await;

    proxy.stop().await;

    assert_eq!(read_until_closed(&mut client).await, b"HTTP/1.1 503 Service Unavailable\r\n\r\n");
    assert!(TcpStream::connect(address).await.is_err());
}

#[tokio::test]
async fn pending_response_is_interrupted_with_503() {
    let (target, mut requests) = start_raw_target(|_| None).await;
    let proxy = start_proxy(target, "").await;

    let mut client = proxy.connect().await;
    client.write_all(b"GET /slow HTTP/1.1\r\n\r\n").await.unwrap();
    requests.recv().await.unwrap();

    let started = Instant::now();
    proxy.stop().await;
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(read_until_closed(&mut client).await, b"HTTP/1.1 503 Service Unavailable\r\n\r\n");
}

#[tokio::test]
async fn upload_in_progress_is_interrupted() {
    let (target, _requests) = start_raw_target(|_| Some(ok_response(""))).await;
    let proxy = start_proxy(target, "[connection_handlers]\ntermination_timeout_ms = 100\n").await;

    let mut client = proxy.connect().await;
    client
        .write_all(b"POST /upload HTTP/1.1\r\nContent-Length: 1000000\r\n\r\npartial")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    proxy.stop().await;
    assert!(started.elapsed() < Duration::from_secs(2));

    assert_eq!(read_until_closed(&mut client).await, b"HTTP/1.1 503 Service Unavailable\r\n\r\n");
}
