//! End-to-end relay behaviour over real sockets.

mod common;

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

use common::{expect_bytes, ok_response, read_until_closed, start_proxy, start_raw_target};

#[tokio::test]
async fn rewrites_request_header_on_the_wire() {
    let (target, mut requests) = start_raw_target(|_| Some(ok_response("hi"))).await;
    let proxy = start_proxy(target, "").await;

    let mut client = proxy.connect().await;
    client
        .write_all(b"GET /x HTTP/1.1\r\nHost: h\r\nConnection: upgrade\r\nUpgrade: HTTP/2\r\nX-Trace: 1\r\nx-trace: 2\r\n\r\n")
        .await
        .unwrap();

    expect_bytes(&mut client, b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nhi").await;

    let forwarded = requests.recv().await.unwrap();
    assert_eq!(
        String::from_utf8_lossy(&forwarded),
        "GET /x HTTP/1.1\r\nhost: h\r\nconnection: close\r\nx-trace: 1\r\nx-trace: 2\r\n\r\n"
    );

    proxy.stop().await;
}

#[tokio::test]
async fn serves_sequential_exchanges_on_one_connection() {
    let (target, mut requests) = start_raw_target(|request| {
        let body = if request.starts_with(b"POST") { "created" } else { "fetched" };
        Some(ok_response(body))
    })
    .await;
    let proxy = start_proxy(target, "").await;

    let mut client = proxy.connect().await;
    client
        .write_all(b"POST /items HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc")
        .await
        .unwrap();
    expect_bytes(&mut client, b"HTTP/1.1 200 OK\r\ncontent-length: 7\r\n\r\ncreated").await;

    client.write_all(b"GET /items HTTP/1.1\r\n\r\n").await.unwrap();
    expect_bytes(&mut client, b"HTTP/1.1 200 OK\r\ncontent-length: 7\r\n\r\nfetched").await;

    assert!(requests.recv().await.unwrap().ends_with(b"\r\n\r\nabc"));
    assert!(requests.recv().await.unwrap().starts_with(b"GET /items"));

    proxy.stop().await;
}

#[tokio::test]
async fn relays_chunked_response_verbatim() {
    let body = "5\r\nhello\r\n7;ext=x\r\n, world\r\n0\r\n\r\n";
    let response = format!("HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n{body}");
    let (target, _requests) = start_raw_target(move |_| Some(response.clone().into_bytes())).await;
    let proxy = start_proxy(target, "").await;

    let mut client = proxy.connect().await;
    client.write_all(b"GET /stream HTTP/1.1\r\n\r\n").await.unwrap();

    let expected = format!("HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n{body}");
    expect_bytes(&mut client, expected.as_bytes()).await;

    proxy.stop().await;
}

#[tokio::test]
async fn unsupported_transfer_encoding_gets_411() {
    let (target, mut requests) = start_raw_target(|_| Some(ok_response(""))).await;
    let proxy = start_proxy(target, "").await;

    let mut client = proxy.connect().await;
    client
        .write_all(b"POST /upload HTTP/1.1\r\nTransfer-Encoding: gzip, chunked\r\n\r\n")
        .await
        .unwrap();

    assert_eq!(read_until_closed(&mut client).await, b"HTTP/1.1 411 Length Required\r\n\r\n");
    assert!(requests.try_recv().is_err());

    proxy.stop().await;
}

#[tokio::test]
async fn oversized_request_field_gets_431() {
    let (target, _requests) = start_raw_target(|_| Some(ok_response(""))).await;
    let proxy = start_proxy(target, "[http.request]\nfield_size_limit = 255\n").await;

    let mut client = proxy.connect().await;
    let request = format!("GET / HTTP/1.1\r\nCookie: {}\r\n\r\n", "x".repeat(300));
    client.write_all(request.as_bytes()).await.unwrap();

    assert_eq!(
        read_until_closed(&mut client).await,
        b"HTTP/1.1 431 Request Header Fields Too Large\r\n\r\n"
    );

    proxy.stop().await;
}

#[tokio::test]
async fn stalled_request_gets_408() {
    let (target, _requests) = start_raw_target(|_| Some(ok_response(""))).await;
    let proxy = start_proxy(target, "[http.request]\nreceive_timeout_ms = 200\n").await;

    let mut client = proxy.connect().await;
    client.write_all(b"GET / HTTP/1.1\r\nHost: slow").await.unwrap();

    assert_eq!(read_until_closed(&mut client).await, b"HTTP/1.1 408 Request Timeout\r\n\r\n");

    proxy.stop().await;
}

#[tokio::test]
async fn oversized_response_field_gets_502() {
    let response = format!("HTTP/1.1 200 OK\r\nSet-Cookie: {}\r\n\r\n", "s".repeat(400)).into_bytes();
    let (target, _requests) = start_raw_target(move |_| Some(response.clone())).await;
    let proxy = start_proxy(target, "[http.response]\nfield_size_limit = 255\n").await;

    let mut client = proxy.connect().await;
    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();

    assert_eq!(read_until_closed(&mut client).await, b"HTTP/1.1 502 Bad Gateway\r\n\r\n");

    proxy.stop().await;
}

#[tokio::test]
async fn silent_target_gets_504() {
    let (target, _requests) = start_raw_target(|_| None).await;
    let proxy = start_proxy(target, "[http.response]\nreceive_timeout_ms = 200\n").await;

    let mut client = proxy.connect().await;
    client.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();

    assert_eq!(read_until_closed(&mut client).await, b"HTTP/1.1 504 Gateway Timeout\r\n\r\n");

    proxy.stop().await;
}

#[tokio::test]
async fn relays_to_http_backend() {
    let app = Router::new()
        .route("/hello", get(|| async { "hello from backend" }))
        .route("/echo", post(|body: String| async move { body }));

    let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target = backend.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(backend, app).await.unwrap();
    });

    let proxy = start_proxy(target, "").await;
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    let base = format!("http://{}", proxy.address);

    let hello = client.get(format!("{base}/hello")).send().await.unwrap();
    assert_eq!(hello.status(), reqwest::StatusCode::OK);
    assert_eq!(hello.text().await.unwrap(), "hello from backend");

    let payload: String = (0..200_000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let echoed = client
        .post(format!("{base}/echo"))
        .body(payload.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(echoed.status(), reqwest::StatusCode::OK);
    assert_eq!(echoed.text().await.unwrap(), payload);

    proxy.stop().await;
}
