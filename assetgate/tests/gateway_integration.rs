//! Tile gateway against a real HTTP upstream.
//!
//! Each test runs a throwaway upstream on a local TCP port that answers one
//! request with a canned response and records the request head it saw.

use std::sync::Arc;
use std::time::{Duration, Instant};

use assetgate::tile::{
    GatewayConfig, MemoryTileStore, TileCoordinate, TileError, TileGateway, TileOutcome,
    TileResponse,
};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

const PBF: &[u8] = b"\x1a\x02\x08\x01";

/// Start an upstream that answers one request with `head` followed by `body`.
///
/// Returns the base URL and a receiver for the raw request head.
async fn upstream(head: String, body: Vec<u8>) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_head(&mut socket).await;
        let _ = tx.send(request);

        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&body).await.unwrap();
        socket.shutdown().await.ok();
    });

    (format!("http://{}", addr), rx)
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buffer.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

fn response_head(status: &str, headers: &[(&str, &str)], body_len: usize) -> String {
    let mut head = format!("HTTP/1.1 {}\r\n", status);
    for (name, value) in headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str(&format!("content-length: {}\r\nconnection: close\r\n\r\n", body_len));
    head
}

fn gateway(store: MemoryTileStore, upstream_url: &str, timeout: Duration) -> TileGateway {
    let config = GatewayConfig::default()
        .with_upstream_url(upstream_url)
        .with_timeout(timeout);
    TileGateway::new(Arc::new(store), config).unwrap()
}

#[tokio::test]
async fn test_relays_example_tile() {
    let head = response_head("200 OK", &[("content-type", "application/x-protobuf")], PBF.len());
    let (base, request) = upstream(head, PBF.to_vec()).await;

    let gateway = gateway(
        MemoryTileStore::new(),
        &format!("{}/{{z}}/{{x}}/{{y}}.pbf", base),
        Duration::from_secs(5),
    );

    let response = gateway
        .get_external_tile(5, 10, 12, &HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.content_type().unwrap(), "application/x-protobuf");
    assert_eq!(response.into_bytes().await.unwrap(), Bytes::from_static(PBF));

    let request = request.await.unwrap();
    assert!(request.starts_with("GET /5/10/12.pbf HTTP/1.1"), "{}", request);
}

#[tokio::test]
async fn test_forwards_request_headers() {
    let (base, request) = upstream(response_head("200 OK", &[], 0), Vec::new()).await;
    let gateway = gateway(MemoryTileStore::new(), &base, Duration::from_secs(5));

    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
    headers.insert("x-request-id", HeaderValue::from_static("abc-123"));
    headers.insert("host", HeaderValue::from_static("gateway.internal"));

    gateway
        .get_external_tile(1, 1, 0, &headers)
        .await
        .unwrap()
        .into_bytes()
        .await
        .unwrap();

    let request = request.await.unwrap().to_ascii_lowercase();
    assert!(request.starts_with("get /1/1/0 http/1.1"), "{}", request);
    assert!(request.contains("authorization: bearer secret"));
    assert!(request.contains("x-request-id: abc-123"));
    assert!(!request.contains("gateway.internal"));
}

#[tokio::test]
async fn test_gzip_body_passed_through() {
    // Not valid gzip past the magic bytes; decoding would fail
    let body = b"\x1f\x8b\x08\x00opaque".to_vec();
    let head = response_head(
        "200 OK",
        &[
            ("content-type", "application/x-protobuf"),
            ("content-encoding", "gzip"),
        ],
        body.len(),
    );
    let (base, _request) = upstream(head, body.clone()).await;
    let gateway = gateway(MemoryTileStore::new(), &base, Duration::from_secs(5));

    let response = gateway
        .get_external_tile(0, 0, 0, &HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(response.content_encoding().unwrap(), "gzip");
    assert_eq!(response.into_bytes().await.unwrap(), Bytes::from(body));
}

#[tokio::test]
async fn test_upstream_status_relayed() {
    let head = response_head("404 Not Found", &[("content-type", "text/plain")], 9);
    let (base, _request) = upstream(head, b"not found".to_vec()).await;
    let gateway = gateway(MemoryTileStore::new(), &base, Duration::from_secs(5));

    let response = gateway
        .get_external_tile(2, 1, 1, &HeaderMap::new())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.into_bytes().await.unwrap(), Bytes::from_static(b"not found"));
}

#[tokio::test]
async fn test_large_body_streams_through_pipe() {
    let body: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let head = response_head("200 OK", &[], body.len());
    let (base, _request) = upstream(head, body.clone()).await;

    let config = GatewayConfig::default()
        .with_upstream_url(base.as_str())
        .with_chunk_size(1024)
        .with_pipe_capacity(2);
    let gateway = TileGateway::new(Arc::new(MemoryTileStore::new()), config).unwrap();

    let response = gateway
        .get_external_tile(0, 0, 0, &HeaderMap::new())
        .await
        .unwrap();
    let mut out = Vec::new();
    let written = response.copy_to(&mut out).await.unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(out, body);
}

#[tokio::test]
async fn test_unreachable_upstream_is_unavailable() {
    // Bind then drop to get a port with nothing listening
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let gateway = gateway(
        MemoryTileStore::new(),
        &format!("http://{}", addr),
        Duration::from_secs(2),
    );

    let err = gateway
        .get_external_tile(0, 0, 0, &HeaderMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, TileError::Unavailable));
}

#[tokio::test]
async fn test_silent_upstream_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_head(&mut socket).await;
        // Never answer
        tokio::time::sleep(Duration::from_secs(30)).await;
        drop(socket);
    });

    let timeout = Duration::from_millis(300);
    let gateway = gateway(MemoryTileStore::new(), &format!("http://{}", addr), timeout);

    let started = Instant::now();
    let err = gateway
        .get_external_tile(0, 0, 0, &HeaderMap::new())
        .await
        .unwrap_err();

    assert!(matches!(err, TileError::Unavailable));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_local_tile_preferred_over_upstream() {
    let store = MemoryTileStore::new();
    store.insert(TileCoordinate::new(5, 10, 12).unwrap(), b"local".to_vec());

    // Nothing listens here; a remote fetch would fail
    let gateway = gateway(store, "http://127.0.0.1:9/{z}/{x}/{y}", Duration::from_secs(1));

    assert_eq!(
        gateway.get_tile(5, 10, 12).await.unwrap(),
        TileOutcome::Local(Bytes::from_static(b"local"))
    );
    match gateway.resolve(5, 10, 12, &HeaderMap::new()).await.unwrap() {
        TileResponse::Local(data) => assert_eq!(data, Bytes::from_static(b"local")),
        other => panic!("expected local tile, got {:?}", other),
    }
}
