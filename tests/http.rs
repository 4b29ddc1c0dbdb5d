//! Drives the HTTP front end over a loopback socket.

use std::net::SocketAddr;
use std::time::Duration;

use redislike::{serve, Store};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

async fn start() -> (SocketAddr, Store, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store = Store::new();
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(serve(listener, store.clone(), async move {
        let _ = rx.await;
    }));
    (addr, store, tx)
}

async fn exchange(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

async fn call(addr: SocketAddr, method: &str, path: &str, body: Option<&str>) -> (u16, String) {
    let raw = match body {
        Some(body) => format!(
            "{method} {path} HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
        None => format!("{method} {path} HTTP/1.1\r\nConnection: close\r\n\r\n"),
    };
    let response = exchange(addr, &raw).await;
    let status = response[9..12].parse().unwrap();
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.trim_end().to_string())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn set_get_remove_over_http() {
    let (addr, store, _shutdown) = start().await;

    let (status, body) = call(addr, "POST", "/set", Some(r#"{"key":"abc","value":"v"}"#)).await;
    assert_eq!((status, body.as_str()), (200, r#"{"value":"ok"}"#));
    assert_eq!(store.get("abc"), Ok("v".to_string()));

    let (status, body) = call(addr, "GET", "/get/abc", None).await;
    assert_eq!((status, body.as_str()), (200, r#"{"value":"v"}"#));

    let (status, body) = call(addr, "GET", "/keys", None).await;
    assert_eq!((status, body.as_str()), (200, r#"{"value":["abc"]}"#));

    let (status, _) = call(addr, "DELETE", "/remove/abc", None).await;
    assert_eq!(status, 200);

    let (status, body) = call(addr, "GET", "/get/abc", None).await;
    assert_eq!((status, body.as_str()), (500, r#"{"error":"key not found"}"#));
}

#[tokio::test]
async fn ttl_over_http() {
    let (addr, store, _shutdown) = start().await;
    store.set("k", "v");

    let (status, body) = call(addr, "POST", "/ttl/k", Some(r#"{"value":-1}"#)).await;
    assert_eq!((status, body.as_str()), (500, r#"{"error":"invalid ttl value"}"#));

    let (status, _) = call(addr, "POST", "/ttl/k", Some(r#"{"value":1}"#)).await;
    assert_eq!(status, 200);

    tokio::time::sleep(Duration::from_millis(1300)).await;
    let (status, _) = call(addr, "GET", "/get/k", None).await;
    assert_eq!(status, 500);
}

#[tokio::test]
async fn malformed_requests() {
    let (addr, _store, _shutdown) = start().await;

    let (status, _) = call(addr, "POST", "/set", Some("{oops")).await;
    assert_eq!(status, 400);

    let (status, _) = call(addr, "GET", "/unknown", None).await;
    assert_eq!(status, 404);

    let (status, _) = call(addr, "GET", "/push", None).await;
    assert_eq!(status, 405);

    let response = exchange(
        addr,
        "POST /set HTTP/1.1\r\nContent-Type: text/plain\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{}",
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 415"));

    let response = exchange(addr, "NOT HTTP AT ALL\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 400"));
}

#[tokio::test]
async fn keep_alive_serves_pipelined_requests() {
    let (addr, _store, _shutdown) = start().await;
    let push = r#"{"key":"l","value":["a","b"]}"#;
    let raw = format!(
        "POST /push HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{push}\
         GET /pop/l HTTP/1.1\r\n\r\n\
         GET /pop/l HTTP/1.1\r\nConnection: close\r\n\r\n",
        push.len()
    );

    let response = exchange(addr, &raw).await;

    assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 3);
    let a = response.find(r#"{"value":"a"}"#).unwrap();
    let b = response.find(r#"{"value":"b"}"#).unwrap();
    assert!(a < b);
}

#[tokio::test]
async fn concurrent_pushes_over_http() {
    let (addr, store, _shutdown) = start().await;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            tokio::spawn(async move {
                let body = format!(r#"{{"key":"l","value":["{i}"]}}"#);
                call(addr, "POST", "/push", Some(&body)).await
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().0, 200);
    }

    let mut seen = Vec::new();
    while let Ok(item) = store.pop("l") {
        seen.push(item.parse::<u32>().unwrap());
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..20).collect::<Vec<_>>());
}

#[tokio::test]
async fn stops_accepting_after_shutdown() {
    let (addr, _store, shutdown) = start().await;
    shutdown.send(()).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(TcpStream::connect(addr).await.is_err());
}
