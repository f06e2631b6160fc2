//! End-to-end fan-out over real WebSocket connections.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use client_core::Event;
use client_relay::server::{serve, AppState};
use client_relay::wire_json;
use client_relay::Registry;

async fn start_relay() -> (String, Arc<Registry>) {
    let registry = Arc::new(Registry::new());
    let state = AppState::new(registry.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        serve(listener, state, std::future::pending()).await.unwrap();
    });

    (addr, registry)
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn subscriber_receives_broadcast_events_as_text_frames() {
    let (addr, registry) = start_relay().await;

    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let (_tx, mut rx) = ws.split();

    let reg = registry.clone();
    wait_until(move || reg.len() == 1).await;

    let text = wire_json::to_text(&Event::trade("GOOG", 1, 11, 2, 22, 2500, 10)).unwrap();
    registry.broadcast(Arc::from(text.clone()));

    match rx.next().await.unwrap().unwrap() {
        Message::Text(got) => assert_eq!(got, text),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn ping_is_answered_with_matching_pong() {
    let (addr, registry) = start_relay().await;

    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let (mut tx, mut rx) = ws.split();

    let reg = registry.clone();
    wait_until(move || reg.len() == 1).await;

    tx.send(Message::Ping(b"are-you-there".to_vec()))
        .await
        .unwrap();

    loop {
        match rx.next().await.unwrap().unwrap() {
            Message::Pong(payload) => {
                assert_eq!(payload, b"are-you-there");
                break;
            }
            _ => continue,
        }
    }
}

#[tokio::test]
async fn close_frame_deregisters_the_subscriber() {
    let (addr, registry) = start_relay().await;

    let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    let reg = registry.clone();
    wait_until(move || reg.len() == 1).await;

    ws.close(None).await.unwrap();

    let reg = registry.clone();
    wait_until(move || reg.is_empty()).await;
}

#[tokio::test]
async fn client_binary_frames_are_ignored() {
    let (addr, registry) = start_relay().await;

    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let (mut tx, mut rx) = ws.split();

    let reg = registry.clone();
    wait_until(move || reg.len() == 1).await;

    tx.send(Message::Binary(vec![0x4D, 0x00, 0xFF])).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(registry.len(), 1, "binary frames must not disconnect");

    registry.broadcast(Arc::from("{\"type\":\"ack\"}"));
    match rx.next().await.unwrap().unwrap() {
        Message::Text(got) => assert_eq!(got, "{\"type\":\"ack\"}"),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[tokio::test]
async fn stalled_subscriber_is_dropped_without_hurting_the_rest() {
    let (addr, registry) = start_relay().await;

    // The stalled one: connected, then never polled again.
    let (_stalled_ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();

    // The healthy one: reads everything.
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let (_tx, mut rx) = ws.split();

    let reg = registry.clone();
    wait_until(move || reg.len() == 2).await;

    let counter = tokio::spawn(async move {
        let mut texts = 0u64;
        while let Some(Ok(msg)) = rx.next().await {
            if let Message::Text(text) = msg {
                texts += 1;
                if text.contains("\"the-end\"") {
                    break;
                }
            }
        }
        texts
    });

    // Enough volume to fill the stalled peer's socket buffers and then
    // its mailbox.
    let filler: String = format!("{{\"pad\":\"{}\"}}", "x".repeat(4096));
    const EVENTS: u64 = 2_000;
    for i in 0..EVENTS {
        registry.broadcast(Arc::from(filler.clone()));
        tokio::task::yield_now().await;
        // Pace the flood so the healthy writer keeps its mailbox clear;
        // the stalled writer is blocked on its socket regardless.
        if i % 128 == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
    registry.broadcast(Arc::from("{\"type\":\"the-end\"}"));

    let texts = tokio::time::timeout(Duration::from_secs(30), counter)
        .await
        .expect("healthy subscriber must keep receiving")
        .unwrap();
    assert_eq!(texts, EVENTS + 1, "healthy subscriber saw every event");

    let reg = registry.clone();
    wait_until(move || reg.len() == 1).await;
}

#[tokio::test]
async fn health_and_clients_answer_plain_http() {
    let (addr, registry) = start_relay().await;

    let (_ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let reg = registry.clone();
    wait_until(move || reg.len() == 1).await;

    let health = http_get(&addr, "/health").await;
    assert!(health.contains("\"status\":\"ok\""), "{health}");
    assert!(health.contains("\"subscribers\":1"), "{health}");

    let clients = http_get(&addr, "/clients").await;
    assert!(clients.contains("\"peer\""), "{clients}");
    assert!(clients.contains("\"connected-at\""), "{clients}");
}

async fn http_get(addr: &str, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: relay\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}
