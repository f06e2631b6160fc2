//! Protocol discovery against scripted peers: binary, text, and mute.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use client_core::{Event, Request};
use client_net::{ClientSession, Incoming, Protocol, StreamTransport, Transport};
use client_protocol::{decode_request_binary, encode_event_binary, format_event_csv};

async fn write_frame(stream: &mut TcpStream, payload: &[u8]) {
    let prefix = (payload.len() as u32).to_be_bytes();
    stream.write_all(&prefix).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.flush().await.unwrap();
}

async fn read_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut prefix = [0u8; 4];
    stream.read_exact(&mut prefix).await.unwrap();
    let len = u32::from_be_bytes(prefix) as usize;
    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await.unwrap();
    payload
}

async fn session_against<F, Fut>(peer: F) -> (ClientSession, tokio::task::JoinHandle<()>)
where
    F: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let peer_task = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        peer(stream).await;
    });

    let transport = StreamTransport::connect(&addr.to_string(), Duration::from_secs(1))
        .await
        .unwrap();
    (ClientSession::new(Transport::Stream(transport)), peer_task)
}

#[tokio::test]
async fn binary_peer_is_detected_and_probe_is_withdrawn() {
    let (mut session, peer) = session_against(|mut stream| async move {
        // Probe arrives as a framed binary NewOrder for the probe user.
        let probe = read_frame(&mut stream).await;
        let Request::NewOrder(order) = decode_request_binary(&probe).unwrap() else {
            panic!("expected a new-order probe");
        };
        assert_eq!(order.symbol, "PROBE");
        assert_eq!(order.user, 999_999);

        // Answer with a binary ack.
        let mut ack = Vec::new();
        encode_event_binary(
            &Event::ack(order.symbol.clone(), order.user, order.order_id),
            &mut ack,
        )
        .unwrap();
        write_frame(&mut stream, &ack).await;

        // The session must withdraw the probe with a matching cancel.
        let withdraw = read_frame(&mut stream).await;
        let Request::Cancel(cancel) = decode_request_binary(&withdraw).unwrap() else {
            panic!("expected the probe cancel");
        };
        assert_eq!(cancel.order_id, order.order_id);
    })
    .await;

    assert_eq!(session.protocol(), Protocol::Unknown);
    let detected = session.detect().await.unwrap();
    assert_eq!(detected, Protocol::Binary);
    peer.await.unwrap();
}

#[tokio::test]
async fn text_peer_is_detected_as_csv() {
    let (mut session, peer) = session_against(|mut stream| async move {
        let probe = read_frame(&mut stream).await;
        let Request::NewOrder(order) = decode_request_binary(&probe).unwrap() else {
            panic!("expected a new-order probe");
        };

        // A text engine answers in CSV even to a binary-looking blob.
        let line = format!(
            "{}\n",
            format_event_csv(&Event::ack(order.symbol, order.user, order.order_id)).unwrap()
        );
        write_frame(&mut stream, line.as_bytes()).await;

        // Keep the socket open while discovery drains.
        tokio::time::sleep(Duration::from_millis(300)).await;
    })
    .await;

    let detected = session.detect().await.unwrap();
    assert_eq!(detected, Protocol::Csv);
    peer.await.unwrap();
}

#[tokio::test]
async fn mute_peer_defaults_to_binary() {
    let (mut session, _peer) = session_against(|mut stream| async move {
        // Swallow both probes, answer neither.
        let _ = read_frame(&mut stream).await;
        let _ = read_frame(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    })
    .await;

    let detected = session.detect().await.unwrap();
    assert_eq!(detected, Protocol::Binary);
}

#[tokio::test]
async fn detected_protocol_only_moves_by_override() {
    let (mut session, _peer) = session_against(|mut stream| async move {
        let probe = read_frame(&mut stream).await;
        let Request::NewOrder(order) = decode_request_binary(&probe).unwrap() else {
            panic!("expected a new-order probe");
        };
        let mut ack = Vec::new();
        encode_event_binary(
            &Event::ack(order.symbol, order.user, order.order_id),
            &mut ack,
        )
        .unwrap();
        write_frame(&mut stream, &ack).await;

        // Stay connected but silent afterwards.
        let _ = read_frame(&mut stream).await;
        tokio::time::sleep(Duration::from_secs(2)).await;
    })
    .await;

    session.detect().await.unwrap();
    assert_eq!(session.protocol(), Protocol::Binary);

    // Idle receives must not disturb the detected value.
    for _ in 0..3 {
        let got = session.recv(Duration::from_millis(50)).await.unwrap();
        assert!(got.is_none());
        assert_eq!(session.protocol(), Protocol::Binary);
    }

    // An explicit override is the only other transition.
    session.set_protocol(Protocol::Csv);
    assert_eq!(session.protocol(), Protocol::Csv);
}

#[tokio::test]
async fn garbage_payload_is_a_parse_error_not_a_session_death() {
    let (mut session, _peer) = session_against(|mut stream| async move {
        // An unknown binary type byte.
        write_frame(&mut stream, &[0x4D, b'Z', 1, 2, 3]).await;
        // Followed by a well-formed event.
        let mut ack = Vec::new();
        encode_event_binary(&Event::ack("IBM", 1, 7), &mut ack).unwrap();
        write_frame(&mut stream, &ack).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
    })
    .await;

    let first = session.recv(Duration::from_secs(1)).await.unwrap().unwrap();
    assert!(matches!(first, Incoming::ParseError { .. }));

    let second = session.recv(Duration::from_secs(1)).await.unwrap().unwrap();
    assert_eq!(second, Incoming::Event(Event::ack("IBM", 1, 7)));
}

#[tokio::test]
async fn drain_collects_queued_events() {
    let (mut session, _peer) = session_against(|mut stream| async move {
        for i in 0..10u32 {
            let mut wire = Vec::new();
            encode_event_binary(&Event::ack("IBM", 1, i), &mut wire).unwrap();
            write_frame(&mut stream, &wire).await;
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    })
    .await;

    let received = session.drain(Duration::from_millis(500)).await.unwrap();
    assert_eq!(received.len(), 10);
    assert_eq!(received[0], Incoming::Event(Event::ack("IBM", 1, 0)));
    assert_eq!(received[9], Incoming::Event(Event::ack("IBM", 1, 9)));
}
