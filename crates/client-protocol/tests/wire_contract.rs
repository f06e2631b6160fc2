//! Byte-exact wire contract tests.
//!
//! The hex vectors here are the reference frames the engine quick-start
//! docs publish; if a real engine ever disagrees with this codec, these
//! tests are the arbiter.

use client_core::{Event, Request, Side};
use client_protocol::{
    decode_event_auto, decode_event_binary, decode_request_binary, encode_event_binary,
    encode_request_binary, format_event_csv, format_request_csv, is_binary, parse_event_line,
    parse_request_line,
};

fn encode_request(req: &Request) -> Vec<u8> {
    let mut out = Vec::new();
    encode_request_binary(req, &mut out).expect("encode request");
    out
}

fn encode_event(event: &Event) -> Vec<u8> {
    let mut out = Vec::new();
    encode_event_binary(event, &mut out).expect("encode event");
    out
}

#[test]
fn new_order_reference_frame() {
    let req = Request::new_order(1, "IBM", 10050, 50, Side::Buy, 7);
    let wire = encode_request(&req);

    let expected: [u8; 27] = [
        0x4D, 0x4E, // magic, 'N'
        0x00, 0x00, 0x00, 0x01, // user
        0x49, 0x42, 0x4D, 0x00, 0x00, 0x00, 0x00, 0x00, // "IBM" + nul pad
        0x00, 0x00, 0x27, 0x42, // price 10050
        0x00, 0x00, 0x00, 0x32, // qty 50
        0x42, // side 'B'
        0x00, 0x00, 0x00, 0x07, // order_id
    ];
    assert_eq!(wire, expected);
    assert_eq!(decode_request_binary(&wire).unwrap(), req);
}

#[test]
fn new_order_decodes_with_space_padded_symbol() {
    // Some engine builds pad the symbol field with 0x20 instead of 0x00.
    let mut wire = encode_request(&Request::new_order(1, "IBM", 10050, 50, Side::Buy, 7));
    for b in &mut wire[9..14] {
        *b = 0x20;
    }
    assert_eq!(
        decode_request_binary(&wire).unwrap(),
        Request::new_order(1, "IBM", 10050, 50, Side::Buy, 7)
    );
}

#[test]
fn top_of_book_reference_frame() {
    let wire: [u8; 20] = [
        0x4D, 0x42, // magic, 'B'
        0x49, 0x42, 0x4D, 0x00, 0x00, 0x00, 0x00, 0x00, // "IBM"
        0x53, // side 'S'
        0x00, 0x00, 0x27, 0x10, // price 10000
        0x00, 0x00, 0x00, 0x64, // qty 100
        0x00, // pad
    ];

    let Event::TopOfBook(tob) = decode_event_binary(&wire).unwrap() else {
        panic!("expected top-of-book");
    };
    assert_eq!(tob.symbol, "IBM");
    assert_eq!(tob.side, Side::Sell);
    assert_eq!(tob.price, 10000);
    assert_eq!(tob.qty, 100);
    assert!(!tob.eliminated());
}

#[test]
fn top_of_book_pad_byte_is_not_validated() {
    let mut wire = encode_event(&Event::top_of_book("IBM", Side::Sell, 10000, 100));
    wire[19] = 0xFF;
    assert!(decode_event_binary(&wire).is_ok());
}

#[test]
fn trade_csv_reference_line() {
    let event = parse_event_line("T,GOOG,1,11,2,22,2500,10").unwrap();
    assert_eq!(event, Event::trade("GOOG", 1, 11, 2, 22, 2500, 10));
}

#[test]
fn auto_classifies_eliminated_top_of_book_line() {
    let event = decode_event_auto(b"B,IBM,B,0,0\n").unwrap();
    let Event::TopOfBook(tob) = event else {
        panic!("expected top-of-book");
    };
    assert_eq!(tob.price, 0);
    assert_eq!(tob.qty, 0);
    assert!(tob.eliminated());
}

#[test]
fn binary_round_trip_all_requests() {
    let requests = [
        Request::new_order(42, "BTC-USD", 65_000_00, 3, Side::Sell, 900),
        Request::cancel(42, "BTC-USD", 900),
        Request::Flush,
    ];

    for req in requests {
        let wire = encode_request(&req);
        assert_eq!(decode_request_binary(&wire).unwrap(), req, "{req:?}");
    }
}

#[test]
fn binary_round_trip_all_wire_events() {
    let events = [
        Event::ack("IBM", 1, 7),
        Event::cancel_ack("IBM", 1, 7),
        Event::trade("GOOG", 1, 11, 2, 22, 2500, 10),
        Event::top_of_book("AAPL", Side::Buy, 19999, 250),
        Event::top_of_book("AAPL", Side::Sell, 0, 0),
        Event::Reject(client_core::Reject {
            symbol: "IBM".into(),
            user: 9,
            order_id: 77,
            reason: 2,
        }),
    ];

    for event in events {
        let wire = encode_event(&event);
        assert!(is_binary(&wire));
        assert_eq!(decode_event_binary(&wire).unwrap(), event, "{event:?}");
        // The auto entrypoint must agree with the direct decoder.
        assert_eq!(decode_event_auto(&wire).unwrap(), event);
    }
}

#[test]
fn csv_round_trip_all_wire_events() {
    let events = [
        Event::ack("IBM", 1, 7),
        Event::cancel_ack("IBM", 1, 7),
        Event::trade("GOOG", 1, 11, 2, 22, 2500, 10),
        Event::top_of_book("AAPL", Side::Buy, 19999, 250),
        Event::Reject(client_core::Reject {
            symbol: "IBM".into(),
            user: 9,
            order_id: 77,
            reason: 2,
        }),
    ];

    for event in events {
        let line = format_event_csv(&event).unwrap();
        assert!(!is_binary(line.as_bytes()));
        assert_eq!(parse_event_line(&line).unwrap(), event, "{line}");
        // With a trailing newline, through the auto entrypoint.
        let framed = format!("{line}\n");
        assert_eq!(decode_event_auto(framed.as_bytes()).unwrap(), event);
    }
}

#[test]
fn csv_round_trip_all_requests() {
    let requests = [
        Request::new_order(42, "BTC-USD", 65_000_00, 3, Side::Sell, 900),
        Request::cancel(42, "BTC-USD", 900),
        Request::Flush,
    ];

    for req in requests {
        let line = format_request_csv(&req);
        assert_eq!(parse_request_line(&line).unwrap(), req, "{line}");
    }
}
