//! Binary encoding/decoding for engine messages.
//!
//! This module converts between raw binary frames (`&[u8]`) and the
//! high-level `client_core::Request` / `Event` types.
//!
//! Framing model (single-message buffer; stream transports add their own
//! length prefix around these bytes):
//!
//! ```text
//! Request (client → engine)
//! -------------------------
//! [0]     : magic 0x4D ('M')
//! [1]     : type byte
//! [2..]   : body (depends on type)
//!
//! NewOrder ('N'), 27 bytes:
//!   [2..6]    user (u32 BE)
//!   [6..14]   symbol (8 bytes, right-padded)
//!   [14..18]  price (u32 BE)
//!   [18..22]  qty (u32 BE)
//!   [22]      side ('B' / 'S')
//!   [23..27]  order_id (u32 BE)
//!
//! Cancel ('C'), 18 bytes:
//!   [2..6]    user (u32 BE)
//!   [6..14]   symbol
//!   [14..18]  order_id (u32 BE)
//!
//! Flush ('F'), 2 bytes: no body.
//!
//! Event (engine → client)
//! -----------------------
//! Ack ('A') / CancelAck ('X'), 18 bytes:
//!   [2..10]   symbol
//!   [10..14]  user (u32 BE)
//!   [14..18]  order_id (u32 BE)
//!
//! Trade ('T'), 34 bytes:
//!   [2..10]   symbol
//!   [10..14]  buy_user      [14..18] buy_order
//!   [18..22]  sell_user     [22..26] sell_order
//!   [26..30]  price         [30..34] qty
//!
//! TopOfBook ('B'), 20 bytes:
//!   [2..10]   symbol
//!   [10]      side ('B' / 'S')
//!   [11..15]  price (u32 BE)
//!   [15..19]  qty (u32 BE)
//!   [19]      pad (consumed, not validated)
//!
//! Reject ('R'), 19 bytes:
//!   [2..10]   symbol
//!   [10..14]  user (u32 BE)
//!   [14..18]  order_id (u32 BE)
//!   [18]      reason
//! ```
//!
//! All multi-byte integers are big-endian. A top-of-book with
//! `price == 0 && qty == 0` denotes an eliminated side.

use client_core::{
    Ack, Cancel, CancelAck, Event, NewOrder, Reject, Request, Side, TopOfBook, Trade,
};

use crate::error::CodecError;
use crate::wire_types::{
    pad_symbol, unpad_symbol, EventType, RequestType, ACK_FRAME_LEN, CANCEL_ACK_FRAME_LEN,
    CANCEL_FRAME_LEN, MAGIC, NEW_ORDER_FRAME_LEN, REJECT_FRAME_LEN, SYMBOL_WIRE_LEN,
    TOP_OF_BOOK_FRAME_LEN, TRADE_FRAME_LEN,
};

// ============================================================================
// Requests: client → engine
// ============================================================================

/// Encode a single request into a binary frame, appended to `out`.
pub fn encode_request_binary(req: &Request, out: &mut Vec<u8>) -> Result<(), CodecError> {
    match req {
        Request::NewOrder(n) => encode_new_order(n, out),
        Request::Cancel(c) => encode_cancel(c, out),
        Request::Flush => {
            out.push(MAGIC);
            out.push(RequestType::Flush as u8);
            Ok(())
        }
    }
}

/// Decode a single request from a binary frame.
///
/// This is the **engine-facing** direction; the client toolkit uses it in
/// stub engines and replay tools.
pub fn decode_request_binary(buf: &[u8]) -> Result<Request, CodecError> {
    if buf.len() < 2 {
        return Err(CodecError::Truncated);
    }
    if buf[0] != MAGIC {
        return Err(CodecError::BadMagic);
    }

    let req_type = RequestType::from_u8(buf[1]).ok_or(CodecError::UnknownType(buf[1]))?;

    match req_type {
        RequestType::NewOrder => decode_new_order(buf),
        RequestType::Cancel => decode_cancel(buf),
        RequestType::Flush => Ok(Request::Flush),
    }
}

fn encode_new_order(n: &NewOrder, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let symbol = pad_symbol(&n.symbol)?;

    out.push(MAGIC);
    out.push(RequestType::NewOrder as u8);
    out.extend_from_slice(&n.user.to_be_bytes());
    out.extend_from_slice(&symbol);
    out.extend_from_slice(&n.price.to_be_bytes());
    out.extend_from_slice(&n.qty.to_be_bytes());
    out.push(n.side.as_char() as u8);
    out.extend_from_slice(&n.order_id.to_be_bytes());

    Ok(())
}

fn encode_cancel(c: &Cancel, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let symbol = pad_symbol(&c.symbol)?;

    out.push(MAGIC);
    out.push(RequestType::Cancel as u8);
    out.extend_from_slice(&c.user.to_be_bytes());
    out.extend_from_slice(&symbol);
    out.extend_from_slice(&c.order_id.to_be_bytes());

    Ok(())
}

fn decode_new_order(buf: &[u8]) -> Result<Request, CodecError> {
    if buf.len() < NEW_ORDER_FRAME_LEN {
        return Err(CodecError::Truncated);
    }

    let user = read_u32_be(&buf[2..6]);
    let symbol = unpad_symbol(&buf[6..6 + SYMBOL_WIRE_LEN])?;
    let price = read_u32_be(&buf[14..18]);
    let qty = read_u32_be(&buf[18..22]);
    let side = decode_side(buf[22])?;
    let order_id = read_u32_be(&buf[23..27]);

    Ok(Request::NewOrder(NewOrder {
        user,
        symbol,
        price,
        qty,
        side,
        order_id,
    }))
}

fn decode_cancel(buf: &[u8]) -> Result<Request, CodecError> {
    if buf.len() < CANCEL_FRAME_LEN {
        return Err(CodecError::Truncated);
    }

    let user = read_u32_be(&buf[2..6]);
    let symbol = unpad_symbol(&buf[6..6 + SYMBOL_WIRE_LEN])?;
    let order_id = read_u32_be(&buf[14..18]);

    Ok(Request::Cancel(Cancel {
        user,
        symbol,
        order_id,
    }))
}

// ============================================================================
// Events: engine → client
// ============================================================================

/// Encode a single event into a binary frame, appended to `out`.
///
/// This is the **engine-facing** direction; the client toolkit uses it to
/// build wire bytes in stub engines and tests. `CancelReject` has no wire
/// form in this dialect and fails with `ParseField`.
pub fn encode_event_binary(event: &Event, out: &mut Vec<u8>) -> Result<(), CodecError> {
    match event {
        Event::Ack(a) => {
            encode_order_ref(EventType::Ack, &a.symbol, a.user, a.order_id, out)
        }
        Event::CancelAck(c) => {
            encode_order_ref(EventType::CancelAck, &c.symbol, c.user, c.order_id, out)
        }
        Event::Reject(r) => {
            encode_order_ref(EventType::Reject, &r.symbol, r.user, r.order_id, out)?;
            out.push(r.reason);
            Ok(())
        }
        Event::CancelReject(_) => Err(CodecError::ParseField("cancel-reject")),
        Event::Trade(t) => encode_trade(t, out),
        Event::TopOfBook(t) => encode_top_of_book(t, out),
    }
}

/// Decode a single event from a binary frame.
pub fn decode_event_binary(buf: &[u8]) -> Result<Event, CodecError> {
    if buf.is_empty() {
        return Err(CodecError::Truncated);
    }
    if buf[0] != MAGIC {
        return Err(CodecError::BadMagic);
    }
    if buf.len() < 2 {
        return Err(CodecError::Truncated);
    }

    let event_type = EventType::from_u8(buf[1]).ok_or(CodecError::UnknownType(buf[1]))?;

    match event_type {
        EventType::Ack => {
            let (symbol, user, order_id) = decode_order_ref(buf, ACK_FRAME_LEN)?;
            Ok(Event::Ack(Ack {
                symbol,
                user,
                order_id,
            }))
        }
        EventType::CancelAck => {
            let (symbol, user, order_id) = decode_order_ref(buf, CANCEL_ACK_FRAME_LEN)?;
            Ok(Event::CancelAck(CancelAck {
                symbol,
                user,
                order_id,
            }))
        }
        EventType::Reject => {
            let (symbol, user, order_id) = decode_order_ref(buf, REJECT_FRAME_LEN)?;
            Ok(Event::Reject(Reject {
                symbol,
                user,
                order_id,
                reason: buf[18],
            }))
        }
        EventType::Trade => decode_trade(buf),
        EventType::TopOfBook => decode_top_of_book(buf),
    }
}

/// Shared layout of Ack / CancelAck / Reject prefix: symbol, user, order_id.
fn encode_order_ref(
    event_type: EventType,
    symbol: &str,
    user: u32,
    order_id: u32,
    out: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let symbol = pad_symbol(symbol)?;

    out.push(MAGIC);
    out.push(event_type as u8);
    out.extend_from_slice(&symbol);
    out.extend_from_slice(&user.to_be_bytes());
    out.extend_from_slice(&order_id.to_be_bytes());

    Ok(())
}

fn decode_order_ref(buf: &[u8], frame_len: usize) -> Result<(String, u32, u32), CodecError> {
    if buf.len() < frame_len {
        return Err(CodecError::Truncated);
    }

    let symbol = unpad_symbol(&buf[2..2 + SYMBOL_WIRE_LEN])?;
    let user = read_u32_be(&buf[10..14]);
    let order_id = read_u32_be(&buf[14..18]);

    Ok((symbol, user, order_id))
}

fn encode_trade(t: &Trade, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let symbol = pad_symbol(&t.symbol)?;

    out.push(MAGIC);
    out.push(EventType::Trade as u8);
    out.extend_from_slice(&symbol);
    out.extend_from_slice(&t.buy_user.to_be_bytes());
    out.extend_from_slice(&t.buy_order.to_be_bytes());
    out.extend_from_slice(&t.sell_user.to_be_bytes());
    out.extend_from_slice(&t.sell_order.to_be_bytes());
    out.extend_from_slice(&t.price.to_be_bytes());
    out.extend_from_slice(&t.qty.to_be_bytes());

    Ok(())
}

fn decode_trade(buf: &[u8]) -> Result<Event, CodecError> {
    if buf.len() < TRADE_FRAME_LEN {
        return Err(CodecError::Truncated);
    }

    let symbol = unpad_symbol(&buf[2..2 + SYMBOL_WIRE_LEN])?;

    Ok(Event::Trade(Trade {
        symbol,
        buy_user: read_u32_be(&buf[10..14]),
        buy_order: read_u32_be(&buf[14..18]),
        sell_user: read_u32_be(&buf[18..22]),
        sell_order: read_u32_be(&buf[22..26]),
        price: read_u32_be(&buf[26..30]),
        qty: read_u32_be(&buf[30..34]),
    }))
}

fn encode_top_of_book(t: &TopOfBook, out: &mut Vec<u8>) -> Result<(), CodecError> {
    let symbol = pad_symbol(&t.symbol)?;

    out.push(MAGIC);
    out.push(EventType::TopOfBook as u8);
    out.extend_from_slice(&symbol);
    out.push(t.side.as_char() as u8);
    out.extend_from_slice(&t.price.to_be_bytes());
    out.extend_from_slice(&t.qty.to_be_bytes());
    out.push(0); // trailing pad byte

    Ok(())
}

fn decode_top_of_book(buf: &[u8]) -> Result<Event, CodecError> {
    if buf.len() < TOP_OF_BOOK_FRAME_LEN {
        return Err(CodecError::Truncated);
    }

    let symbol = unpad_symbol(&buf[2..2 + SYMBOL_WIRE_LEN])?;
    let side = decode_side(buf[10])?;
    let price = read_u32_be(&buf[11..15]);
    let qty = read_u32_be(&buf[15..19]);
    // buf[19] is the pad byte: consumed, not validated.

    Ok(Event::TopOfBook(TopOfBook {
        symbol,
        side,
        price,
        qty,
    }))
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn decode_side(b: u8) -> Result<Side, CodecError> {
    Side::from_char(b as char).ok_or(CodecError::UnknownSide(b as char))
}

fn read_u32_be(bytes: &[u8]) -> u32 {
    let arr: [u8; 4] = bytes[0..4].try_into().expect("slice with incorrect length");
    u32::from_be_bytes(arr)
}
