//! Line-oriented text codec.
//!
//! One record per line, `\n`-terminated, fields comma-separated, ASCII.
//! Whitespace around fields is tolerated on decode.
//!
//! Request lines (client → engine):
//!
//! - New order: `N,<user>,<symbol>,<price>,<qty>,<B|S>,<order>`
//! - Cancel:    `C,<user>,<symbol>,<order>`
//! - Flush:     `F`
//!
//! Event lines (engine → client):
//!
//! - Ack:        `A,<symbol>,<user>,<order>`
//! - CancelAck:  `X,<symbol>,<user>,<order>`
//! - Trade:      `T,<symbol>,<buy_user>,<buy_order>,<sell_user>,<sell_order>,<price>,<qty>`
//! - TopOfBook:  `B,<symbol>,<B|S>,<price|->,<qty|->`
//! - Reject:     `R,<symbol>,<user>,<order>,<reason>`
//!
//! A `-` in a top-of-book price or quantity denotes an eliminated side;
//! both fields decode to 0. The encoder always emits the `0,0` form.

use client_core::{
    Ack, Cancel, CancelAck, Event, NewOrder, Reject, Request, Side, TopOfBook, Trade,
};

use crate::error::CodecError;

/// Parse a single CSV line into a [`Request`].
pub fn parse_request_line(line: &str) -> Result<Request, CodecError> {
    let tokens = split_and_trim(line);
    let tag = tokens.first().ok_or(CodecError::ParseField("record"))?;

    match *tag {
        "N" => parse_new_order(&tokens),
        "C" => parse_cancel(&tokens),
        "F" => {
            if tokens.len() == 1 {
                Ok(Request::Flush)
            } else {
                Err(CodecError::ParseField("flush"))
            }
        }
        other => Err(CodecError::UnknownType(first_byte(other))),
    }
}

/// Format a [`Request`] as a CSV line (no trailing newline).
pub fn format_request_csv(req: &Request) -> String {
    match req {
        Request::NewOrder(n) => format!(
            "N,{},{},{},{},{},{}",
            n.user,
            n.symbol,
            n.price,
            n.qty,
            n.side.as_char(),
            n.order_id
        ),
        Request::Cancel(c) => format!("C,{},{},{}", c.user, c.symbol, c.order_id),
        Request::Flush => "F".to_string(),
    }
}

/// Parse a single CSV line into an [`Event`].
pub fn parse_event_line(line: &str) -> Result<Event, CodecError> {
    let tokens = split_and_trim(line);
    let tag = tokens.first().ok_or(CodecError::ParseField("record"))?;

    match *tag {
        "A" => {
            let (symbol, user, order_id) = parse_order_ref(&tokens)?;
            Ok(Event::Ack(Ack {
                symbol,
                user,
                order_id,
            }))
        }
        "X" => {
            let (symbol, user, order_id) = parse_order_ref(&tokens)?;
            Ok(Event::CancelAck(CancelAck {
                symbol,
                user,
                order_id,
            }))
        }
        "T" => parse_trade(&tokens),
        "B" => parse_top_of_book(&tokens),
        "R" => parse_reject(&tokens),
        other => Err(CodecError::UnknownType(first_byte(other))),
    }
}

/// Format an [`Event`] as a CSV line (no trailing newline).
///
/// `CancelReject` has no wire form in this dialect and fails with
/// `ParseField`.
pub fn format_event_csv(event: &Event) -> Result<String, CodecError> {
    match event {
        Event::Ack(a) => Ok(format!("A,{},{},{}", a.symbol, a.user, a.order_id)),
        Event::CancelAck(c) => Ok(format!("X,{},{},{}", c.symbol, c.user, c.order_id)),
        Event::Reject(r) => Ok(format!(
            "R,{},{},{},{}",
            r.symbol, r.user, r.order_id, r.reason
        )),
        Event::CancelReject(_) => Err(CodecError::ParseField("cancel-reject")),
        Event::Trade(t) => Ok(format!(
            "T,{},{},{},{},{},{},{}",
            t.symbol, t.buy_user, t.buy_order, t.sell_user, t.sell_order, t.price, t.qty
        )),
        Event::TopOfBook(t) => Ok(format!(
            "B,{},{},{},{}",
            t.symbol,
            t.side.as_char(),
            t.price,
            t.qty
        )),
    }
}

// -----------------------------------------------------------------------------
// Per-record parsers
// -----------------------------------------------------------------------------

fn parse_new_order(tokens: &[&str]) -> Result<Request, CodecError> {
    // N, user, symbol, price, qty, side, order
    if tokens.len() != 7 {
        return Err(CodecError::ParseField("new-order"));
    }

    Ok(Request::NewOrder(NewOrder {
        user: parse_u32(tokens[1], "user")?,
        symbol: parse_symbol(tokens[2])?,
        price: parse_u32(tokens[3], "price")?,
        qty: parse_u32(tokens[4], "qty")?,
        side: parse_side(tokens[5])?,
        order_id: parse_u32(tokens[6], "order")?,
    }))
}

fn parse_cancel(tokens: &[&str]) -> Result<Request, CodecError> {
    // C, user, symbol, order
    if tokens.len() != 4 {
        return Err(CodecError::ParseField("cancel"));
    }

    Ok(Request::Cancel(Cancel {
        user: parse_u32(tokens[1], "user")?,
        symbol: parse_symbol(tokens[2])?,
        order_id: parse_u32(tokens[3], "order")?,
    }))
}

fn parse_order_ref(tokens: &[&str]) -> Result<(String, u32, u32), CodecError> {
    // A|X, symbol, user, order
    if tokens.len() != 4 {
        return Err(CodecError::ParseField("record"));
    }

    Ok((
        parse_symbol(tokens[1])?,
        parse_u32(tokens[2], "user")?,
        parse_u32(tokens[3], "order")?,
    ))
}

fn parse_trade(tokens: &[&str]) -> Result<Event, CodecError> {
    // T, symbol, buy_user, buy_order, sell_user, sell_order, price, qty
    if tokens.len() != 8 {
        return Err(CodecError::ParseField("trade"));
    }

    Ok(Event::Trade(Trade {
        symbol: parse_symbol(tokens[1])?,
        buy_user: parse_u32(tokens[2], "buy-user")?,
        buy_order: parse_u32(tokens[3], "buy-order")?,
        sell_user: parse_u32(tokens[4], "sell-user")?,
        sell_order: parse_u32(tokens[5], "sell-order")?,
        price: parse_u32(tokens[6], "price")?,
        qty: parse_u32(tokens[7], "qty")?,
    }))
}

fn parse_top_of_book(tokens: &[&str]) -> Result<Event, CodecError> {
    // B, symbol, side, price|-, qty|-
    if tokens.len() != 5 {
        return Err(CodecError::ParseField("top-of-book"));
    }

    let symbol = parse_symbol(tokens[1])?;
    let side = parse_side(tokens[2])?;

    // Either field `-` means the whole side is eliminated.
    let (price, qty) = if tokens[3] == "-" || tokens[4] == "-" {
        (0, 0)
    } else {
        (
            parse_u32(tokens[3], "price")?,
            parse_u32(tokens[4], "qty")?,
        )
    };

    Ok(Event::TopOfBook(TopOfBook {
        symbol,
        side,
        price,
        qty,
    }))
}

fn parse_reject(tokens: &[&str]) -> Result<Event, CodecError> {
    // R, symbol, user, order, reason
    if tokens.len() != 5 {
        return Err(CodecError::ParseField("reject"));
    }

    Ok(Event::Reject(Reject {
        symbol: parse_symbol(tokens[1])?,
        user: parse_u32(tokens[2], "user")?,
        order_id: parse_u32(tokens[3], "order")?,
        reason: tokens[4]
            .parse::<u8>()
            .map_err(|_| CodecError::ParseField("reason"))?,
    }))
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn split_and_trim(line: &str) -> Vec<&str> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split(',').map(str::trim).collect()
}

fn parse_u32(token: &str, field: &'static str) -> Result<u32, CodecError> {
    token
        .parse::<u32>()
        .map_err(|_| CodecError::ParseField(field))
}

fn parse_symbol(token: &str) -> Result<String, CodecError> {
    if token.is_empty() || token.len() > 8 || !token.is_ascii() {
        return Err(CodecError::ParseField("symbol"));
    }
    Ok(token.to_string())
}

fn parse_side(token: &str) -> Result<Side, CodecError> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Side::from_char(c).ok_or(CodecError::UnknownSide(c)),
        _ => Err(CodecError::ParseField("side")),
    }
}

fn first_byte(token: &str) -> u8 {
    token.as_bytes().first().copied().unwrap_or(0)
}
