//! Text-object form of engine events for subscribers.
//!
//! Field names are kebab-case, numbers stay numbers, side becomes
//! `"buy"` / `"sell"`, and the event type is its kebab-case variant
//! name under `"type"`. Each event is serialized exactly once per
//! broadcast; subscribers all receive the same buffer.

use client_core::{Event, Side};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum WireEvent<'a> {
    #[serde(rename_all = "kebab-case")]
    Ack {
        symbol: &'a str,
        user: u32,
        order_id: u32,
    },
    #[serde(rename_all = "kebab-case")]
    CancelAck {
        symbol: &'a str,
        user: u32,
        order_id: u32,
    },
    #[serde(rename_all = "kebab-case")]
    Reject {
        symbol: &'a str,
        user: u32,
        order_id: u32,
        reason: u8,
    },
    #[serde(rename_all = "kebab-case")]
    CancelReject {
        symbol: &'a str,
        user: u32,
        order_id: u32,
        reason: u8,
    },
    #[serde(rename_all = "kebab-case")]
    Trade {
        symbol: &'a str,
        buy_user: u32,
        buy_order: u32,
        sell_user: u32,
        sell_order: u32,
        price: u32,
        qty: u32,
    },
    #[serde(rename_all = "kebab-case")]
    TopOfBook {
        symbol: &'a str,
        side: &'static str,
        price: u32,
        qty: u32,
        eliminated: bool,
    },
}

fn side_name(side: Side) -> &'static str {
    match side {
        Side::Buy => "buy",
        Side::Sell => "sell",
    }
}

impl<'a> From<&'a Event> for WireEvent<'a> {
    fn from(event: &'a Event) -> Self {
        match event {
            Event::Ack(a) => WireEvent::Ack {
                symbol: &a.symbol,
                user: a.user,
                order_id: a.order_id,
            },
            Event::CancelAck(c) => WireEvent::CancelAck {
                symbol: &c.symbol,
                user: c.user,
                order_id: c.order_id,
            },
            Event::Reject(r) => WireEvent::Reject {
                symbol: &r.symbol,
                user: r.user,
                order_id: r.order_id,
                reason: r.reason,
            },
            Event::CancelReject(r) => WireEvent::CancelReject {
                symbol: &r.symbol,
                user: r.user,
                order_id: r.order_id,
                reason: r.reason,
            },
            Event::Trade(t) => WireEvent::Trade {
                symbol: &t.symbol,
                buy_user: t.buy_user,
                buy_order: t.buy_order,
                sell_user: t.sell_user,
                sell_order: t.sell_order,
                price: t.price,
                qty: t.qty,
            },
            Event::TopOfBook(t) => WireEvent::TopOfBook {
                symbol: &t.symbol,
                side: side_name(t.side),
                price: t.price,
                qty: t.qty,
                eliminated: t.eliminated(),
            },
        }
    }
}

/// Serialize one event to its subscriber-facing JSON text.
pub fn to_text(event: &Event) -> Result<String, serde_json::Error> {
    serde_json::to_string(&WireEvent::from(event))
}
