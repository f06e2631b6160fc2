//! Message types exchanged with the matching engine.
//!
//! These are **transport-agnostic** logical messages:
//! - [`Request`]: what the client sends.
//! - [`Event`]: what the engine emits.
//!
//! Binary / CSV encoders live in the `client-protocol` crate; this module
//! is purely logical.

use crate::side::Side;

/// A request from the client into the matching engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// New limit order.
    NewOrder(NewOrder),

    /// Cancel an existing order by `(user, symbol, order_id)`.
    Cancel(Cancel),

    /// Flush all order books and engine state.
    Flush,
}

/// An event emitted by the matching engine.
///
/// Every variant carries `symbol` directly so downstream consumers
/// (stats, relay fan-out) can route without extra context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Acknowledgement of a new order.
    Ack(Ack),

    /// Acknowledgement of a cancel request.
    CancelAck(CancelAck),

    /// Rejection of a new order.
    Reject(Reject),

    /// Rejection of a cancel request.
    ///
    /// This engine dialect has no distinct wire record for it; the variant
    /// exists for consumers (relay filters) that speak richer dialects.
    CancelReject(CancelReject),

    /// Trade between a buyer and a seller.
    Trade(Trade),

    /// Top-of-book change or snapshot.
    TopOfBook(TopOfBook),
}

impl Event {
    /// Short name of the variant, kebab-case, as used in relay output
    /// and filter configuration.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Event::Ack(_) => "ack",
            Event::CancelAck(_) => "cancel-ack",
            Event::Reject(_) => "reject",
            Event::CancelReject(_) => "cancel-reject",
            Event::Trade(_) => "trade",
            Event::TopOfBook(_) => "top-of-book",
        }
    }
}

/// New order request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// User identifier (logical session / account).
    pub user: u32,

    /// Instrument symbol, 1..=8 ASCII chars, e.g. `"IBM"`.
    pub symbol: String,

    /// Limit price in the smallest quotable unit (cents).
    pub price: u32,

    /// Order quantity.
    pub qty: u32,

    /// Buy or Sell.
    pub side: Side,

    /// User-local order identifier (for canceling later).
    pub order_id: u32,
}

/// Cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancel {
    pub user: u32,
    pub symbol: String,
    pub order_id: u32,
}

/// Acknowledgement of a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub symbol: String,
    pub user: u32,
    pub order_id: u32,
}

/// Acknowledgement of a cancel request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelAck {
    pub symbol: String,
    pub user: u32,
    pub order_id: u32,
}

/// Rejection of a new order, with an engine-defined reason code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reject {
    pub symbol: String,
    pub user: u32,
    pub order_id: u32,
    pub reason: u8,
}

/// Rejection of a cancel request, with an engine-defined reason code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReject {
    pub symbol: String,
    pub user: u32,
    pub order_id: u32,
    pub reason: u8,
}

/// Trade event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub symbol: String,

    pub buy_user: u32,
    pub buy_order: u32,

    pub sell_user: u32,
    pub sell_order: u32,

    pub price: u32,
    pub qty: u32,
}

/// Top-of-book event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopOfBook {
    pub symbol: String,

    /// Side this event refers to (bid or ask).
    pub side: Side,

    /// Best price; `0` together with `qty == 0` means the side is gone.
    pub price: u32,

    /// Total quantity at the best price.
    pub qty: u32,
}

impl TopOfBook {
    /// A side is eliminated when both price and quantity are zero.
    pub fn eliminated(&self) -> bool {
        self.price == 0 && self.qty == 0
    }
}

// -----------------------------------------------------------------------------
// Convenience constructors
// -----------------------------------------------------------------------------

impl Request {
    /// Convenience constructor for a new order request.
    pub fn new_order(
        user: u32,
        symbol: impl Into<String>,
        price: u32,
        qty: u32,
        side: Side,
        order_id: u32,
    ) -> Self {
        Request::NewOrder(NewOrder {
            user,
            symbol: symbol.into(),
            price,
            qty,
            side,
            order_id,
        })
    }

    /// Convenience constructor for a cancel request.
    pub fn cancel(user: u32, symbol: impl Into<String>, order_id: u32) -> Self {
        Request::Cancel(Cancel {
            user,
            symbol: symbol.into(),
            order_id,
        })
    }
}

impl Event {
    /// Convenience constructor for an Ack event.
    pub fn ack(symbol: impl Into<String>, user: u32, order_id: u32) -> Self {
        Event::Ack(Ack {
            symbol: symbol.into(),
            user,
            order_id,
        })
    }

    /// Convenience constructor for a CancelAck event.
    pub fn cancel_ack(symbol: impl Into<String>, user: u32, order_id: u32) -> Self {
        Event::CancelAck(CancelAck {
            symbol: symbol.into(),
            user,
            order_id,
        })
    }

    /// Convenience constructor for a Trade event.
    pub fn trade(
        symbol: impl Into<String>,
        buy_user: u32,
        buy_order: u32,
        sell_user: u32,
        sell_order: u32,
        price: u32,
        qty: u32,
    ) -> Self {
        Event::Trade(Trade {
            symbol: symbol.into(),
            buy_user,
            buy_order,
            sell_user,
            sell_order,
            price,
            qty,
        })
    }

    /// Convenience constructor for a top-of-book event.
    pub fn top_of_book(symbol: impl Into<String>, side: Side, price: u32, qty: u32) -> Self {
        Event::TopOfBook(TopOfBook {
            symbol: symbol.into(),
            side,
            price,
            qty,
        })
    }
}
