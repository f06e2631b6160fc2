//! client-core
//!
//! Pure message model for the engine client toolkit:
//! - side (buy / sell)
//! - requests (client → engine)
//! - events (engine → client)

pub mod side;
pub mod messages;

pub use side::Side;

pub use messages::{
    Ack,
    Cancel,
    CancelAck,
    CancelReject,
    Event,
    NewOrder,
    Reject,
    Request,
    TopOfBook,
    Trade,
};
