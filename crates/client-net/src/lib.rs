//! client-net
//!
//! Networking layer of the client toolkit:
//! - [`transport`] : stream / datagram / multicast transports with framing
//! - [`session`]   : codec + transport + protocol discovery state machine

pub mod error;
pub mod session;
pub mod transport;

pub use error::{SessionError, TransportError};
pub use session::{ClientSession, Incoming, Protocol};
pub use transport::{DatagramTransport, MulticastTransport, StreamTransport, Transport};
