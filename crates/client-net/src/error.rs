//! Error types for transports and sessions.

use std::io;

use client_protocol::CodecError;
use thiserror::Error;

/// Errors produced by the transport layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer refused (or otherwise failed) the connection attempt.
    #[error("connect to {addr} failed: {source}")]
    ConnectRefused {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The connect deadline elapsed before the peer answered.
    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    /// Bind or multicast join failed.
    #[error("bind failed: {0}")]
    Bind(#[source] io::Error),

    /// Mid-session read failure.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// Mid-session write failure.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// The transport is closed (locally or by the peer).
    #[error("transport closed")]
    Closed,

    /// Payload length outside the accepted 1..=65535 range on a stream
    /// transport. The connection is closed when this is raised.
    #[error("frame length {0} outside 1..=65535")]
    FrameTooLarge(usize),

    /// Send attempted on a receive-only (multicast) transport.
    #[error("send on a receive-only transport")]
    SendOnReadOnly,
}

/// Errors produced by session operations: either the transport died, or
/// an outbound message could not be encoded.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("encode failed: {0}")]
    Encode(#[from] CodecError),
}
