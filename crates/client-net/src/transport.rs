//! Transports: opaque byte payloads to/from a peer.
//!
//! Three variants behind one enum:
//!
//! - [`StreamTransport`]    : TCP with a 4-byte big-endian length prefix
//!                            around every payload.
//! - [`DatagramTransport`]  : connected UDP; one send = one datagram, no
//!                            prefix.
//! - [`MulticastTransport`] : joined IPv4 group, receive-only.
//!
//! Common contract:
//! - `recv(deadline)` returns `Ok(Some(payload))` on arrival, `Ok(None)`
//!   on deadline, `Err` on transport death.
//! - `close()` is idempotent; `connected()` is never true after close.

use std::net::Ipv4Addr;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

use crate::error::TransportError;

/// Stream payload bounds: length-prefix values outside this range kill
/// the connection.
pub const MAX_FRAME_LEN: usize = 65535;

/// Datagram receive buffer ceiling.
pub const MAX_DATAGRAM_LEN: usize = 65536;

/// A byte-payload transport to the engine.
pub enum Transport {
    Stream(StreamTransport),
    Datagram(DatagramTransport),
    Multicast(MulticastTransport),
}

impl Transport {
    /// Send one payload to the peer.
    pub async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        match self {
            Transport::Stream(t) => t.send(payload).await,
            Transport::Datagram(t) => t.send(payload).await,
            Transport::Multicast(t) => t.send(payload).await,
        }
    }

    /// Receive one payload, waiting at most `deadline`.
    pub async fn recv(&mut self, deadline: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        match self {
            Transport::Stream(t) => t.recv(deadline).await,
            Transport::Datagram(t) => t.recv(deadline).await,
            Transport::Multicast(t) => t.recv(deadline).await,
        }
    }

    /// Close the transport. Safe to call more than once.
    pub async fn close(&mut self) {
        match self {
            Transport::Stream(t) => t.close().await,
            Transport::Datagram(t) => t.close(),
            Transport::Multicast(t) => t.close(),
        }
    }

    /// Liveness of the underlying handle. Conservative: may report false
    /// under a race, but never true after `close()`.
    pub fn connected(&self) -> bool {
        match self {
            Transport::Stream(t) => t.connected(),
            Transport::Datagram(t) => t.connected(),
            Transport::Multicast(t) => t.connected(),
        }
    }
}

// ============================================================================
// Stream (TCP, length-prefixed)
// ============================================================================

/// Connection-oriented transport with 4-byte big-endian length framing.
pub struct StreamTransport {
    stream: TcpStream,
    read_buf: BytesMut,
    closed: bool,
}

impl StreamTransport {
    /// Connect to `addr`, bounded by `connect_deadline`.
    ///
    /// Orders are latency-sensitive, so `TCP_NODELAY` is always on.
    pub async fn connect(addr: &str, connect_deadline: Duration) -> Result<Self, TransportError> {
        let stream = match timeout(connect_deadline, TcpStream::connect(addr)).await {
            Err(_) => return Err(TransportError::ConnectTimeout(addr.to_string())),
            Ok(Err(source)) => {
                return Err(TransportError::ConnectRefused {
                    addr: addr.to_string(),
                    source,
                })
            }
            Ok(Ok(stream)) => stream,
        };

        stream.set_nodelay(true).map_err(TransportError::Bind)?;
        debug!(%addr, "stream transport connected");

        Ok(StreamTransport {
            stream,
            read_buf: BytesMut::with_capacity(64 * 1024),
            closed: false,
        })
    }

    /// Wrap an already-connected stream (accept side, tests).
    pub fn from_stream(stream: TcpStream) -> Self {
        StreamTransport {
            stream,
            read_buf: BytesMut::with_capacity(64 * 1024),
            closed: false,
        }
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if payload.is_empty() || payload.len() > MAX_FRAME_LEN {
            self.close().await;
            return Err(TransportError::FrameTooLarge(payload.len()));
        }

        let prefix = (payload.len() as u32).to_be_bytes();
        let write = async {
            self.stream.write_all(&prefix).await?;
            self.stream.write_all(payload).await?;
            self.stream.flush().await
        };

        if let Err(e) = write.await {
            self.closed = true;
            return Err(TransportError::Write(e));
        }
        Ok(())
    }

    pub async fn recv(&mut self, deadline: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        match timeout(deadline, self.read_frame()).await {
            // Deadline passed; any partial frame stays buffered for the
            // next call.
            Err(_) => Ok(None),
            Ok(Ok(frame)) => Ok(Some(frame)),
            Ok(Err(e)) => Err(e),
        }
    }

    pub async fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.stream.shutdown().await;
        }
    }

    pub fn connected(&self) -> bool {
        !self.closed
    }

    /// Read until a whole length-prefixed frame is buffered, then yield
    /// its payload. Cancellation-safe: buffered bytes survive a timeout.
    async fn read_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        loop {
            if let Some(frame) = self.take_buffered_frame()? {
                return Ok(frame);
            }

            let mut chunk = [0u8; 4096];
            let n = self
                .stream
                .read(&mut chunk)
                .await
                .map_err(TransportError::Read)?;
            if n == 0 {
                self.closed = true;
                return Err(TransportError::Closed);
            }
            self.read_buf.extend_from_slice(&chunk[..n]);
        }
    }

    fn take_buffered_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        if self.read_buf.len() < 4 {
            return Ok(None);
        }

        let len = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]) as usize;

        if len == 0 || len > MAX_FRAME_LEN {
            self.closed = true;
            return Err(TransportError::FrameTooLarge(len));
        }

        if self.read_buf.len() < 4 + len {
            return Ok(None);
        }

        let mut frame = self.read_buf.split_to(4 + len);
        frame.advance(4);
        Ok(Some(frame.to_vec()))
    }
}

// ============================================================================
// Datagram (connected UDP)
// ============================================================================

/// Connectionless bidirectional transport; every payload is exactly one
/// datagram. Loss is tolerated here; reconciliation is the caller's job.
pub struct DatagramTransport {
    socket: UdpSocket,
    closed: bool,
}

impl DatagramTransport {
    /// Bind an ephemeral local port and direct all traffic at `addr`.
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(TransportError::Bind)?;
        socket
            .connect(addr)
            .await
            .map_err(|source| TransportError::ConnectRefused {
                addr: addr.to_string(),
                source,
            })?;
        debug!(%addr, "datagram transport ready");

        Ok(DatagramTransport {
            socket,
            closed: false,
        })
    }

    pub async fn send(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if payload.len() > MAX_DATAGRAM_LEN {
            return Err(TransportError::FrameTooLarge(payload.len()));
        }

        self.socket
            .send(payload)
            .await
            .map_err(TransportError::Write)?;
        Ok(())
    }

    pub async fn recv(&mut self, deadline: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        match timeout(deadline, self.socket.recv(&mut buf)).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(TransportError::Read(e)),
            Ok(Ok(n)) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
        }
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn connected(&self) -> bool {
        !self.closed
    }
}

// ============================================================================
// Multicast (receive-only)
// ============================================================================

/// Joined IPv4 multicast group. Receive-only: the engine publishes, we
/// listen.
pub struct MulticastTransport {
    socket: UdpSocket,
    group: Ipv4Addr,
    interface: Ipv4Addr,
    closed: bool,
}

impl MulticastTransport {
    /// Bind the group port and join `group` on `interface`
    /// (`None` = any interface).
    pub async fn join(
        group: Ipv4Addr,
        port: u16,
        interface: Option<Ipv4Addr>,
    ) -> Result<Self, TransportError> {
        let interface = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
        let socket = UdpSocket::bind(("0.0.0.0", port))
            .await
            .map_err(TransportError::Bind)?;
        socket
            .join_multicast_v4(group, interface)
            .map_err(TransportError::Bind)?;
        debug!(%group, port, %interface, "joined multicast group");

        Ok(MulticastTransport {
            socket,
            group,
            interface,
            closed: false,
        })
    }

    pub async fn send(&mut self, _payload: &[u8]) -> Result<(), TransportError> {
        Err(TransportError::SendOnReadOnly)
    }

    pub async fn recv(&mut self, deadline: Duration) -> Result<Option<Vec<u8>>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        match timeout(deadline, self.socket.recv_from(&mut buf)).await {
            Err(_) => Ok(None),
            Ok(Err(e)) => Err(TransportError::Read(e)),
            Ok(Ok((n, _peer))) => {
                buf.truncate(n);
                Ok(Some(buf))
            }
        }
    }

    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.socket.leave_multicast_v4(self.group, self.interface);
        }
    }

    pub fn connected(&self) -> bool {
        !self.closed
    }
}
