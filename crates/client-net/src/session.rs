//! Client session: codec + transport + protocol discovery.
//!
//! The session never spawns background tasks; callers that want a live
//! event printer (a REPL, the relay producer) run their own loop over
//! [`ClientSession::recv`] / [`ClientSession::drain`].

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use client_core::{Event, Request, Side};
use client_protocol::{
    decode_event_auto, encode_request_binary, format_request_csv, is_binary, CodecError,
};

use crate::error::{SessionError, TransportError};
use crate::transport::Transport;

/// Which wire form the peer speaks.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Protocol {
    Unknown,
    Binary,
    Csv,
}

/// One received payload, decoded.
///
/// Decode failures are values, not errors: the session stays open and
/// the caller decides what to do with the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    Event(Event),
    ParseError { kind: CodecError, raw: Vec<u8> },
}

// Probe identity used by discovery. High ids keep the probe clear of
// real scenario traffic.
const PROBE_USER: u32 = 999_999;
const PROBE_SYMBOL: &str = "PROBE";
const BINARY_PROBE_ORDER: u32 = 999_999;
const CSV_PROBE_ORDER: u32 = 1_000_000;

/// How long discovery waits for each probe's answer.
const PROBE_WAIT: Duration = Duration::from_millis(500);

/// Post-detection drain window (consume echoes of the probe).
const PROBE_DRAIN: Duration = Duration::from_millis(100);

/// Per-poll deadline inside [`ClientSession::drain`].
const DRAIN_POLL: Duration = Duration::from_millis(100);

/// Consecutive empty polls after which a drain gives up early.
const MAX_EMPTY_POLLS: u32 = 100;

/// A bidirectional engine session over one transport.
pub struct ClientSession {
    transport: Transport,
    detected: Protocol,
    send_seq: u32,
}

impl ClientSession {
    pub fn new(transport: Transport) -> Self {
        ClientSession {
            transport,
            detected: Protocol::Unknown,
            send_seq: 0,
        }
    }

    /// The protocol this session currently believes the peer speaks.
    pub fn protocol(&self) -> Protocol {
        self.detected
    }

    /// Manual override. The only transition besides [`detect`] itself;
    /// it may also overwrite a detected value.
    ///
    /// [`detect`]: ClientSession::detect
    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.detected = protocol;
    }

    /// Hand out the next strictly-increasing order id.
    pub fn next_order_id(&mut self) -> u32 {
        self.send_seq += 1;
        self.send_seq
    }

    /// Reset the order-id sequence (scenario start).
    pub fn reset_order_ids(&mut self) {
        self.send_seq = 0;
    }

    pub fn connected(&self) -> bool {
        self.transport.connected()
    }

    pub async fn close(&mut self) {
        self.transport.close().await;
    }

    /// Probe-based protocol discovery.
    ///
    /// 1. Send a binary `NewOrder` probe and wait up to 500 ms.
    /// 2. A magic-prefixed answer means Binary: withdraw the probe with a
    ///    matching cancel and drain the echoes.
    /// 3. Any other answer means Csv.
    /// 4. Silence: retry with a CSV probe, classify the same way, and
    ///    default to Binary if the peer stays quiet.
    pub async fn detect(&mut self) -> Result<Protocol, SessionError> {
        let binary_probe = Request::new_order(
            PROBE_USER,
            PROBE_SYMBOL,
            1,
            1,
            Side::Buy,
            BINARY_PROBE_ORDER,
        );
        let mut wire = Vec::with_capacity(32);
        encode_request_binary(&binary_probe, &mut wire)?;
        self.transport.send(&wire).await?;

        match self.transport.recv(PROBE_WAIT).await? {
            Some(payload) if is_binary(&payload) => {
                self.detected = Protocol::Binary;
                debug!("protocol detected: binary");

                // Withdraw the probe order so it never trades.
                let cancel = Request::cancel(PROBE_USER, PROBE_SYMBOL, BINARY_PROBE_ORDER);
                let mut wire = Vec::with_capacity(32);
                encode_request_binary(&cancel, &mut wire)?;
                self.transport.send(&wire).await?;

                self.swallow(PROBE_DRAIN).await?;
                return Ok(self.detected);
            }
            Some(_) => {
                self.detected = Protocol::Csv;
                debug!("protocol detected: csv (text answer to binary probe)");
                self.swallow(PROBE_DRAIN).await?;
                return Ok(self.detected);
            }
            None => {}
        }

        // No answer to the binary probe; try once more in text form.
        let csv_probe =
            Request::new_order(PROBE_USER, PROBE_SYMBOL, 1, 1, Side::Buy, CSV_PROBE_ORDER);
        let line = format!("{}\n", format_request_csv(&csv_probe));
        self.transport.send(line.as_bytes()).await?;

        match self.transport.recv(PROBE_WAIT).await? {
            Some(payload) if is_binary(&payload) => {
                self.detected = Protocol::Binary;
                debug!("protocol detected: binary (answer to csv probe)");
                self.swallow(PROBE_DRAIN).await?;
            }
            Some(_) => {
                self.detected = Protocol::Csv;
                debug!("protocol detected: csv");
                self.swallow(PROBE_DRAIN).await?;
            }
            None => {
                // A mute peer is most likely a binary engine under load.
                self.detected = Protocol::Binary;
                debug!("no probe answer; defaulting to binary");
            }
        }
        Ok(self.detected)
    }

    /// Encode `req` in the detected form (Binary while still Unknown)
    /// and hand it to the transport.
    pub async fn send_request(&mut self, req: &Request) -> Result<(), SessionError> {
        match self.detected {
            Protocol::Csv => {
                let line = format!("{}\n", format_request_csv(req));
                self.transport.send(line.as_bytes()).await?;
            }
            Protocol::Binary | Protocol::Unknown => {
                let mut wire = Vec::with_capacity(32);
                encode_request_binary(req, &mut wire)?;
                self.transport.send(&wire).await?;
            }
        }
        Ok(())
    }

    /// Receive one payload and decode it.
    ///
    /// `Ok(None)` on deadline; decode failures come back as
    /// [`Incoming::ParseError`] and do **not** close the session.
    pub async fn recv(&mut self, deadline: Duration) -> Result<Option<Incoming>, TransportError> {
        let Some(payload) = self.transport.recv(deadline).await? else {
            return Ok(None);
        };

        Ok(Some(match decode_event_auto(&payload) {
            Ok(event) => Incoming::Event(event),
            Err(kind) => {
                trace!(?kind, len = payload.len(), "payload failed to decode");
                Incoming::ParseError { kind, raw: payload }
            }
        }))
    }

    /// Bounded receive loop: short polls until the budget elapses or
    /// [`MAX_EMPTY_POLLS`] consecutive polls come back empty.
    pub async fn drain(&mut self, budget: Duration) -> Result<Vec<Incoming>, TransportError> {
        let deadline = Instant::now() + budget;
        let mut received = Vec::new();
        let mut empty_polls = 0u32;

        while empty_polls < MAX_EMPTY_POLLS {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let poll = DRAIN_POLL.min(deadline - now);

            match self.recv(poll).await? {
                Some(incoming) => {
                    received.push(incoming);
                    empty_polls = 0;
                }
                None => empty_polls += 1,
            }
        }

        Ok(received)
    }

    /// Drain and discard (probe echoes, pre-scenario leftovers).
    async fn swallow(&mut self, budget: Duration) -> Result<(), TransportError> {
        let deadline = Instant::now() + budget;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            if self.recv(deadline - now).await?.is_none() {
                return Ok(());
            }
        }
    }
}
