//! Subscriber registry and the broadcast step.
//!
//! The registry is the relay's one shared mutable structure. Broadcast
//! iterates a snapshot, so removal of a failed subscriber never
//! invalidates delivery to the others. Each subscriber's entry is
//! removed exactly once: on close/EOF, on write failure, or when its
//! mailbox fills up (slow-consumer policy).

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Bounded per-subscriber mailbox. A broadcast that finds it full drops
/// the subscriber: a consumer that far behind would otherwise block the
/// fan-out on its socket.
pub const MAILBOX_CAPACITY: usize = 256;

/// Opaque subscriber handle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// What a subscriber's writer task can be told to do.
#[derive(Debug, Clone)]
pub enum SubscriberMessage {
    /// Forward one serialized event as a text frame.
    Event(Arc<str>),
    /// Answer a client ping.
    Pong(Vec<u8>),
    /// Send a close frame and stop.
    Close,
}

struct SubscriberHandle {
    tx: mpsc::Sender<SubscriberMessage>,
    peer: String,
    connected_at: DateTime<Utc>,
}

/// `/clients` summary row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubscriberSummary {
    pub id: String,
    pub peer: String,
    pub connected_at: String,
}

/// All live subscribers.
#[derive(Default)]
pub struct Registry {
    subscribers: DashMap<u64, SubscriberHandle>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    /// Register a subscriber's mailbox; called once per completed
    /// WebSocket upgrade.
    pub fn insert(&self, tx: mpsc::Sender<SubscriberMessage>, peer: String) -> SubscriberId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.subscribers.insert(
            id,
            SubscriberHandle {
                tx,
                peer,
                connected_at: Utc::now(),
            },
        );
        SubscriberId(id)
    }

    /// Remove a subscriber. Returns true only for the call that actually
    /// removed it, so disconnect handling stays exactly-once.
    pub fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn summaries(&self) -> Vec<SubscriberSummary> {
        self.subscribers
            .iter()
            .map(|entry| SubscriberSummary {
                id: SubscriberId(*entry.key()).to_string(),
                peer: entry.value().peer.clone(),
                connected_at: entry.value().connected_at.to_rfc3339(),
            })
            .collect()
    }

    /// Offer one serialized event to every subscriber.
    ///
    /// Delivery is independent per subscriber: a full mailbox or a gone
    /// receiver removes that subscriber and nobody else.
    pub fn broadcast(&self, text: Arc<str>) {
        // Snapshot the senders first; removals below must not race the
        // iteration.
        let targets: Vec<(u64, mpsc::Sender<SubscriberMessage>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().tx.clone()))
            .collect();

        for (id, tx) in targets {
            match tx.try_send(SubscriberMessage::Event(text.clone())) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = %SubscriberId(id), "mailbox full, dropping slow subscriber");
                    self.remove(SubscriberId(id));
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscriber = %SubscriberId(id), "mailbox gone, dropping subscriber");
                    self.remove(SubscriberId(id));
                }
            }
        }
    }

    /// Ask a single subscriber's writer to answer a ping.
    pub fn pong(&self, id: SubscriberId, payload: Vec<u8>) {
        if let Some(entry) = self.subscribers.get(&id.0) {
            let _ = entry.value().tx.try_send(SubscriberMessage::Pong(payload));
        }
    }

    /// Shutdown: tell every writer to send a close frame, then forget
    /// them all.
    pub fn close_all(&self) {
        let targets: Vec<(u64, mpsc::Sender<SubscriberMessage>)> = self
            .subscribers
            .iter()
            .map(|entry| (*entry.key(), entry.value().tx.clone()))
            .collect();

        for (id, tx) in targets {
            let _ = tx.try_send(SubscriberMessage::Close);
            self.subscribers.remove(&id);
        }
        info!("all subscribers closed");
    }
}
