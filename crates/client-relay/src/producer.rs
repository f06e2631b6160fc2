//! Engine producer: the one task that owns the engine transport for
//! reads.
//!
//! Transient read errors are retried after a short pause; a terminal
//! close of the transport ends the task (and with it, the service).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use client_net::{ClientSession, Incoming, TransportError};

use crate::filter::FilterSet;
use crate::registry::Registry;
use crate::wire_json;

/// Short poll so the stop flag is observed promptly.
const POLL: Duration = Duration::from_millis(250);

/// Pause after a transient read error.
const RETRY: Duration = Duration::from_millis(100);

/// Read engine events until the transport dies or `stop` is raised,
/// broadcasting every filtered event to the registry. `forwarded`
/// counts delivered broadcasts for the periodic status line.
pub async fn run_producer(
    mut session: ClientSession,
    registry: Arc<Registry>,
    filter: FilterSet,
    stop: Arc<AtomicBool>,
    forwarded: Arc<AtomicU64>,
) {
    info!("engine producer started");

    loop {
        if stop.load(Ordering::Relaxed) {
            break;
        }

        match session.recv(POLL).await {
            Ok(None) => continue,
            Ok(Some(Incoming::Event(event))) => {
                if !filter.allows(&event) {
                    continue;
                }
                // Serialize once; every subscriber gets the same buffer.
                match wire_json::to_text(&event) {
                    Ok(text) => {
                        registry.broadcast(Arc::from(text));
                        forwarded.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => warn!(%e, "event failed to serialize"),
                }
            }
            Ok(Some(Incoming::ParseError { kind, raw })) => {
                debug!(?kind, len = raw.len(), "undecodable payload from engine");
            }
            Err(TransportError::Closed) => {
                info!("engine transport closed");
                break;
            }
            Err(e) => {
                warn!(%e, "engine read error, retrying");
                sleep(RETRY).await;
                if !session.connected() {
                    break;
                }
            }
        }
    }

    session.close().await;
    info!("engine producer stopped");
}
