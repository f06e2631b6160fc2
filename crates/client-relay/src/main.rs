//! Relay binary: engine session in, WebSocket fan-out.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use client_net::{
    ClientSession, DatagramTransport, MulticastTransport, StreamTransport, Transport,
};
use client_relay::config::{Cli, RelayConfig, TransportKind};
use client_relay::producer::run_producer;
use client_relay::registry::Registry;
use client_relay::server::{self, AppState};

const CONNECT_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("[error] {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = RelayConfig::load(&cli)?;

    let default_filter = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    print_banner(&config);

    let transport = connect_engine(&config).await?;
    let session = ClientSession::new(transport);

    let registry = Arc::new(Registry::new());
    let stop = Arc::new(AtomicBool::new(false));
    let (producer_done_tx, producer_done_rx) = watch::channel(false);
    let forwarded = Arc::new(AtomicU64::new(0));

    let producer = {
        let registry = registry.clone();
        let filter = config.filter.clone();
        let stop = stop.clone();
        let forwarded = forwarded.clone();
        tokio::spawn(async move {
            run_producer(session, registry, filter, stop, forwarded).await;
            let _ = producer_done_tx.send(true);
        })
    };

    // Periodic status line.
    {
        let registry = registry.clone();
        let forwarded = forwarded.clone();
        let stop = stop.clone();
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(30));
            tick.tick().await;
            loop {
                tick.tick().await;
                if stop.load(Ordering::Relaxed) {
                    break;
                }
                info!(
                    subscribers = registry.len(),
                    forwarded = forwarded.load(Ordering::Relaxed),
                    "relay status"
                );
            }
        });
    }

    let listener = TcpListener::bind(&config.ws_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.ws_addr()))?;
    info!("websocket listener ready on ws://{}/ws", config.ws_addr());

    let state = AppState::new(registry.clone());

    // Shutdown: a signal, or the producer dying with the engine.
    let shutdown = {
        let stop = stop.clone();
        let mut producer_done = producer_done_rx;
        async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("shutdown signal received"),
                _ = producer_done.wait_for(|done| *done) => {
                    info!("engine producer ended, shutting down")
                }
            }
            stop.store(true, Ordering::Relaxed);
        }
    };

    server::serve(listener, state, shutdown)
        .await
        .context("websocket listener failed")?;

    // Listener is closed; stop the producer and say goodbye to
    // subscribers.
    stop.store(true, Ordering::Relaxed);
    let _ = producer.await;
    registry.close_all();
    info!("relay stopped");
    Ok(())
}

async fn connect_engine(config: &RelayConfig) -> Result<Transport> {
    let transport = match config.transport {
        TransportKind::Tcp => Transport::Stream(
            StreamTransport::connect(&config.engine_addr(), CONNECT_DEADLINE)
                .await
                .with_context(|| format!("engine at {}", config.engine_addr()))?,
        ),
        TransportKind::Udp => Transport::Datagram(
            DatagramTransport::connect(&config.engine_addr())
                .await
                .with_context(|| format!("engine at {}", config.engine_addr()))?,
        ),
        TransportKind::Multicast => {
            let (group, port) = config.multicast_target()?;
            Transport::Multicast(
                MulticastTransport::join(group, port, config.multicast_iface)
                    .await
                    .with_context(|| format!("multicast group {group}:{port}"))?,
            )
        }
    };
    Ok(transport)
}

fn print_banner(config: &RelayConfig) {
    eprintln!("==============================================================");
    eprintln!("Engine Event Relay - WebSocket fan-out");
    eprintln!("==============================================================");
    eprintln!("Engine:     {} ({:?})", config.engine_addr(), config.transport);
    if let Some(group) = &config.multicast_group {
        eprintln!("Multicast:  {group}");
    }
    eprintln!("WebSocket:  ws://{}/ws", config.ws_addr());
    eprintln!("Filter:     {}", config.filter);
    eprintln!("==============================================================");
}
