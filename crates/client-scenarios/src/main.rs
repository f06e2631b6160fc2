//! Scenario driver CLI.
//!
//! Connects to the engine, discovers (or is told) the wire protocol,
//! runs one catalog scenario, and exits 0/1 on the validation verdict.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use client_net::{
    ClientSession, DatagramTransport, Protocol, StreamTransport, Transport,
};
use client_scenarios::{listing, run_scenario};

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    Tcp,
    Udp,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ProtocolArg {
    /// Probe the peer (default).
    Auto,
    Binary,
    Csv,
}

#[derive(Debug, Parser)]
#[command(
    name = "client-scenarios",
    about = "Scripted load scenarios for the matching engine",
    after_help = listing(),
)]
struct Args {
    /// Scenario id (see listing below).
    scenario: u32,

    /// Engine address, host:port.
    #[arg(long, default_value = "127.0.0.1:9000")]
    addr: String,

    /// Transport to the engine.
    #[arg(long, value_enum, default_value_t = TransportArg::Tcp)]
    transport: TransportArg,

    /// Wire protocol; `auto` probes the peer.
    #[arg(long, value_enum, default_value_t = ProtocolArg::Auto)]
    protocol: ProtocolArg,

    /// Buy-side user id (the sell side uses user + 1).
    #[arg(long, default_value_t = 1)]
    user: u32,

    /// Verbose diagnostics.
    #[arg(short, long)]
    verbose: bool,
}

const CONNECT_DEADLINE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let transport = match args.transport {
        TransportArg::Tcp => {
            Transport::Stream(StreamTransport::connect(&args.addr, CONNECT_DEADLINE).await?)
        }
        TransportArg::Udp => Transport::Datagram(DatagramTransport::connect(&args.addr).await?),
    };

    let mut session = ClientSession::new(transport);

    match args.protocol {
        ProtocolArg::Auto => {
            let detected = session.detect().await?;
            println!("[info] peer protocol: {detected:?}");
        }
        ProtocolArg::Binary => session.set_protocol(Protocol::Binary),
        ProtocolArg::Csv => session.set_protocol(Protocol::Csv),
    }

    let verdict = run_scenario(&mut session, args.scenario, args.user).await;
    session.close().await;

    if verdict.passed() {
        println!("*** TEST PASSED ***");
        Ok(())
    } else {
        println!("*** TEST FAILED ***");
        std::process::exit(1);
    }
}
