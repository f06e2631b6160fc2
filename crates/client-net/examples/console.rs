//! Interactive console for the engine session.
//!
//! - Reads CSV request lines from stdin (`N,...`, `C,...`, `F`).
//! - Sends them through a [`ClientSession`] (protocol auto-detected).
//! - Drains responses after each line and prints them as CSV.
//!
//! ```bash
//! cargo run -p client-net --example console -- 127.0.0.1:9000
//! ```

use std::io::{self, BufRead, Write};
use std::time::Duration;

use client_net::{ClientSession, Incoming, StreamTransport, Transport};
use client_protocol::{format_event_csv, parse_request_line};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:9000".to_string());

    eprintln!("Connecting to {addr}");
    let transport = StreamTransport::connect(&addr, Duration::from_secs(5)).await?;
    let mut session = ClientSession::new(Transport::Stream(transport));

    let detected = session.detect().await?;
    eprintln!("Connected; peer protocol: {detected:?}");

    let stdin = io::stdin();
    let mut lines = stdin.lock();

    loop {
        eprint!(">> ");
        io::stderr().flush()?;

        let mut line = String::new();
        if lines.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let req = match parse_request_line(line) {
            Ok(req) => req,
            Err(e) => {
                eprintln!("could not parse request: {e}");
                continue;
            }
        };

        session.send_request(&req).await?;

        for incoming in session.drain(Duration::from_millis(300)).await? {
            match incoming {
                Incoming::Event(event) => match format_event_csv(&event) {
                    Ok(csv) => println!("<< {csv}"),
                    Err(_) => println!("<< {event:?}"),
                },
                Incoming::ParseError { kind, raw } => {
                    eprintln!("undecodable payload ({kind}): {} bytes", raw.len());
                }
            }
        }
    }

    session.close().await;
    Ok(())
}
