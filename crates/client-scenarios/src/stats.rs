//! Response tallies for one scenario run.

use client_core::Event;
use client_net::Incoming;

/// Monotone counters, reset at run start.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScenarioStats {
    pub acks: u64,
    pub cancel_acks: u64,
    pub trades: u64,
    pub tob: u64,
    pub rejects: u64,
    pub parse_errors: u64,
}

impl ScenarioStats {
    /// Tally one received payload.
    pub fn record(&mut self, incoming: &Incoming) {
        match incoming {
            Incoming::Event(Event::Ack(_)) => self.acks += 1,
            Incoming::Event(Event::CancelAck(_)) => self.cancel_acks += 1,
            Incoming::Event(Event::Trade(_)) => self.trades += 1,
            Incoming::Event(Event::TopOfBook(_)) => self.tob += 1,
            Incoming::Event(Event::Reject(_)) | Incoming::Event(Event::CancelReject(_)) => {
                self.rejects += 1
            }
            Incoming::ParseError { .. } => self.parse_errors += 1,
        }
    }

    /// All events seen, parse errors included.
    pub fn total(&self) -> u64 {
        self.acks + self.cancel_acks + self.trades + self.tob + self.rejects + self.parse_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::Side;
    use client_protocol::CodecError;

    #[test]
    fn tallies_each_kind() {
        let mut stats = ScenarioStats::default();
        stats.record(&Incoming::Event(Event::ack("IBM", 1, 1)));
        stats.record(&Incoming::Event(Event::cancel_ack("IBM", 1, 1)));
        stats.record(&Incoming::Event(Event::trade("IBM", 1, 1, 2, 2, 5, 5)));
        stats.record(&Incoming::Event(Event::top_of_book("IBM", Side::Buy, 5, 5)));
        stats.record(&Incoming::Event(Event::Reject(client_core::Reject {
            symbol: "IBM".into(),
            user: 1,
            order_id: 1,
            reason: 0,
        })));
        stats.record(&Incoming::ParseError {
            kind: CodecError::Truncated,
            raw: vec![0x4D],
        });

        assert_eq!(stats.acks, 1);
        assert_eq!(stats.cancel_acks, 1);
        assert_eq!(stats.trades, 1);
        assert_eq!(stats.tob, 1);
        assert_eq!(stats.rejects, 1);
        assert_eq!(stats.parse_errors, 1);
        assert_eq!(stats.total(), 6);
    }
}
