//! Scenario catalog.
//!
//! Every scenario is a pre-registered program identified by a small
//! integer. The ids are part of the toolkit's public surface; scripts
//! and docs refer to them.

/// What a scenario sends per iteration.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Workload {
    /// A handful of resting orders across a few price levels.
    SimpleOrders,

    /// One crossing buy/sell pair.
    MatchingTrade,

    /// One resting order, then its cancel.
    CancelRoundTrip,

    /// One non-crossing order per iteration (single side, never trades).
    UnmatchedStress { orders: u64 },

    /// One crossing pair per iteration.
    MatchingStress { pairs: u64 },

    /// One crossing pair per iteration, symbols alternating round-robin.
    DualStress { pairs: u64 },
}

impl Workload {
    /// Iterations of the main send loop.
    pub fn iterations(&self) -> u64 {
        match self {
            Workload::SimpleOrders | Workload::MatchingTrade | Workload::CancelRoundTrip => 1,
            Workload::UnmatchedStress { orders } => *orders,
            Workload::MatchingStress { pairs } | Workload::DualStress { pairs } => *pairs,
        }
    }

    /// Expected trade count, used to pick pacing.
    pub fn target_trades(&self) -> u64 {
        match self {
            Workload::MatchingTrade => 1,
            Workload::MatchingStress { pairs } | Workload::DualStress { pairs } => *pairs,
            _ => 0,
        }
    }

    /// Minimum acks a complete run must see.
    pub fn expected_acks(&self) -> u64 {
        match self {
            Workload::SimpleOrders => 4,
            Workload::MatchingTrade => 2,
            Workload::CancelRoundTrip => 1,
            Workload::UnmatchedStress { orders } => *orders,
            Workload::MatchingStress { pairs } | Workload::DualStress { pairs } => 2 * pairs,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scenario {
    pub id: u32,
    pub name: &'static str,
    pub workload: Workload,
}

/// All registered scenarios, in id order.
pub const CATALOG: &[Scenario] = &[
    Scenario {
        id: 1,
        name: "simple-orders",
        workload: Workload::SimpleOrders,
    },
    Scenario {
        id: 2,
        name: "matching-trade",
        workload: Workload::MatchingTrade,
    },
    Scenario {
        id: 3,
        name: "cancel",
        workload: Workload::CancelRoundTrip,
    },
    Scenario {
        id: 10,
        name: "unmatched-stress-1k",
        workload: Workload::UnmatchedStress { orders: 1_000 },
    },
    Scenario {
        id: 11,
        name: "unmatched-stress-10k",
        workload: Workload::UnmatchedStress { orders: 10_000 },
    },
    Scenario {
        id: 12,
        name: "unmatched-stress-100k",
        workload: Workload::UnmatchedStress { orders: 100_000 },
    },
    Scenario {
        id: 20,
        name: "matching-stress-1k",
        workload: Workload::MatchingStress { pairs: 1_000 },
    },
    Scenario {
        id: 21,
        name: "matching-stress-10k",
        workload: Workload::MatchingStress { pairs: 10_000 },
    },
    Scenario {
        id: 22,
        name: "matching-stress-100k",
        workload: Workload::MatchingStress { pairs: 100_000 },
    },
    Scenario {
        id: 23,
        name: "matching-stress-250k",
        workload: Workload::MatchingStress { pairs: 250_000 },
    },
    Scenario {
        id: 24,
        name: "matching-stress-500k",
        workload: Workload::MatchingStress { pairs: 500_000 },
    },
    Scenario {
        id: 25,
        name: "matching-stress-250m",
        workload: Workload::MatchingStress {
            pairs: 250_000_000,
        },
    },
    Scenario {
        id: 30,
        name: "dual-stress-500k",
        workload: Workload::DualStress { pairs: 500_000 },
    },
    Scenario {
        id: 31,
        name: "dual-stress-1m",
        workload: Workload::DualStress { pairs: 1_000_000 },
    },
    Scenario {
        id: 32,
        name: "dual-stress-100m",
        workload: Workload::DualStress {
            pairs: 100_000_000,
        },
    },
];

/// Look up a scenario by id.
pub fn find_scenario(id: u32) -> Option<&'static Scenario> {
    CATALOG.iter().find(|s| s.id == id)
}

/// Human-readable catalog listing, printed for unknown ids.
pub fn listing() -> String {
    let mut out = String::from("available scenarios:\n");
    for s in CATALOG {
        out.push_str(&format!("  {:>3}  {}\n", s.id, s.name));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_stable() {
        let ids: Vec<u32> = CATALOG.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 10, 11, 12, 20, 21, 22, 23, 24, 25, 30, 31, 32]);
    }

    #[test]
    fn lookup_hits_and_misses() {
        assert_eq!(find_scenario(20).unwrap().name, "matching-stress-1k");
        assert!(find_scenario(99).is_none());
    }

    #[test]
    fn matching_expectations() {
        let s = find_scenario(21).unwrap();
        assert_eq!(s.workload.iterations(), 10_000);
        assert_eq!(s.workload.target_trades(), 10_000);
        assert_eq!(s.workload.expected_acks(), 20_000);
    }

    #[test]
    fn unmatched_never_expects_trades() {
        let s = find_scenario(12).unwrap();
        assert_eq!(s.workload.target_trades(), 0);
        assert_eq!(s.workload.expected_acks(), 100_000);
    }
}
