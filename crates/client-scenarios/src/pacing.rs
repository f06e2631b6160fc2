//! Back-pressure pacing policy.
//!
//! The driver sends in batches and drains between them. Sizing is a
//! piecewise function of the expected trade count:
//!
//! | target            | pairs/batch | sleep  | final drain |
//! |-------------------|-------------|--------|-------------|
//! | < 10K             | 50          | 10 ms  | 60 s        |
//! | 10K .. 100K       | 100         | 25 ms  | 120 s       |
//! | 100K .. 1M        | 100         | 40 ms  | 10 min      |
//! | >= 1M             | 100         | 50 ms  | 30 min      |

use std::time::Duration;

/// Pacing parameters for one scenario run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// Iterations per batch before the driver stops to drain.
    pub pairs_per_batch: u64,

    /// Sleep after each batch drain.
    pub inter_batch_sleep: Duration,

    /// Upper bound for the post-run drain.
    pub final_drain: Duration,
}

impl Pacing {
    /// Pick pacing for a target iteration count.
    pub fn for_target(n: u64) -> Self {
        if n < 10_000 {
            Pacing {
                pairs_per_batch: 50,
                inter_batch_sleep: Duration::from_millis(10),
                final_drain: Duration::from_secs(60),
            }
        } else if n < 100_000 {
            Pacing {
                pairs_per_batch: 100,
                inter_batch_sleep: Duration::from_millis(25),
                final_drain: Duration::from_secs(120),
            }
        } else if n < 1_000_000 {
            Pacing {
                pairs_per_batch: 100,
                inter_batch_sleep: Duration::from_millis(40),
                final_drain: Duration::from_secs(600),
            }
        } else {
            Pacing {
                pairs_per_batch: 100,
                inter_batch_sleep: Duration::from_millis(50),
                final_drain: Duration::from_secs(1800),
            }
        }
    }

    /// How many events a between-batch drain tries to consume.
    pub fn drain_target(&self) -> u64 {
        self.pairs_per_batch * 5
    }

    /// Iterations between progress lines: 5% buckets at large scale,
    /// 10% below.
    pub fn progress_interval(n: u64) -> u64 {
        let bucket = if n >= 100_000 { n / 20 } else { n / 10 };
        bucket.max(1)
    }
}
