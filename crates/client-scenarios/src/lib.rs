//! client-scenarios
//!
//! Pre-registered load programs that drive an engine session with a known
//! order shape and validate the response stream:
//!
//! - [`pacing`]  : batch size / sleep / drain bounds per target scale
//! - [`stats`]   : response tallies
//! - [`catalog`] : scenario ids and workloads
//! - [`runner`]  : the interleaved send/drain loop and the verdict

pub mod catalog;
pub mod pacing;
pub mod runner;
pub mod stats;

pub use catalog::{find_scenario, listing, Scenario, Workload, CATALOG};
pub use pacing::Pacing;
pub use runner::{run_scenario, FailureReason, Verdict};
pub use stats::ScenarioStats;
