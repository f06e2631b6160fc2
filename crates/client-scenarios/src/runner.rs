//! The interleaved send/drain loop.
//!
//! The loop has to push requests fast enough to exercise a
//! high-throughput engine while keeping the peer's buffers inside their
//! tolerance, then prove completeness at the end. Back-pressure is
//! cooperative: every batch is followed by an aggressive short-poll
//! drain and a fixed sleep (see [`crate::pacing`]).

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use client_core::{Request, Side};
use client_net::{ClientSession, SessionError};

use crate::catalog::{find_scenario, listing, Scenario, Workload};
use crate::pacing::Pacing;
use crate::stats::ScenarioStats;

/// Why a run failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    MissingAcks { expected: u64, got: u64 },
    MissingTrades { expected: u64, got: u64 },
    Rejects(u64),
    SendErrors(u64),
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::MissingAcks { expected, got } => {
                write!(f, "acks short: expected >= {expected}, got {got}")
            }
            FailureReason::MissingTrades { expected, got } => {
                write!(f, "trades short: expected >= {expected}, got {got}")
            }
            FailureReason::Rejects(n) => write!(f, "{n} reject(s) received"),
            FailureReason::SendErrors(n) => write!(f, "{n} send/transport error(s)"),
        }
    }
}

/// Outcome of a run. A failed scenario is a normal return value, never
/// a panic or an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Passed {
        stats: ScenarioStats,
    },
    Failed {
        stats: ScenarioStats,
        reasons: Vec<FailureReason>,
    },
}

impl Verdict {
    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Passed { .. })
    }

    pub fn stats(&self) -> &ScenarioStats {
        match self {
            Verdict::Passed { stats } => stats,
            Verdict::Failed { stats, .. } => stats,
        }
    }
}

/// Settle time between the last send and the final drain, letting
/// in-flight writes reach the wire.
const SETTLE: Duration = Duration::from_secs(3);

/// Per-poll deadline of the aggressive between-batch drain.
const BATCH_POLL: Duration = Duration::from_millis(2);

/// Final drain runs in slices; an entirely empty slice means the
/// response stream has dried up.
const FINAL_DRAIN_SLICE: Duration = Duration::from_secs(5);

/// Symbols used by the stress workloads.
const STRESS_SYMBOL: &str = "AAPL";
const DUAL_SYMBOLS: [&str; 2] = ["AAPL", "MSFT"];

/// Reference price/qty for generated orders.
const PRICE: u32 = 10_000;
const QTY: u32 = 100;

/// Run one catalog scenario to completion and validate the tallies.
///
/// `base_user` is the buy-side user id; the sell side uses
/// `base_user + 1`. Unknown ids print the catalog listing and fail.
pub async fn run_scenario(session: &mut ClientSession, id: u32, base_user: u32) -> Verdict {
    let Some(scenario) = find_scenario(id) else {
        println!("[error] unknown scenario id {id}");
        print!("{}", listing());
        return Verdict::Failed {
            stats: ScenarioStats::default(),
            reasons: Vec::new(),
        };
    };

    println!("[info] running scenario {} ({})", scenario.id, scenario.name);

    if let Err(e) = reset_engine_state(session).await {
        println!("[error] engine state reset failed: {e}");
        session.close().await;
        return Verdict::Failed {
            stats: ScenarioStats::default(),
            reasons: vec![FailureReason::SendErrors(1)],
        };
    }

    let run = drive(session, scenario, base_user).await;
    report(scenario, &run);
    validate(scenario, run)
}

/// Send `Flush`, give the engine a moment, swallow leftovers, and reset
/// the order-id sequence.
async fn reset_engine_state(session: &mut ClientSession) -> Result<(), SessionError> {
    session.send_request(&Request::Flush).await?;
    sleep(Duration::from_millis(200)).await;
    session.drain(Duration::from_millis(500)).await?;
    session.reset_order_ids();
    Ok(())
}

/// Everything observed during one run.
struct RunOutcome {
    stats: ScenarioStats,
    send_errors: u64,
    iterations_done: u64,
    elapsed: Duration,
}

async fn drive(session: &mut ClientSession, scenario: &Scenario, base_user: u32) -> RunOutcome {
    let workload = scenario.workload;
    let n = workload.iterations();
    let pacing = Pacing::for_target(n);
    let progress_every = Pacing::progress_interval(n);

    let mut stats = ScenarioStats::default();
    let mut send_errors = 0u64;
    let mut transport_dead = false;
    let started = Instant::now();
    let mut iterations_done = 0u64;

    for i in 0..n {
        for req in iteration_requests(workload, i, base_user, session) {
            match session.send_request(&req).await {
                Ok(()) => {}
                Err(SessionError::Encode(e)) => {
                    warn!(%e, "request failed to encode");
                    send_errors += 1;
                }
                Err(SessionError::Transport(e)) => {
                    println!("[error] transport died while sending: {e}");
                    send_errors += 1;
                    transport_dead = true;
                    break;
                }
            }
        }
        if transport_dead {
            break;
        }
        iterations_done = i + 1;

        // Batch boundary: consume a bounded burst of responses, then
        // give the engine room to breathe.
        if i > 0 && i % pacing.pairs_per_batch == 0 {
            if let Err(errs) = batch_drain(session, &pacing, &mut stats).await {
                send_errors += errs;
                transport_dead = true;
                break;
            }
            sleep(pacing.inter_batch_sleep).await;
        }

        if i > 0 && i % progress_every == 0 {
            let elapsed = started.elapsed().as_secs_f64();
            let rate = i as f64 / elapsed.max(f64::EPSILON);
            println!(
                "[info] {:>3}% | {}/{} sent | {:.1}s | {:.0}/s | {} events so far",
                i * 100 / n,
                i,
                n,
                elapsed,
                rate,
                stats.total()
            );
        }
    }

    if !transport_dead {
        // Let in-flight writes reach the wire, then drain to the bound.
        sleep(SETTLE).await;
        if !final_drain(session, scenario, &pacing, &mut stats).await {
            send_errors += 1;
            transport_dead = true;
        }
    }

    if transport_dead {
        session.close().await;
    }

    RunOutcome {
        stats,
        send_errors,
        iterations_done,
        elapsed: started.elapsed(),
    }
}

/// Requests for iteration `i` of a workload.
fn iteration_requests(
    workload: Workload,
    i: u64,
    base_user: u32,
    session: &mut ClientSession,
) -> Vec<Request> {
    match workload {
        Workload::SimpleOrders => {
            // Two resting levels per side, nothing crosses.
            vec![
                Request::new_order(base_user, "IBM", PRICE - 10, QTY, Side::Buy, session.next_order_id()),
                Request::new_order(base_user, "IBM", PRICE - 20, QTY, Side::Buy, session.next_order_id()),
                Request::new_order(base_user + 1, "IBM", PRICE + 10, QTY, Side::Sell, session.next_order_id()),
                Request::new_order(base_user + 1, "IBM", PRICE + 20, QTY, Side::Sell, session.next_order_id()),
            ]
        }
        Workload::MatchingTrade => matching_pair(base_user, "IBM", session),
        Workload::CancelRoundTrip => {
            let order_id = session.next_order_id();
            vec![
                Request::new_order(base_user, "IBM", PRICE - 10, QTY, Side::Buy, order_id),
                Request::cancel(base_user, "IBM", order_id),
            ]
        }
        Workload::UnmatchedStress { .. } => {
            // Single side: nothing ever crosses.
            vec![Request::new_order(
                base_user,
                STRESS_SYMBOL,
                PRICE,
                QTY,
                Side::Buy,
                session.next_order_id(),
            )]
        }
        Workload::MatchingStress { .. } => matching_pair(base_user, STRESS_SYMBOL, session),
        Workload::DualStress { .. } => {
            let symbol = DUAL_SYMBOLS[(i % 2) as usize];
            matching_pair(base_user, symbol, session)
        }
    }
}

fn matching_pair(base_user: u32, symbol: &str, session: &mut ClientSession) -> Vec<Request> {
    vec![
        Request::new_order(base_user, symbol, PRICE, QTY, Side::Buy, session.next_order_id()),
        Request::new_order(base_user + 1, symbol, PRICE, QTY, Side::Sell, session.next_order_id()),
    ]
}

/// Aggressively consume up to `drain_target` queued responses with
/// short polls. Returns `Err(1)` on transport death.
async fn batch_drain(
    session: &mut ClientSession,
    pacing: &Pacing,
    stats: &mut ScenarioStats,
) -> Result<(), u64> {
    let target = pacing.drain_target();
    let mut consumed = 0u64;

    while consumed < target {
        match session.recv(BATCH_POLL).await {
            Ok(Some(incoming)) => {
                stats.record(&incoming);
                consumed += 1;
            }
            Ok(None) => break,
            Err(e) => {
                println!("[error] transport died while draining: {e}");
                return Err(1);
            }
        }
    }
    Ok(())
}

/// Drain until the tallies are complete, the stream dries up, or the
/// pacing bound expires. Returns false on transport death.
async fn final_drain(
    session: &mut ClientSession,
    scenario: &Scenario,
    pacing: &Pacing,
    stats: &mut ScenarioStats,
) -> bool {
    let deadline = Instant::now() + pacing.final_drain;

    loop {
        if tallies_complete(scenario.workload, stats) {
            debug!("final drain complete: expectations met");
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            warn!("final drain bound expired");
            return true;
        }

        let slice = FINAL_DRAIN_SLICE.min(deadline - now);
        match session.drain(slice).await {
            Ok(received) if received.is_empty() => {
                debug!("final drain: response stream dry");
                return true;
            }
            Ok(received) => {
                for incoming in &received {
                    stats.record(incoming);
                }
            }
            Err(e) => {
                println!("[error] transport died during final drain: {e}");
                return false;
            }
        }
    }
}

fn tallies_complete(workload: Workload, stats: &ScenarioStats) -> bool {
    stats.acks >= workload.expected_acks() && stats.trades >= workload.target_trades()
}

fn report(scenario: &Scenario, run: &RunOutcome) {
    let secs = run.elapsed.as_secs_f64().max(f64::EPSILON);
    println!(
        "[info] scenario {} ({}) finished: {}/{} iterations in {:.1}s ({:.0}/s)",
        scenario.id,
        scenario.name,
        run.iterations_done,
        scenario.workload.iterations(),
        secs,
        run.iterations_done as f64 / secs,
    );
    let s = &run.stats;
    println!(
        "[info] acks={} cancel_acks={} trades={} tob={} rejects={} parse_errors={} ({:.0} events/s)",
        s.acks,
        s.cancel_acks,
        s.trades,
        s.tob,
        s.rejects,
        s.parse_errors,
        s.total() as f64 / secs,
    );
}

fn validate(scenario: &Scenario, run: RunOutcome) -> Verdict {
    let workload = scenario.workload;
    let expected_acks = workload.expected_acks();
    let expected_trades = workload.target_trades();

    let mut reasons = Vec::new();
    if run.stats.acks < expected_acks {
        reasons.push(FailureReason::MissingAcks {
            expected: expected_acks,
            got: run.stats.acks,
        });
    }
    if expected_trades > 0 && run.stats.trades < expected_trades {
        reasons.push(FailureReason::MissingTrades {
            expected: expected_trades,
            got: run.stats.trades,
        });
    }
    if run.stats.rejects > 0 {
        reasons.push(FailureReason::Rejects(run.stats.rejects));
    }
    if run.send_errors > 0 {
        reasons.push(FailureReason::SendErrors(run.send_errors));
    }

    if reasons.is_empty() {
        Verdict::Passed { stats: run.stats }
    } else {
        for reason in &reasons {
            println!("[warn] validation: {reason}");
        }
        Verdict::Failed {
            stats: run.stats,
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::find_scenario;

    fn outcome(stats: ScenarioStats, send_errors: u64) -> RunOutcome {
        RunOutcome {
            stats,
            send_errors,
            iterations_done: 0,
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn complete_matching_run_passes() {
        let scenario = find_scenario(20).unwrap();
        let stats = ScenarioStats {
            acks: 2_000,
            trades: 1_000,
            tob: 1_234,
            ..Default::default()
        };
        assert!(validate(scenario, outcome(stats, 0)).passed());
    }

    #[test]
    fn short_acks_fail_with_the_gap() {
        let scenario = find_scenario(20).unwrap();
        let stats = ScenarioStats {
            acks: 1_999,
            trades: 1_000,
            ..Default::default()
        };
        let Verdict::Failed { reasons, .. } = validate(scenario, outcome(stats, 0)) else {
            panic!("expected failure");
        };
        assert_eq!(
            reasons,
            vec![FailureReason::MissingAcks {
                expected: 2_000,
                got: 1_999
            }]
        );
    }

    #[test]
    fn rejects_fail_even_when_counts_are_complete() {
        let scenario = find_scenario(20).unwrap();
        let stats = ScenarioStats {
            acks: 2_000,
            trades: 1_000,
            rejects: 3,
            ..Default::default()
        };
        let verdict = validate(scenario, outcome(stats, 0));
        assert!(!verdict.passed());
    }

    #[test]
    fn unmatched_runs_do_not_require_trades() {
        let scenario = find_scenario(10).unwrap();
        let stats = ScenarioStats {
            acks: 1_000,
            ..Default::default()
        };
        assert!(validate(scenario, outcome(stats, 0)).passed());
    }

    #[test]
    fn send_errors_fail_the_run() {
        let scenario = find_scenario(10).unwrap();
        let stats = ScenarioStats {
            acks: 1_000,
            ..Default::default()
        };
        assert!(!validate(scenario, outcome(stats, 2)).passed());
    }
}
