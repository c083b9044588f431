//! Minimal synchronous DUT stand-in: drives the evaluator through its tick
//! protocol as a trivial one-cycle-latency crossbar, so the library can be
//! smoke-tested without a real Verilator/VCS harness. Mirrors the manual
//! arg-parsing and `tracing_subscriber` setup of `strata-sim`'s `dummy_node`.

use anyhow::{bail, Result};
use noc_traffic_eval::config::DEFAULT_CONFIG;
use noc_traffic_eval::tick::{egress_tick, ingress_tick};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(true)
        .compact()
        .init();

    let mut max_cycles = 10_000u64;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--max-cycles" => {
                max_cycles = args
                    .next()
                    .expect("missing --max-cycles value")
                    .parse()
                    .expect("--max-cycles must be a number");
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    let argv: Vec<String> = std::env::args().collect();

    // A single-flit-latency crossbar: whatever left an ingress at cycle N
    // arrives at its egress at cycle N + 1.
    let mut in_flight: Option<(u64, bool, bool, u64, u64)> = None;

    for cycle in 0..max_cycles {
        let (ready, head, tail, ingress_id, unique_id) = match in_flight.take() {
            Some((ingress_id, head, tail, unique_id, _depart_cycle)) => {
                (true, head, tail, ingress_id, unique_id)
            }
            None => (false, false, false, 0, 0),
        };
        let out = egress_tick(argv.clone(), DEFAULT_CONFIG, 0, cycle, ready, head, tail, ingress_id, unique_id);
        if out.fatal {
            bail!("evaluator reported a fatal condition at cycle {cycle}");
        }
        if out.success {
            tracing::info!(cycle, "run completed successfully");
            return Ok(());
        }

        // The crossbar slot is free exactly when nothing departed this
        // cycle; only then does the ingress get to send a new flit.
        let slot_free = !ready;
        let ingress_out = ingress_tick(argv.clone(), DEFAULT_CONFIG, 0, cycle, slot_free);
        if ingress_out.valid {
            in_flight = Some((
                0,
                ingress_out.head,
                ingress_out.tail,
                ingress_out.unique_id,
                cycle + 1,
            ));
        }
    }

    bail!("run did not complete within {max_cycles} cycles")
}
