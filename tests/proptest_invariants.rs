//! Property-based invariant checks for flit conservation and unique-id
//! uniqueness, mirroring the proptest style of
//! `strata-transport/tests/proptest_rlnc.rs`.

use proptest::prelude::*;

use noc_traffic_eval::config::Params;
use noc_traffic_eval::eval::Evaluator;

// ─── Unique-id uniqueness ──────────────────────────────────────────────────

proptest! {
    /// However many packets are injected on however many ingresses, every
    /// flit unique id handed out is distinct.
    #[test]
    fn injected_flit_ids_are_always_unique(
        num_ingresses in 1u64..=4,
        flits_per_packet in 1u64..=8,
        packets_per_ingress in 0usize..20,
    ) {
        let cfg = format!(
            "flits_per_packet {flits_per_packet}\n{}",
            (0..num_ingresses)
                .map(|i| format!("flow {i} 0 1.0\n"))
                .collect::<String>()
        );
        let params = Params::parse(&cfg).unwrap();
        let mut eval = Evaluator::new(&params);

        let mut seen = std::collections::HashSet::new();
        for ingress_id in 0..num_ingresses {
            for cycle in 0..packets_per_ingress {
                eval.inject_flits_for_packet(ingress_id, 0, true, cycle as u64);
                while let Some(f) = eval.pop_ready(ingress_id, true) {
                    prop_assert!(seen.insert(f.unique_id), "duplicate unique_id {}", f.unique_id);
                }
            }
        }
    }
}

// ─── Flit conservation ─────────────────────────────────────────────────────

proptest! {
    /// Every flit that gets ejected is exactly one that was injected: the
    /// in-flight map never goes negative, and total received never exceeds
    /// total sent.
    #[test]
    fn ejected_flits_are_a_subset_of_injected_flits(
        flits_per_packet in 1u64..=6,
        num_packets in 0usize..30,
        // Whether each packet's flits actually get ejected, in order.
        drain_mask in prop::collection::vec(any::<bool>(), 0..30),
    ) {
        let cfg = format!("flits_per_packet {flits_per_packet}\nflow 0 0 1.0\n");
        let params = Params::parse(&cfg).unwrap();
        let mut eval = Evaluator::new(&params);

        let mut queued_for_ejection = Vec::new();
        for i in 0..num_packets {
            eval.inject_flits_for_packet(0, 0, true, i as u64);
            let should_drain = drain_mask.get(i).copied().unwrap_or(true);
            if should_drain {
                while let Some(f) = eval.pop_ready(0, true) {
                    queued_for_ejection.push(f);
                }
            }
            // else: leave these flits queued, they stay in-flight.
        }

        let before = eval.num_inflight_flits();
        for f in &queued_for_ejection {
            eval.eject_flits(f.head, f.tail, f.ingress_id, f.egress_id, f.unique_id, i_cycle(f), true).unwrap();
        }
        let after = eval.num_inflight_flits();

        prop_assert_eq!(before - after, queued_for_ejection.len());
        prop_assert!(eval.total_flits_received() <= (num_packets as u64) * flits_per_packet);
    }
}

fn i_cycle(f: &noc_traffic_eval::flit::Flit) -> u64 {
    f.creation_cycle + 1
}
