//! End-of-run results report: the CSV text defined in spec.md §6, plus the
//! threshold comparison that decides `success`/`fatal`. Rendering follows
//! the `write!`-into-`String` style of `strata-bonding::metrics::render_prometheus`.

use std::fmt::Write as _;

use crate::config::Params;
use crate::eval::Evaluator;

const LATENCY_BUCKET_SIZE: u64 = 10;

/// The rendered CSV text plus whether any required threshold was missed.
pub struct Report {
    pub text: String,
    pub threshold_violation: bool,
}

pub fn render(params: &Params, eval: &Evaluator) -> Report {
    let mut out = String::with_capacity(1024);

    writeln!(out, "Results CSV:").unwrap();
    writeln!(
        out,
        "ingress_id, egress_id, received, sent, throughput, median_latency, max_latency"
    )
    .unwrap();

    let mut min_throughput = f32::INFINITY;
    let mut min_flow = None;

    for flow in &params.flows {
        let received = eval.get_flits_received(flow);
        let sent = eval.get_flits_sent(flow);
        let throughput = received as f32 / sent as f32;
        if min_flow.is_none() || throughput < min_throughput {
            min_throughput = throughput;
            min_flow = Some(*flow);
        }
        let median_latency = eval.get_median_latency(flow);
        let max_latency = eval.get_max_latency(flow);
        writeln!(
            out,
            "{}, {}, {}, {}, {}, {}, {}",
            flow.ingress_id, flow.egress_id, received, sent, throughput, median_latency, max_latency
        )
        .unwrap();
    }

    let overall_max_latency = eval.get_overall_max_latency();
    let overall_median_latency = eval.get_overall_median_latency();

    writeln!(out).unwrap();
    if let Some(flow) = min_flow {
        writeln!(
            out,
            "Min throughput: {}, {}, {}",
            flow.ingress_id, flow.egress_id, min_throughput
        )
        .unwrap();
    } else {
        writeln!(out, "Min throughput: n/a (no flows configured)").unwrap();
    }
    writeln!(out, "Median latency: {overall_median_latency}").unwrap();
    writeln!(out, "Max latency: {overall_max_latency}").unwrap();

    // "Latency hist: " carries no trailing newline of its own: the first
    // bucket is appended to that same line, and every bucket (including the
    // first) ends its own line, one bucket per line.
    write!(out, "Latency hist: ").unwrap();
    let mut bucket_lo = 0u64;
    while bucket_lo < overall_max_latency {
        let bucket_hi = bucket_lo + LATENCY_BUCKET_SIZE;
        let count: u64 = (bucket_lo..bucket_hi)
            .map(|lat| eval.get_overall_latency_count(lat))
            .sum();
        writeln!(out, "  {bucket_lo}-{bucket_hi}: {count}").unwrap();
        bucket_lo += LATENCY_BUCKET_SIZE;
    }

    let mut threshold_violation = false;
    if min_throughput < params.required_throughput {
        tracing::warn!(min_throughput, required = params.required_throughput, "throughput below requirement");
        threshold_violation = true;
    }
    if overall_median_latency > params.required_median_latency {
        tracing::warn!(
            overall_median_latency,
            required = params.required_median_latency,
            "median latency above requirement"
        );
        threshold_violation = true;
    }
    if overall_max_latency > params.required_max_latency {
        tracing::warn!(
            overall_max_latency,
            required = params.required_max_latency,
            "max latency above requirement"
        );
        threshold_violation = true;
    }

    Report {
        text: out,
        threshold_violation,
    }
}
