//! Cycle-accurate traffic evaluator for Network-on-Chip DUT simulation.
//!
//! Drives synthetic or trace-replayed packet traffic into a simulated NoC
//! DUT through per-cycle ingress/egress port calls, tracks flit lifecycle
//! and latency, and reports pass/fail against configured throughput and
//! latency thresholds at the end of a run.
//!
//! Linked into a Verilator/VCS DPI harness via the `cdylib` output and the
//! `extern "C"` entry points in [`tick`]; the same functionality is
//! available as a plain Rust library for host-side tests and tooling.

pub mod config;
pub mod error;
pub mod eval;
pub mod flit;
pub mod histogram;
pub mod netrace_ffi;
pub mod report;
pub mod strategy;
pub mod test_util;
pub mod tick;
