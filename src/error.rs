//! Error types for configuration parsing and in-run invariant violations.
//!
//! Neither variant here is recoverable: a `ConfigError` aborts before the
//! first tick, an `EvalError` aborts mid-run. Threshold misses (throughput,
//! latency, drain timeout) are not errors — they are reported through the
//! `fatal` output of the port protocol, see `report`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line {line}: unknown directive `{directive}`")]
    UnknownDirective { line: usize, directive: String },

    #[error("line {line}: directive `{directive}` expects {expected} argument(s), got {got}")]
    BadArity {
        line: usize,
        directive: String,
        expected: usize,
        got: usize,
    },

    #[error("line {line}: could not parse `{value}` as a number for `{directive}`")]
    BadNumber {
        line: usize,
        directive: String,
        value: String,
    },

    #[error("netrace_region must be in 0..5, got {0}")]
    BadRegion(u32),

    #[error("must specify at least one flow, or enable netrace_enable")]
    NoFlows,

    #[error("could not read config file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Invariant violations detected while the simulation is running. These
/// indicate a DUT bug or state corruption and are never silently ignored.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("lost flit: unique_id {0} is not in the in-flight map")]
    LostFlit(u64),

    #[error(
        "flit {unique_id} delivered with mismatched identity: \
         expected head={expected_head} tail={expected_tail} ingress={expected_ingress}, \
         got head={got_head} tail={got_tail} ingress={got_ingress}"
    )]
    IdentityMismatch {
        unique_id: u64,
        expected_head: bool,
        expected_tail: bool,
        expected_ingress: u64,
        got_head: bool,
        got_tail: bool,
        got_ingress: u64,
    },

    #[error("netrace packet for tail flit {0} was not found in the dependency map")]
    UnknownNetracePacket(u64),

    #[error("failed to open netrace trace file `{0}`")]
    NetraceOpenFailed(String),
}
