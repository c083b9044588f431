//! The two per-port entry points and the end-of-run reporter (spec.md §4.5).
//!
//! `params`, `eval`, and `strategy` are process-wide singletons, lazily
//! initialized on the first tick and never torn down — process exit
//! reclaims them, matching the original's raw global pointers. Ticks are
//! strictly serialized by the host simulator (spec.md §5), so a `Mutex`
//! here exists only for `Send`/`'static` soundness, not for contention.

use std::sync::{Mutex, OnceLock};

use crate::config::Params;
use crate::eval::Evaluator;
use crate::flit::Flit;
use crate::report;
use crate::strategy::Strategy;

struct RunState {
    params: Params,
    eval: Evaluator,
    strategy: Strategy,
    /// Guards against re-emitting the results CSV if the host keeps
    /// ticking after `success` has already been signaled once.
    reported: bool,
}

static STATE: OnceLock<Mutex<RunState>> = OnceLock::new();

fn state<I, S>(args: I, fallback: &str) -> &'static Mutex<RunState>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    STATE.get_or_init(|| {
        let params = Params::resolve(args, fallback).unwrap_or_else(|e| {
            tracing::error!(error = %e, "fatal config error");
            std::process::exit(1);
        });
        let eval = Evaluator::new(&params);
        let strategy = Strategy::new(&params).unwrap_or_else(|e| {
            tracing::error!(error = %e, "fatal error constructing traffic strategy");
            std::process::exit(1);
        });
        Mutex::new(RunState {
            params,
            eval,
            strategy,
            reported: false,
        })
    })
}

/// Outcome of a single `ingress_tick`, matching the per-cycle ingress port
/// protocol in spec.md §6.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngressOutput {
    pub valid: bool,
    pub head: bool,
    pub tail: bool,
    pub egress_id: u64,
    pub unique_id: u64,
}

impl From<Option<Flit>> for IngressOutput {
    fn from(flit: Option<Flit>) -> Self {
        match flit {
            Some(f) => IngressOutput {
                valid: true,
                head: f.head,
                tail: f.tail,
                egress_id: f.egress_id,
                unique_id: f.unique_id,
            },
            None => IngressOutput::default(),
        }
    }
}

/// Outcome of a single `egress_tick`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EgressOutput {
    pub ready: bool,
    pub success: bool,
    pub fatal: bool,
}

pub fn ingress_tick<I, S>(
    args: I,
    fallback_config: &str,
    ingress_id: u64,
    current_cycle: u64,
    ready: bool,
) -> IngressOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let state = state(args, fallback_config);
    let mut guard = state.lock().expect("traffic-eval singleton poisoned");
    let RunState {
        params,
        eval,
        strategy,
        ..
    } = &mut *guard;

    let gen_packets = !params.in_drain(current_cycle);
    let count_sent = params.in_measurement(current_cycle);
    let flit = strategy.ingress_tick(eval, ingress_id, current_cycle, ready, gen_packets, count_sent);
    IngressOutput::from(flit)
}

#[allow(clippy::too_many_arguments)]
pub fn egress_tick<I, S>(
    args: I,
    fallback_config: &str,
    egress_id: u64,
    current_cycle: u64,
    valid: bool,
    head: bool,
    tail: bool,
    ingress_id: u64,
    unique_id: u64,
) -> EgressOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let state = state(args, fallback_config);
    let mut guard = state.lock().expect("traffic-eval singleton poisoned");
    let RunState {
        params,
        eval,
        strategy,
        reported,
    } = &mut *guard;

    let count_recvd = params.in_measurement(current_cycle);
    match strategy.egress_tick(
        eval,
        egress_id,
        current_cycle,
        valid,
        head,
        tail,
        ingress_id,
        unique_id,
        count_recvd,
    ) {
        Ok(ready) => {
            let mut out = EgressOutput {
                ready,
                success: false,
                fatal: false,
            };
            if egress_id == 0 {
                if params.timed_out(current_cycle) {
                    tracing::error!(current_cycle, "traffic eval timed out");
                    out.fatal = true;
                } else if params.in_drain(current_cycle) && eval.no_inflight_flits() && !*reported {
                    *reported = true;
                    let report = report::render(params, eval);
                    println!("{}", report.text);
                    out.success = !report.threshold_violation;
                    out.fatal = report.threshold_violation;
                }
            }
            out
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal invariant violation");
            std::process::exit(1);
        }
    }
}

/// `#[no_mangle] extern "C"` entry points for DPI linkage. Kept in their own
/// submodule so their names (`ingress_tick`/`egress_tick`, fixed by the
/// original host's DPI import declarations) don't collide with the safe
/// functions of the same name one level up.
pub mod ffi {
    use super::{egress_tick, ingress_tick};
    use libc::c_char;
    use std::ffi::CStr;

    /// Scan `argv`-style strings for a `+eval_params=`/`+EVAL_PARAMS=`
    /// plusarg; thin helper so the entry points below can build the
    /// argument list from `std::env::args()` exactly once.
    fn host_args() -> Vec<String> {
        std::env::args().collect()
    }

    unsafe fn c_str_to_string(ptr: *const c_char) -> String {
        if ptr.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() }
    }

    /// # Safety
    /// All output pointers must be valid and writable for the duration of
    /// the call; `config_str` must be a valid, NUL-terminated C string or
    /// null.
    #[no_mangle]
    pub unsafe extern "C" fn ingress_tick(
        ingress_id: i64,
        config_str: *const c_char,
        current_cycle: i64,
        flit_out_ready: u8,
        flit_out_valid: *mut u8,
        flit_out_head: *mut u8,
        flit_out_tail: *mut u8,
        flit_out_egress_id: *mut i64,
        flit_out_unique_id: *mut i64,
    ) {
        let fallback = unsafe { c_str_to_string(config_str) };
        let out = ingress_tick(
            host_args(),
            &fallback,
            ingress_id as u64,
            current_cycle as u64,
            flit_out_ready != 0,
        );
        unsafe {
            *flit_out_valid = out.valid as u8;
            if out.valid {
                *flit_out_head = out.head as u8;
                *flit_out_tail = out.tail as u8;
                *flit_out_egress_id = out.egress_id as i64;
                *flit_out_unique_id = out.unique_id as i64;
            }
        }
    }

    /// # Safety
    /// All output pointers must be valid and writable for the duration of
    /// the call; `config_str` must be a valid, NUL-terminated C string or
    /// null.
    #[no_mangle]
    pub unsafe extern "C" fn egress_tick(
        egress_id: i64,
        config_str: *const c_char,
        current_cycle: i64,
        flit_in_ready: *mut u8,
        flit_in_valid: u8,
        flit_in_head: u8,
        flit_in_tail: u8,
        flit_in_ingress_id: i64,
        flit_in_unique_id: i64,
        success: *mut u8,
        fatal: *mut u8,
    ) {
        let fallback = unsafe { c_str_to_string(config_str) };
        let out = egress_tick(
            host_args(),
            &fallback,
            egress_id as u64,
            current_cycle as u64,
            flit_in_valid != 0,
            flit_in_head != 0,
            flit_in_tail != 0,
            flit_in_ingress_id as u64,
            flit_in_unique_id as u64,
        );
        unsafe {
            *flit_in_ready = out.ready as u8;
            *success = out.success as u8;
            *fatal = out.fatal as u8;
        }
    }
}
