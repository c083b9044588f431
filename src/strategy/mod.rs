//! Strategy dispatch: the two traffic-generation behaviors share the
//! `Evaluator` base and are selected by config, not by inheritance.
//! `Strategy` is a closed enum rather than a trait object — dispatch is
//! known statically at construction and never needs a vtable (spec.md §9,
//! "Polymorphism across strategies").

pub mod netrace;
pub mod random;

use crate::config::Params;
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::flit::Flit;
use netrace::NetraceStrategy;
use random::RandomStrategy;

#[derive(Debug)]
pub enum Strategy {
    Random(RandomStrategy),
    Netrace(NetraceStrategy),
}

impl Strategy {
    pub fn new(params: &Params) -> Result<Self, EvalError> {
        if params.netrace_enable {
            Ok(Strategy::Netrace(NetraceStrategy::new(params)?))
        } else {
            Ok(Strategy::Random(RandomStrategy::new(params)))
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn ingress_tick(
        &mut self,
        eval: &mut Evaluator,
        ingress_id: u64,
        current_cycle: u64,
        ready: bool,
        gen_packets: bool,
        count_sent_flits: bool,
    ) -> Option<Flit> {
        match self {
            Strategy::Random(s) => {
                s.ingress_tick(eval, ingress_id, current_cycle, ready, gen_packets, count_sent_flits)
            }
            Strategy::Netrace(s) => {
                s.ingress_tick(eval, ingress_id, current_cycle, ready, gen_packets, count_sent_flits)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn egress_tick(
        &mut self,
        eval: &mut Evaluator,
        egress_id: u64,
        current_cycle: u64,
        valid: bool,
        head: bool,
        tail: bool,
        ingress_id: u64,
        unique_id: u64,
        count_recvd_flits: bool,
    ) -> Result<bool, EvalError> {
        match self {
            Strategy::Random(s) => s.egress_tick(
                eval,
                egress_id,
                current_cycle,
                valid,
                head,
                tail,
                ingress_id,
                unique_id,
                count_recvd_flits,
            ),
            Strategy::Netrace(s) => s.egress_tick(
                eval,
                egress_id,
                current_cycle,
                valid,
                head,
                tail,
                ingress_id,
                unique_id,
                count_recvd_flits,
            ),
        }
    }
}
