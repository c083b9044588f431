//! The evaluator base: flit-id issuance, ingress queues, the in-flight map,
//! latency histograms, and the shared injection/ejection primitives that
//! both traffic strategies build on. See spec.md §3 and §4.2.

use std::collections::{HashMap, VecDeque};

use crate::config::{Flow, Params};
use crate::error::EvalError;
use crate::flit::{Flit, FlitId};
use crate::histogram::LatencyHistogram;

#[derive(Debug)]
pub struct Evaluator {
    flits_per_packet: u64,
    num_ingresses: u64,
    num_egresses: u64,

    next_unique_id: FlitId,
    ingress_queues: Vec<VecDeque<Flit>>,
    inflight_flits: HashMap<FlitId, Flit>,

    flits_sent: Vec<Vec<u64>>,
    flits_received: Vec<Vec<u64>>,
    latencies_by_flow: Vec<Vec<LatencyHistogram>>,
    overall_latency: LatencyHistogram,
    total_flits_received: u64,
}

impl Evaluator {
    pub fn new(params: &Params) -> Self {
        let ni = params.num_ingresses as usize;
        let ne = params.num_egresses as usize;
        Self {
            flits_per_packet: params.flits_per_packet,
            num_ingresses: params.num_ingresses,
            num_egresses: params.num_egresses,
            next_unique_id: 0,
            ingress_queues: (0..ni).map(|_| VecDeque::new()).collect(),
            inflight_flits: HashMap::new(),
            flits_sent: vec![vec![0u64; ne]; ni],
            flits_received: vec![vec![0u64; ne]; ni],
            latencies_by_flow: (0..ni)
                .map(|_| (0..ne).map(|_| LatencyHistogram::new()).collect())
                .collect(),
            overall_latency: LatencyHistogram::new(),
            total_flits_received: 0,
        }
    }

    fn next_id(&mut self) -> FlitId {
        let id = self.next_unique_id;
        self.next_unique_id += 1;
        id
    }

    /// Allocate `flits_per_packet` flits for a new packet, enqueue them on
    /// `ingress_id`'s queue in order (head first, tail last), and insert
    /// each into the in-flight map. Returns the tail flit's unique id, used
    /// by the netrace strategy to key its packet-dependency map.
    pub fn inject_flits_for_packet(
        &mut self,
        ingress_id: u64,
        egress_id: u64,
        count_injected_flits: bool,
        current_cycle: u64,
    ) -> FlitId {
        let mut tail_unique_id = 0;
        for f in 0..self.flits_per_packet {
            let unique_id = self.next_id();
            let flit = Flit::new(
                f == 0,
                f + 1 == self.flits_per_packet,
                ingress_id,
                egress_id,
                unique_id,
                current_cycle,
            );
            self.inflight_flits.insert(unique_id, flit);
            tail_unique_id = unique_id;
            self.ingress_queues[ingress_id as usize].push_back(flit);
        }
        if count_injected_flits {
            self.flits_sent[ingress_id as usize][egress_id as usize] += self.flits_per_packet;
        }
        tail_unique_id
    }

    /// Shared ready/pop logic used identically by both strategies: if
    /// `ready` and the queue is nonempty, dequeue and return the head flit.
    pub fn pop_ready(&mut self, ingress_id: u64, ready: bool) -> Option<Flit> {
        if ready {
            self.ingress_queues[ingress_id as usize].pop_front()
        } else {
            None
        }
    }

    /// Validate and retire a flit delivered at an egress. Fatal if the flit
    /// is not in the in-flight map, or if its identity does not match the
    /// record created at injection.
    pub fn eject_flits(
        &mut self,
        head: bool,
        tail: bool,
        ingress_id: u64,
        egress_id: u64,
        unique_id: FlitId,
        current_cycle: u64,
        count_recvd_flits: bool,
    ) -> Result<(), EvalError> {
        let flit = self
            .inflight_flits
            .remove(&unique_id)
            .ok_or(EvalError::LostFlit(unique_id))?;

        if flit.head != head || flit.tail != tail || flit.ingress_id != ingress_id {
            return Err(EvalError::IdentityMismatch {
                unique_id,
                expected_head: flit.head,
                expected_tail: flit.tail,
                expected_ingress: flit.ingress_id,
                got_head: head,
                got_tail: tail,
                got_ingress: ingress_id,
            });
        }

        if count_recvd_flits {
            let latency = current_cycle - flit.creation_cycle;
            self.flits_received[ingress_id as usize][egress_id as usize] += 1;
            self.total_flits_received += 1;
            self.latencies_by_flow[ingress_id as usize][egress_id as usize].record(latency);
            self.overall_latency.record(latency);
        }

        Ok(())
    }

    pub fn no_inflight_flits(&self) -> bool {
        self.inflight_flits.is_empty()
    }

    pub fn num_inflight_flits(&self) -> usize {
        self.inflight_flits.len()
    }

    pub fn total_flits_received(&self) -> u64 {
        self.total_flits_received
    }

    pub fn get_flits_received(&self, flow: &Flow) -> u64 {
        self.flits_received[flow.ingress_id as usize][flow.egress_id as usize]
    }

    pub fn get_flits_sent(&self, flow: &Flow) -> u64 {
        self.flits_sent[flow.ingress_id as usize][flow.egress_id as usize]
    }

    pub fn get_max_latency(&self, flow: &Flow) -> u64 {
        self.latencies_by_flow[flow.ingress_id as usize][flow.egress_id as usize].max()
    }

    pub fn get_median_latency(&self, flow: &Flow) -> u64 {
        self.latencies_by_flow[flow.ingress_id as usize][flow.egress_id as usize].median()
    }

    pub fn get_overall_max_latency(&self) -> u64 {
        self.overall_latency.max()
    }

    pub fn get_overall_median_latency(&self) -> u64 {
        self.overall_latency.median()
    }

    pub fn get_overall_latency_count(&self, latency: u64) -> u64 {
        self.overall_latency.count_at(latency)
    }

    pub fn num_ingresses(&self) -> u64 {
        self.num_ingresses
    }

    pub fn num_egresses(&self) -> u64 {
        self.num_egresses
    }

    pub fn flits_per_packet(&self) -> u64 {
        self.flits_per_packet
    }
}
