//! Trace-driven traffic generation: replay packets from an external
//! `netrace` trace file in issue-cycle order while respecting the trace's
//! packet-dependency DAG. See spec.md §4.4 and the "Netrace auxiliary
//! state" part of §3.

use std::collections::{HashMap, VecDeque};

use crate::config::Params;
use crate::error::EvalError;
use crate::eval::Evaluator;
use crate::flit::Flit;
use crate::netrace_ffi::{NetraceContext, NtPacket, TraceSource};

#[derive(Debug)]
pub struct NetraceStrategy<T: TraceSource = NetraceContext> {
    ctx: T,
    ignore_dependencies: bool,
    num_ingresses: u64,
    num_egresses: u64,

    cycle_offset: u64,
    next_cycle: u64,
    trace_packet: Option<NtPacket>,

    /// Per-ingress holding pen for packets whose dependencies have not yet
    /// cleared. The `u64` is the packet's arrival-into-queue cycle; kept for
    /// parity with the original's `(packet, start_cycle)` pair though
    /// nothing currently reads it back out.
    waiting_queues: Vec<VecDeque<(NtPacket, u64)>>,
    dead_packets: Vec<NtPacket>,
    nt_packet_map: HashMap<u64, NtPacket>,
}

impl std::fmt::Debug for NtPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NtPacket")
            .field("seq", &self.seq)
            .field("cycle", &self.cycle)
            .field("src", &self.src)
            .field("dst", &self.dst)
            .finish()
    }
}

impl NetraceStrategy<NetraceContext> {
    pub fn new(params: &Params) -> Result<Self, EvalError> {
        let ctx = NetraceContext::open(&params.netrace_trace)
            .map_err(|_| EvalError::NetraceOpenFailed(params.netrace_trace.clone()))?;
        Ok(Self::from_source(ctx, params))
    }
}

impl<T: TraceSource> NetraceStrategy<T> {
    /// Build a strategy over any [`TraceSource`] — the real FFI-backed
    /// `NetraceContext` in production, or a deterministic test double in
    /// `tests/`. Separated from `new` so test code never has to open a real
    /// trace file.
    pub fn from_source(mut ctx: T, params: &Params) -> Self {
        if params.netrace_ignore_dependencies {
            ctx.disable_dependencies();
        }

        let region = params.netrace_region;
        ctx.seek_region(region);
        let cycle_offset = ctx.cycles_before_region(region);
        let trace_packet = ctx.read_packet();

        Self {
            ctx,
            ignore_dependencies: params.netrace_ignore_dependencies,
            num_ingresses: params.num_ingresses,
            num_egresses: params.num_egresses,
            cycle_offset,
            next_cycle: 0,
            trace_packet,
            waiting_queues: (0..params.num_ingresses).map(|_| VecDeque::new()).collect(),
            dead_packets: Vec::new(),
            nt_packet_map: HashMap::new(),
        }
    }

    /// The once-per-cycle cycle-advance work: idle fast-forward, draining
    /// the trace into waiting queues, completing dead packets, and
    /// promoting waiting packets whose dependencies have cleared.
    fn advance_cycle(&mut self, eval: &mut Evaluator, current_cycle: u64, count_sent_flits: bool) {
        // Idle fast-forward: skip ahead if nothing is in flight and there's
        // no pending cleanup work, so long idle gaps in the trace don't
        // waste wall-clock cycles.
        if let Some(tp) = &self.trace_packet {
            if tp.cycle > self.cycle_offset && eval.no_inflight_flits() && self.dead_packets.is_empty()
            {
                self.cycle_offset = tp.cycle;
            }
        }

        // Drain trace packets whose issue cycle has arrived into either the
        // dead-packet list (out-of-topology) or the per-ingress waiting queue.
        while let Some(tp) = &self.trace_packet {
            if tp.cycle > current_cycle + self.cycle_offset {
                break;
            }
            let packet = self.trace_packet.take().unwrap();
            if packet.src >= self.num_ingresses || packet.dst >= self.num_egresses {
                self.dead_packets.push(packet);
            } else {
                let src = packet.src as usize;
                self.waiting_queues[src].push_back((packet, 0));
            }
            self.trace_packet = self.ctx.read_packet();
        }

        // Dead packets never inject flits; they only need their
        // dependencies cleared so downstream packets can proceed.
        let mut i = 0;
        while i < self.dead_packets.len() {
            if self.ctx.dependencies_cleared(&self.dead_packets[i]) {
                let packet = self.dead_packets.remove(i);
                self.ctx.clear_and_free(packet);
            } else {
                i += 1;
            }
        }

        // Promote waiting packets whose dependencies have cleared (or
        // unconditionally, if dependency tracking is disabled).
        for ingress in 0..self.waiting_queues.len() {
            let mut j = 0;
            while j < self.waiting_queues[ingress].len() {
                let cleared = self.ignore_dependencies
                    || self.ctx.dependencies_cleared(&self.waiting_queues[ingress][j].0);
                if cleared {
                    let (packet, _start_cycle) = self.waiting_queues[ingress].remove(j).unwrap();
                    let dst = packet.dst;
                    let tail_unique_id = eval.inject_flits_for_packet(
                        ingress as u64,
                        dst,
                        count_sent_flits,
                        current_cycle,
                    );
                    self.nt_packet_map.insert(tail_unique_id, packet);
                } else {
                    j += 1;
                }
            }
        }
    }

    pub fn ingress_tick(
        &mut self,
        eval: &mut Evaluator,
        ingress_id: u64,
        current_cycle: u64,
        ready: bool,
        gen_packets: bool,
        count_sent_flits: bool,
    ) -> Option<Flit> {
        if ingress_id == 0 && gen_packets && current_cycle >= self.next_cycle {
            self.advance_cycle(eval, current_cycle, count_sent_flits);
            self.next_cycle = current_cycle + 1;
        }

        eval.pop_ready(ingress_id, ready)
    }

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
        if valid {
            if tail {
                let packet = self
                    .nt_packet_map
                    .remove(&unique_id)
                    .ok_or(EvalError::UnknownNetracePacket(unique_id))?;
                self.ctx.clear_and_free(packet);
            }
            eval.eject_flits(
                head,
                tail,
                ingress_id,
                egress_id,
                unique_id,
                current_cycle,
                count_recvd_flits,
            )?;
        }
        Ok(true)
    }
}
