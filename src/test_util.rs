//! Deterministic test double for [`crate::netrace_ffi::TraceSource`], used
//! by integration tests to drive `NetraceStrategy`'s dependency-promotion
//! logic without linking the real `netrace` C library.

use std::collections::VecDeque;

use crate::netrace_ffi::{NtPacket, TraceSource};

/// One packet in a [`FakeTraceSource`]'s trace: `depends_on` is the `seq` of
/// the packet that must be cleared before this one's dependency is
/// considered satisfied, if any.
pub struct FakePacket {
    pub cycle: u64,
    pub src: u64,
    pub dst: u64,
    pub depends_on: Option<u64>,
}

impl FakePacket {
    pub fn new(cycle: u64, src: u64, dst: u64) -> Self {
        Self {
            cycle,
            src,
            dst,
            depends_on: None,
        }
    }

    pub fn depending_on(mut self, seq: u64) -> Self {
        self.depends_on = Some(seq);
        self
    }
}

/// In-memory [`TraceSource`] fed a fixed list of packets, keyed by read
/// order (`seq`) rather than a real pointer, so a test can assert exactly
/// when a dependency-gated packet becomes eligible for promotion.
pub struct FakeTraceSource {
    queue: VecDeque<(u64, FakePacket)>,
    depends_on: std::collections::HashMap<u64, Option<u64>>,
    cleared: std::collections::HashSet<u64>,
    ignore_dependencies: bool,
}

impl FakeTraceSource {
    pub fn new(packets: Vec<FakePacket>) -> Self {
        let mut queue = VecDeque::new();
        let mut depends_on = std::collections::HashMap::new();
        for (seq, packet) in packets.into_iter().enumerate() {
            let seq = seq as u64;
            depends_on.insert(seq, packet.depends_on);
            queue.push_back((seq, packet));
        }
        Self {
            queue,
            depends_on,
            cleared: std::collections::HashSet::new(),
            ignore_dependencies: false,
        }
    }
}

impl TraceSource for FakeTraceSource {
    fn disable_dependencies(&mut self) {
        self.ignore_dependencies = true;
    }

    fn seek_region(&mut self, _region: u32) {}

    fn cycles_before_region(&mut self, _region: u32) -> u64 {
        0
    }

    fn read_packet(&mut self) -> Option<NtPacket> {
        let (seq, packet) = self.queue.pop_front()?;
        Some(NtPacket::synthetic(seq, packet.cycle, packet.src, packet.dst))
    }

    fn dependencies_cleared(&mut self, packet: &NtPacket) -> bool {
        if self.ignore_dependencies {
            return true;
        }
        match self.depends_on.get(&packet.seq).copied().flatten() {
            Some(dep) => self.cleared.contains(&dep),
            None => true,
        }
    }

    fn clear_and_free(&mut self, packet: NtPacket) {
        self.cleared.insert(packet.seq);
    }
}
