//! Minimal FFI binding to the external `netrace` trace-reader library.
//!
//! `netrace` is a separate C library (out of scope to rewrite per spec.md
//! §1/§9); this module exposes only the narrow interface the netrace
//! strategy needs — open, read, dependency-clearance, and header/region
//! accessors — and wraps it in an RAII context modeled on
//! `rist-bonding-core::net::wrapper::RistContext`: an owning raw pointer,
//! a `Drop` impl that calls the library's destructor, and an `unsafe impl
//! Send` justified by the fact that the evaluator never shares a context
//! across threads (spec.md §5: single-threaded cooperative invocation).
//!
//! The real `nt_context_t`/`nt_header_t`/`nt_packet_t` layouts are owned by
//! the C library and not reproduced here; this binding treats the context
//! as an opaque buffer sized generously (`NT_CONTEXT_SIZE`) and reads
//! packet/header fields through accessor functions rather than struct
//! field offsets, which is the same shape a hand-written (non-bindgen) sys
//! binding takes when the upstream header isn't vendored locally.

use std::ffi::CString;
use libc::{c_char, c_int};

/// Opaque netrace reader context, owned by the C library.
#[repr(C)]
pub struct NtContext {
    _private: [u8; 0],
}

/// Opaque trace packet handle.
#[repr(C)]
pub struct NtPacketRaw {
    _private: [u8; 0],
}

/// Opaque trace-file header handle.
#[repr(C)]
pub struct NtHeaderRaw {
    _private: [u8; 0],
}

/// Generous stand-in allocation size for an `nt_context_t` the caller owns;
/// the real library only needs to see a sufficiently large, zeroed blob.
const NT_CONTEXT_SIZE: usize = 4096;

#[allow(non_camel_case_types)]
#[link(name = "netrace")]
extern "C" {
    fn nt_open_trfile(ctx: *mut NtContext, path: *const c_char) -> c_int;
    fn nt_close_trfile(ctx: *mut NtContext);
    fn nt_get_trheader(ctx: *mut NtContext) -> *const NtHeaderRaw;
    fn nt_header_region_num_cycles(header: *const NtHeaderRaw, region: u32) -> u64;
    fn nt_seek_region(ctx: *mut NtContext, region: u32) -> c_int;
    fn nt_disable_dependencies(ctx: *mut NtContext);
    fn nt_read_packet(ctx: *mut NtContext) -> *mut NtPacketRaw;
    fn nt_dependencies_cleared(ctx: *mut NtContext, packet: *mut NtPacketRaw) -> c_int;
    fn nt_clear_dependencies_free_packet(ctx: *mut NtContext, packet: *mut NtPacketRaw);
    fn nt_packet_cycle(packet: *const NtPacketRaw) -> u64;
    fn nt_packet_src(packet: *const NtPacketRaw) -> u64;
    fn nt_packet_dst(packet: *const NtPacketRaw) -> u64;
}

/// A trace packet read from the file. Owns the raw handle until explicitly
/// cleared via [`NetraceContext::clear_and_free`] or dropped as part of the
/// dead-packet path; carries `cycle`/`src`/`dst` read eagerly so callers
/// never need to dereference the raw pointer themselves. `seq` is this
/// binding's own read-order counter, not part of the C library's ABI — it
/// gives a [`TraceSource`] test double something stable to key dependency
/// state on without a real pointer.
pub struct NtPacket {
    raw: Option<*mut NtPacketRaw>,
    pub seq: u64,
    pub cycle: u64,
    pub src: u64,
    pub dst: u64,
}

// A packet is only ever touched by the single-threaded strategy that read
// it; no concurrent access is possible in this evaluator's scheduling model
// (spec.md §5).
unsafe impl Send for NtPacket {}

impl NtPacket {
    unsafe fn from_raw(raw: *mut NtPacketRaw, seq: u64) -> Self {
        unsafe {
            Self {
                raw: Some(raw),
                seq,
                cycle: nt_packet_cycle(raw),
                src: nt_packet_src(raw),
                dst: nt_packet_dst(raw),
            }
        }
    }

    /// Build a packet with no backing C allocation, for [`TraceSource`]
    /// test doubles that never touch the real library.
    pub(crate) fn synthetic(seq: u64, cycle: u64, src: u64, dst: u64) -> Self {
        Self {
            raw: None,
            seq,
            cycle,
            src,
            dst,
        }
    }
}

/// The subset of netrace reader behavior the netrace strategy depends on:
/// opening is left to the concrete type (real opens a trace file; a test
/// double can be constructed directly), but everything used per-cycle goes
/// through this trait so `NetraceStrategy` can be driven by either the real
/// FFI-backed [`NetraceContext`] or a deterministic fake in tests.
pub trait TraceSource {
    fn disable_dependencies(&mut self);
    fn seek_region(&mut self, region: u32);
    /// Sum of cycles across regions before `region`, used to compute the
    /// starting `cycle_offset`.
    fn cycles_before_region(&mut self, region: u32) -> u64;
    fn read_packet(&mut self) -> Option<NtPacket>;
    fn dependencies_cleared(&mut self, packet: &NtPacket) -> bool;
    fn clear_and_free(&mut self, packet: NtPacket);
}

/// Owning handle to an open netrace reader.
pub struct NetraceContext {
    buf: Box<[u8; NT_CONTEXT_SIZE]>,
    next_seq: u64,
}

unsafe impl Send for NetraceContext {}

impl NetraceContext {
    fn ctx_ptr(&mut self) -> *mut NtContext {
        self.buf.as_mut_ptr() as *mut NtContext
    }

    pub fn open(path: &str) -> std::io::Result<Self> {
        let mut ctx = Self {
            buf: Box::new([0u8; NT_CONTEXT_SIZE]),
            next_seq: 0,
        };
        let c_path = CString::new(path).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
        })?;
        let rc = unsafe { nt_open_trfile(ctx.ctx_ptr(), c_path.as_ptr()) };
        if rc != 0 {
            return Err(std::io::Error::other(format!(
                "nt_open_trfile({path}) failed with code {rc}"
            )));
        }
        Ok(ctx)
    }
}

impl TraceSource for NetraceContext {
    fn disable_dependencies(&mut self) {
        unsafe { nt_disable_dependencies(self.ctx_ptr()) }
    }

    fn seek_region(&mut self, region: u32) {
        unsafe {
            nt_seek_region(self.ctx_ptr(), region);
        }
    }

    fn cycles_before_region(&mut self, region: u32) -> u64 {
        let header = unsafe { nt_get_trheader(self.ctx_ptr()) };
        (0..region)
            .map(|r| unsafe { nt_header_region_num_cycles(header, r) })
            .sum()
    }

    fn read_packet(&mut self) -> Option<NtPacket> {
        let raw = unsafe { nt_read_packet(self.ctx_ptr()) };
        if raw.is_null() {
            None
        } else {
            let seq = self.next_seq;
            self.next_seq += 1;
            Some(unsafe { NtPacket::from_raw(raw, seq) })
        }
    }

    fn dependencies_cleared(&mut self, packet: &NtPacket) -> bool {
        let raw = packet.raw.expect("NtPacket read from NetraceContext always carries a raw handle");
        unsafe { nt_dependencies_cleared(self.ctx_ptr(), raw) != 0 }
    }

    fn clear_and_free(&mut self, packet: NtPacket) {
        let raw = packet.raw.expect("NtPacket read from NetraceContext always carries a raw handle");
        unsafe { nt_clear_dependencies_free_packet(self.ctx_ptr(), raw) }
    }
}

impl Drop for NetraceContext {
    fn drop(&mut self) {
        unsafe { nt_close_trfile(self.ctx_ptr()) }
    }
}

impl std::fmt::Debug for NetraceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetraceContext").finish_non_exhaustive()
    }
}
