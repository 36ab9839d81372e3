//! Coherence Protocols.
//!
//! A protocol is a family of pure handlers over the controller fleet, the
//! bus, the memory controller, and the statistics sink. The controller
//! dispatches to the protocol once per processor request; the protocol is
//! chosen once at startup and the whole machine is monomorphised over it,
//! so the hot loop pays no dynamic dispatch.
//!
//! Every processor-side handler obeys one contract: try to make progress
//! this cycle and report `Completed` when the access retires, or `Stalled`
//! when the same instruction must be presented again next cycle. Bus and
//! cache state advanced so far stays put between retries; the transaction
//! picks up where it left off.

use clap::ValueEnum;

use crate::common::addr::ParsedAddress;
use crate::core::controller::{self, CacheController, PendingBusWork};
use crate::soc::bus::{Bus, BusRequest, BusRequestKind};
use crate::soc::memory::MemoryController;
use crate::stats::StatisticsAccumulator;

/// MESI invalidation protocol.
pub mod mesi;

/// Dragon update protocol.
pub mod dragon;

/// MOESI invalidation protocol with an owner state.
pub mod moesi;

/// MESIF invalidation protocol with a forwarder state.
pub mod mesif;

pub use dragon::{Dragon, DragonStatus};
pub use mesi::{Mesi, MesiStatus};
pub use mesif::{Mesif, MesifStatus};
pub use moesi::{Moesi, MoesiStatus};

/// The protocol selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProtocolKind {
    #[value(name = "MESI")]
    Mesi,
    #[value(name = "Dragon")]
    Dragon,
    #[value(name = "MOESI")]
    Moesi,
    #[value(name = "MESIF")]
    Mesif,
}

impl ProtocolKind {
    /// Canonical display name.
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolKind::Mesi => "MESI",
            ProtocolKind::Dragon => "Dragon",
            ProtocolKind::Moesi => "MOESI",
            ProtocolKind::Mesif => "MESIF",
        }
    }
}

/// Per-line coherence state of one protocol.
pub trait LineState: Copy + Eq + std::fmt::Debug + 'static {
    /// The state of a line that holds nothing.
    const INVALID: Self;

    /// States that hold the only up-to-date copy and must be written back
    /// before replacement.
    fn is_dirty(self) -> bool;

    /// States counted in the private bucket of the access histogram.
    fn is_private(self) -> bool;

    /// Short display label.
    fn label(self) -> &'static str;
}

/// Result of presenting a memory access to the cache controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessOutcome {
    /// The access retired this cycle.
    Completed,
    /// Present the same instruction again next cycle.
    Stalled,
}

/// Everything a processor-side handler may touch while it owns the bus.
pub struct TransactionCtx<'a, P: Protocol> {
    pub ctrls: &'a mut [CacheController<P>],
    pub bus: &'a mut Bus,
    pub memory: &'a mut MemoryController,
    pub stats: &'a mut StatisticsAccumulator,
}

/// One coherence scheme.
pub trait Protocol: Sized + 'static {
    /// The per-line state machine alphabet.
    type Status: LineState;

    /// Display name.
    const NAME: &'static str;

    /// Serves a load that hit in the cache.
    fn read_hit(
        ctx: &mut TransactionCtx<'_, Self>,
        id: usize,
        parsed: ParsedAddress,
        way: usize,
        cycle: u64,
    ) -> AccessOutcome;

    /// Serves a store that hit in the cache.
    fn write_hit(
        ctx: &mut TransactionCtx<'_, Self>,
        id: usize,
        parsed: ParsedAddress,
        way: usize,
        cycle: u64,
    ) -> AccessOutcome;

    /// Serves a load that missed; `way` is the victim candidate.
    fn read_miss(
        ctx: &mut TransactionCtx<'_, Self>,
        id: usize,
        parsed: ParsedAddress,
        way: usize,
        cycle: u64,
    ) -> AccessOutcome;

    /// Serves a store that missed; `way` is the victim candidate.
    fn write_miss(
        ctx: &mut TransactionCtx<'_, Self>,
        id: usize,
        parsed: ParsedAddress,
        way: usize,
        cycle: u64,
    ) -> AccessOutcome;

    /// First snoop of a transaction by a non-initiator that has no pending
    /// transfer. Sets this controller's response bits and, for a snoop
    /// that must deliver data, returns the multi-cycle work to perform.
    fn snoop(
        ctrl: &mut CacheController<Self>,
        bus: &mut Bus,
        request: BusRequest,
        is_hit: bool,
        way: usize,
        stats: &mut StatisticsAccumulator,
    ) -> Option<PendingBusWork>;

    /// Snooped-side state transition applied when this controller finishes
    /// responding to `kind`.
    fn snooped_transition(kind: BusRequestKind, status: Self::Status) -> Self::Status;
}

/// Outcome of one broadcast round of a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnoopPoll {
    /// Some snooper is mid transfer; retry next cycle.
    Waiting,
    /// Every snooper has responded. `shared` is true when any of them
    /// holds the block.
    Settled { shared: bool },
}

/// Places `request` on the bus and polls every controller's snoop handler.
///
/// If any snooper reports a multi-cycle transfer in progress, its
/// completed bit is re-armed and the round reports `Waiting`; the
/// initiator must re-broadcast next cycle. Otherwise the round settles
/// with the sharing verdict.
pub(crate) fn broadcast<P: Protocol>(
    ctx: &mut TransactionCtx<'_, P>,
    request: BusRequest,
) -> SnoopPoll {
    ctx.bus.request = Some(request);
    for id in 0..ctx.ctrls.len() {
        controller::receive_bus_request(&mut ctx.ctrls[id], ctx.bus, ctx.stats);
    }

    let mut waiting = false;
    for id in 0..ctx.bus.num_attached() {
        if ctx.bus.response_wait[id] {
            ctx.bus.response_completed[id] = false;
            waiting = true;
        }
    }
    if waiting {
        return SnoopPoll::Waiting;
    }

    let shared = ctx.bus.response_is_present.iter().any(|&present| present);
    SnoopPoll::Settled { shared }
}

/// Victim write-back interlock shared by every miss handler.
///
/// When the victim line holds a dirty state and the current transaction
/// has not yet paid its write-back, this starts (or continues) the
/// write-back. Returns `true` once the handler may proceed to the
/// coherence transaction, `false` when it must stall. The completed
/// write-back charges one block of bus traffic and is latched on the bus
/// so retries of the same transaction skip it.
pub(crate) fn flush_dirty_victim<P: Protocol>(
    ctx: &mut TransactionCtx<'_, P>,
    id: usize,
    set_index: u32,
    way: usize,
) -> bool {
    let cache = &ctx.ctrls[id].cache;
    if !cache.line(set_index, way).status.is_dirty() || ctx.bus.already_flush {
        return true;
    }

    let victim_address = cache.line_address(set_index, way);
    let words = cache.num_words_per_line as u64;
    ctx.bus.request = Some(BusRequest::new(BusRequestKind::Flush, victim_address, id));
    if ctx.memory.write_back(victim_address, ctx.stats) {
        ctx.bus.already_flush = true;
        ctx.stats.on_bus_traffic(words);
        true
    } else {
        false
    }
}

/// Words of a block transfer for the initiator's cache.
pub(crate) fn block_words<P: Protocol>(ctx: &TransactionCtx<'_, P>, id: usize) -> u64 {
    ctx.ctrls[id].cache.num_words_per_line as u64
}

/// Cycles a snooper spends streaming one block over the bus.
pub(crate) fn block_transfer_cycles(words_per_line: u32) -> u32 {
    crate::common::constants::CACHE_FLUSH_MULTIPLIER as u32 * words_per_line - 1
}
