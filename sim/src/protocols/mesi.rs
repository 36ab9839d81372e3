//! MESI (Illinois) Protocol.
//!
//! Invalidation-based, four states: Modified, Exclusive, Shared, Invalid.
//! A read miss resolved by another cache lands in S; resolved by memory it
//! lands in E. Writes invalidate every other copy through `BusRdX`.

use crate::common::addr::ParsedAddress;
use crate::core::controller::{CacheController, PendingBusWork};
use crate::soc::bus::{Bus, BusRequest, BusRequestKind};
use crate::stats::StatisticsAccumulator;

use super::{
    block_transfer_cycles, block_words, broadcast, flush_dirty_victim, AccessOutcome, LineState,
    Protocol, SnoopPoll, TransactionCtx,
};

/// Marker type for the MESI protocol.
pub enum Mesi {}

/// MESI line states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MesiStatus {
    M,
    E,
    S,
    I,
}

impl LineState for MesiStatus {
    const INVALID: Self = MesiStatus::I;

    fn is_dirty(self) -> bool {
        self == MesiStatus::M
    }

    fn is_private(self) -> bool {
        matches!(self, MesiStatus::M | MesiStatus::E)
    }

    fn label(self) -> &'static str {
        match self {
            MesiStatus::M => "M",
            MesiStatus::E => "E",
            MesiStatus::S => "S",
            MesiStatus::I => "I",
        }
    }
}

/// Installs the fetched block and finishes the transaction.
fn complete_fill(
    ctx: &mut TransactionCtx<'_, Mesi>,
    id: usize,
    parsed: ParsedAddress,
    way: usize,
    cycle: u64,
    status: MesiStatus,
) -> AccessOutcome {
    let words = block_words(ctx, id);
    ctx.ctrls[id]
        .cache
        .fill(parsed.set_index, way, parsed.tag, status, cycle);
    ctx.stats.on_bus_traffic(words);
    ctx.bus.clear_responses();
    ctx.bus.release(id);
    AccessOutcome::Completed
}

impl Protocol for Mesi {
    type Status = MesiStatus;

    const NAME: &'static str = "MESI";

    fn read_hit(
        ctx: &mut TransactionCtx<'_, Self>,
        id: usize,
        parsed: ParsedAddress,
        way: usize,
        cycle: u64,
    ) -> AccessOutcome {
        if !ctx.bus.acquire(id) {
            return AccessOutcome::Stalled;
        }
        ctx.bus.release(id);
        ctx.ctrls[id].cache.touch(parsed.set_index, way, cycle);
        AccessOutcome::Completed
    }

    fn write_hit(
        ctx: &mut TransactionCtx<'_, Self>,
        id: usize,
        parsed: ParsedAddress,
        way: usize,
        cycle: u64,
    ) -> AccessOutcome {
        if !ctx.bus.acquire(id) {
            return AccessOutcome::Stalled;
        }
        let status = ctx.ctrls[id].cache.line(parsed.set_index, way).status;
        match status {
            MesiStatus::M => {
                ctx.ctrls[id].cache.touch(parsed.set_index, way, cycle);
                ctx.bus.release(id);
                AccessOutcome::Completed
            }
            MesiStatus::E => {
                // Silent upgrade: no other cache holds the block.
                let line = ctx.ctrls[id].cache.line_mut(parsed.set_index, way);
                line.status = MesiStatus::M;
                line.last_used = cycle;
                ctx.bus.release(id);
                AccessOutcome::Completed
            }
            MesiStatus::S => {
                match broadcast(
                    ctx,
                    BusRequest::new(BusRequestKind::BusRdX, parsed.raw, id),
                ) {
                    SnoopPoll::Waiting => AccessOutcome::Stalled,
                    SnoopPoll::Settled { .. } => {
                        complete_fill(ctx, id, parsed, way, cycle, MesiStatus::M)
                    }
                }
            }
            MesiStatus::I => panic!("write hit dispatched on an invalid line"),
        }
    }

    fn read_miss(
        ctx: &mut TransactionCtx<'_, Self>,
        id: usize,
        parsed: ParsedAddress,
        way: usize,
        cycle: u64,
    ) -> AccessOutcome {
        if !ctx.bus.acquire(id) {
            return AccessOutcome::Stalled;
        }
        if !flush_dirty_victim(ctx, id, parsed.set_index, way) {
            return AccessOutcome::Stalled;
        }
        match broadcast(ctx, BusRequest::new(BusRequestKind::BusRd, parsed.raw, id)) {
            SnoopPoll::Waiting => AccessOutcome::Stalled,
            SnoopPoll::Settled { shared } => {
                if shared {
                    complete_fill(ctx, id, parsed, way, cycle, MesiStatus::S)
                } else if ctx.memory.read_data(parsed.raw) {
                    complete_fill(ctx, id, parsed, way, cycle, MesiStatus::E)
                } else {
                    AccessOutcome::Stalled
                }
            }
        }
    }

    fn write_miss(
        ctx: &mut TransactionCtx<'_, Self>,
        id: usize,
        parsed: ParsedAddress,
        way: usize,
        cycle: u64,
    ) -> AccessOutcome {
        if !ctx.bus.acquire(id) {
            return AccessOutcome::Stalled;
        }
        if !flush_dirty_victim(ctx, id, parsed.set_index, way) {
            return AccessOutcome::Stalled;
        }
        match broadcast(
            ctx,
            BusRequest::new(BusRequestKind::BusRdX, parsed.raw, id),
        ) {
            SnoopPoll::Waiting => AccessOutcome::Stalled,
            SnoopPoll::Settled { shared } => {
                if shared {
                    complete_fill(ctx, id, parsed, way, cycle, MesiStatus::M)
                } else if ctx.memory.read_data(parsed.raw) {
                    complete_fill(ctx, id, parsed, way, cycle, MesiStatus::M)
                } else {
                    AccessOutcome::Stalled
                }
            }
        }
    }

    fn snoop(
        ctrl: &mut CacheController<Self>,
        bus: &mut Bus,
        request: BusRequest,
        is_hit: bool,
        way: usize,
        _stats: &mut StatisticsAccumulator,
    ) -> Option<PendingBusWork> {
        let id = ctrl.id;
        bus.response_is_present[id] = is_hit;
        bus.response_wait[id] = is_hit;
        if is_hit {
            let parsed = ctrl.cache.parse_address(request.address);
            Some(PendingBusWork {
                request,
                set_index: parsed.set_index,
                way,
                cycles_left: block_transfer_cycles(ctrl.cache.num_words_per_line),
            })
        } else {
            bus.response_completed[id] = true;
            None
        }
    }

    fn snooped_transition(kind: BusRequestKind, status: MesiStatus) -> MesiStatus {
        match kind {
            BusRequestKind::BusRd => match status {
                MesiStatus::M | MesiStatus::E => MesiStatus::S,
                other => other,
            },
            BusRequestKind::BusRdX => MesiStatus::I,
            other => panic!("{} must not reach a MESI snooper", other),
        }
    }
}
