//! MOESI Protocol.
//!
//! MESI extended with an Owned state: a cache that snoops a read of its
//! Modified line downgrades to O and keeps supplying the block, so the
//! dirty data never has to be written back just to be shared. Writes to
//! shared lines use a dataless `BusInvalidate` that every snooper
//! acknowledges in the same cycle. A non-owner sharer that ends up
//! supplying a block pays an extra daisy-chain arbitration cost.

use crate::common::addr::ParsedAddress;
use crate::core::controller::{CacheController, PendingBusWork};
use crate::soc::bus::{Bus, BusRequest, BusRequestKind};
use crate::stats::StatisticsAccumulator;

use super::{
    block_transfer_cycles, block_words, broadcast, flush_dirty_victim, AccessOutcome, LineState,
    Protocol, SnoopPoll, TransactionCtx,
};

/// Marker type for the MOESI protocol.
pub enum Moesi {}

/// MOESI line states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoesiStatus {
    M,
    O,
    E,
    S,
    I,
}

impl LineState for MoesiStatus {
    const INVALID: Self = MoesiStatus::I;

    fn is_dirty(self) -> bool {
        matches!(self, MoesiStatus::M | MoesiStatus::O)
    }

    fn is_private(self) -> bool {
        matches!(self, MoesiStatus::M | MoesiStatus::E)
    }

    fn label(self) -> &'static str {
        match self {
            MoesiStatus::M => "M",
            MoesiStatus::O => "O",
            MoesiStatus::E => "E",
            MoesiStatus::S => "S",
            MoesiStatus::I => "I",
        }
    }
}

fn complete_fill(
    ctx: &mut TransactionCtx<'_, Moesi>,
    id: usize,
    parsed: ParsedAddress,
    way: usize,
    cycle: u64,
    status: MoesiStatus,
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

impl Protocol for Moesi {
    type Status = MoesiStatus;

    const NAME: &'static str = "MOESI";

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
            MoesiStatus::M => {
                ctx.ctrls[id].cache.touch(parsed.set_index, way, cycle);
                ctx.bus.release(id);
                AccessOutcome::Completed
            }
            MoesiStatus::E => {
                let line = ctx.ctrls[id].cache.line_mut(parsed.set_index, way);
                line.status = MoesiStatus::M;
                line.last_used = cycle;
                ctx.bus.release(id);
                AccessOutcome::Completed
            }
            MoesiStatus::S | MoesiStatus::O => {
                // Dataless invalidation: snoopers acknowledge immediately,
                // so the transaction never waits and moves no words.
                match broadcast(
                    ctx,
                    BusRequest::new(BusRequestKind::BusInvalidate, parsed.raw, id),
                ) {
                    SnoopPoll::Waiting => AccessOutcome::Stalled,
                    SnoopPoll::Settled { .. } => {
                        ctx.ctrls[id].cache.fill(
                            parsed.set_index,
                            way,
                            parsed.tag,
                            MoesiStatus::M,
                            cycle,
                        );
                        ctx.bus.clear_responses();
                        ctx.bus.release(id);
                        AccessOutcome::Completed
                    }
                }
            }
            MoesiStatus::I => panic!("write hit dispatched on an invalid line"),
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
                    complete_fill(ctx, id, parsed, way, cycle, MoesiStatus::S)
                } else if ctx.memory.read_data(parsed.raw) {
                    complete_fill(ctx, id, parsed, way, cycle, MoesiStatus::E)
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
                    complete_fill(ctx, id, parsed, way, cycle, MoesiStatus::M)
                } else if ctx.memory.read_data(parsed.raw) {
                    complete_fill(ctx, id, parsed, way, cycle, MoesiStatus::M)
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
        stats: &mut StatisticsAccumulator,
    ) -> Option<PendingBusWork> {
        let id = ctrl.id;
        bus.response_is_present[id] = is_hit;
        bus.response_wait[id] = is_hit;

        if request.kind == BusRequestKind::BusInvalidate {
            bus.response_wait[id] = false;
            bus.response_completed[id] = true;
            if is_hit {
                stats.on_invalidate(id);
                let parsed = ctrl.cache.parse_address(request.address);
                let line = ctrl.cache.line_mut(parsed.set_index, way);
                line.status = Self::snooped_transition(request.kind, line.status);
            }
            return None;
        }

        if is_hit {
            let parsed = ctrl.cache.parse_address(request.address);
            let mut cycles_left = block_transfer_cycles(ctrl.cache.num_words_per_line);
            if ctrl.cache.line(parsed.set_index, way).status == MoesiStatus::S {
                // Non-owner supply goes through daisy-chained arbitration.
                cycles_left += bus.num_attached() as u32 + 1;
            }
            Some(PendingBusWork {
                request,
                set_index: parsed.set_index,
                way,
                cycles_left,
            })
        } else {
            bus.response_completed[id] = true;
            None
        }
    }

    fn snooped_transition(kind: BusRequestKind, status: MoesiStatus) -> MoesiStatus {
        match kind {
            BusRequestKind::BusRd => match status {
                MoesiStatus::M | MoesiStatus::O => MoesiStatus::O,
                MoesiStatus::E => MoesiStatus::S,
                other => other,
            },
            BusRequestKind::BusRdX | BusRequestKind::BusInvalidate => MoesiStatus::I,
            other => panic!("{} must not reach a MOESI snooper", other),
        }
    }
}
