//! Dragon Protocol.
//!
//! Update-based, five states: Modified, Exclusive, SharedModified,
//! SharedClean, Invalid. Writes to shared lines broadcast the written word
//! (`BusUpd`) instead of invalidating; the writer ends in Sm and every
//! other sharer in Sc. A write miss probes sharing with a `BusRd` first;
//! the probe result is latched on the bus so retries do not repeat it.

use crate::common::addr::ParsedAddress;
use crate::core::controller::{CacheController, PendingBusWork};
use crate::soc::bus::{Bus, BusRequest, BusRequestKind};
use crate::stats::StatisticsAccumulator;

use super::{
    block_transfer_cycles, block_words, broadcast, flush_dirty_victim, AccessOutcome, LineState,
    Protocol, SnoopPoll, TransactionCtx,
};

/// Marker type for the Dragon protocol.
pub enum Dragon {}

/// Dragon line states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragonStatus {
    M,
    E,
    Sm,
    Sc,
    I,
}

impl LineState for DragonStatus {
    const INVALID: Self = DragonStatus::I;

    fn is_dirty(self) -> bool {
        matches!(self, DragonStatus::M | DragonStatus::Sm)
    }

    fn is_private(self) -> bool {
        matches!(self, DragonStatus::M | DragonStatus::E)
    }

    fn label(self) -> &'static str {
        match self {
            DragonStatus::M => "M",
            DragonStatus::E => "E",
            DragonStatus::Sm => "Sm",
            DragonStatus::Sc => "Sc",
            DragonStatus::I => "I",
        }
    }
}

/// Installs a fetched block and finishes the transaction, charging one
/// block of traffic.
fn complete_fill(
    ctx: &mut TransactionCtx<'_, Dragon>,
    id: usize,
    parsed: ParsedAddress,
    way: usize,
    cycle: u64,
    status: DragonStatus,
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

/// Finishes a `BusUpd` transaction: the writer lands in Sm and one word
/// crossed the bus.
fn complete_update(
    ctx: &mut TransactionCtx<'_, Dragon>,
    id: usize,
    parsed: ParsedAddress,
    way: usize,
    cycle: u64,
) -> AccessOutcome {
    ctx.ctrls[id]
        .cache
        .fill(parsed.set_index, way, parsed.tag, DragonStatus::Sm, cycle);
    ctx.stats.on_bus_traffic(1);
    ctx.bus.clear_responses();
    ctx.bus.release(id);
    AccessOutcome::Completed
}

impl Protocol for Dragon {
    type Status = DragonStatus;

    const NAME: &'static str = "Dragon";

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
            DragonStatus::M => {
                ctx.ctrls[id].cache.touch(parsed.set_index, way, cycle);
                ctx.bus.release(id);
                AccessOutcome::Completed
            }
            DragonStatus::E => {
                let line = ctx.ctrls[id].cache.line_mut(parsed.set_index, way);
                line.status = DragonStatus::M;
                line.last_used = cycle;
                ctx.bus.release(id);
                AccessOutcome::Completed
            }
            DragonStatus::Sc | DragonStatus::Sm => {
                match broadcast(
                    ctx,
                    BusRequest::new(BusRequestKind::BusUpd, parsed.raw, id),
                ) {
                    SnoopPoll::Waiting => AccessOutcome::Stalled,
                    SnoopPoll::Settled { .. } => complete_update(ctx, id, parsed, way, cycle),
                }
            }
            DragonStatus::I => panic!("write hit dispatched on an invalid line"),
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
                    // The writer keeps Sm; a reader joins as a clean sharer.
                    complete_fill(ctx, id, parsed, way, cycle, DragonStatus::Sc)
                } else if ctx.memory.read_data(parsed.raw) {
                    complete_fill(ctx, id, parsed, way, cycle, DragonStatus::E)
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

        // First half: a BusRd probe fetches the block and settles whether
        // anyone shares it. The verdict stays on the response lines.
        if !ctx.bus.already_busrd {
            match broadcast(ctx, BusRequest::new(BusRequestKind::BusRd, parsed.raw, id)) {
                SnoopPoll::Waiting => return AccessOutcome::Stalled,
                SnoopPoll::Settled { shared } => {
                    ctx.bus.already_busrd = true;
                    if shared {
                        let words = block_words(ctx, id);
                        ctx.stats.on_bus_traffic(words);
                    }
                    ctx.bus.clear_completed();
                }
            }
        }

        let shared = ctx.bus.response_is_present.iter().any(|&present| present);
        if !shared {
            if ctx.memory.read_data(parsed.raw) {
                complete_fill(ctx, id, parsed, way, cycle, DragonStatus::M)
            } else {
                AccessOutcome::Stalled
            }
        } else {
            // Second half: update the sharers with the written word.
            match broadcast(
                ctx,
                BusRequest::new(BusRequestKind::BusUpd, parsed.raw, id),
            ) {
                SnoopPoll::Waiting => AccessOutcome::Stalled,
                SnoopPoll::Settled { .. } => complete_update(ctx, id, parsed, way, cycle),
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
        match request.kind {
            BusRequestKind::BusRd | BusRequestKind::BusUpd => {}
            other => panic!("{} must not reach a Dragon snooper", other),
        }
        let id = ctrl.id;
        bus.response_is_present[id] = is_hit;
        bus.response_wait[id] = is_hit;
        if is_hit {
            let parsed = ctrl.cache.parse_address(request.address);
            let cycles_left = match request.kind {
                BusRequestKind::BusRd => block_transfer_cycles(ctrl.cache.num_words_per_line),
                _ => 1,
            };
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

    fn snooped_transition(kind: BusRequestKind, status: DragonStatus) -> DragonStatus {
        match kind {
            BusRequestKind::BusRd => match status {
                DragonStatus::M => DragonStatus::Sm,
                DragonStatus::E => DragonStatus::Sc,
                other => other,
            },
            BusRequestKind::BusUpd => match status {
                DragonStatus::I => DragonStatus::I,
                _ => DragonStatus::Sc,
            },
            other => panic!("{} must not reach a Dragon snooper", other),
        }
    }
}
