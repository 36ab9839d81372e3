//! MESIF Protocol.
//!
//! MESI extended with a Forwarder state. Among the sharers of a block,
//! exactly one cache holds it in F and is the designated responder for the
//! next read. A read resolved by other caches installs the newcomer as the
//! forwarder; the previous forwarder, if any, demotes to plain S when it
//! snoops that read. At most one F per block therefore exists by
//! construction.

use crate::common::addr::ParsedAddress;
use crate::core::controller::{CacheController, PendingBusWork};
use crate::soc::bus::{Bus, BusRequest, BusRequestKind};
use crate::stats::StatisticsAccumulator;

use super::{
    block_transfer_cycles, block_words, broadcast, flush_dirty_victim, AccessOutcome, LineState,
    Protocol, SnoopPoll, TransactionCtx,
};

/// Marker type for the MESIF protocol.
pub enum Mesif {}

/// MESIF line states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MesifStatus {
    M,
    E,
    S,
    F,
    I,
}

impl LineState for MesifStatus {
    const INVALID: Self = MesifStatus::I;

    fn is_dirty(self) -> bool {
        self == MesifStatus::M
    }

    fn is_private(self) -> bool {
        matches!(self, MesifStatus::M | MesifStatus::E)
    }

    fn label(self) -> &'static str {
        match self {
            MesifStatus::M => "M",
            MesifStatus::E => "E",
            MesifStatus::S => "S",
            MesifStatus::F => "F",
            MesifStatus::I => "I",
        }
    }
}

fn complete_fill(
    ctx: &mut TransactionCtx<'_, Mesif>,
    id: usize,
    parsed: ParsedAddress,
    way: usize,
    cycle: u64,
    status: MesifStatus,
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

impl Protocol for Mesif {
    type Status = MesifStatus;

    const NAME: &'static str = "MESIF";

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
            MesifStatus::M => {
                ctx.ctrls[id].cache.touch(parsed.set_index, way, cycle);
                ctx.bus.release(id);
                AccessOutcome::Completed
            }
            MesifStatus::E => {
                let line = ctx.ctrls[id].cache.line_mut(parsed.set_index, way);
                line.status = MesifStatus::M;
                line.last_used = cycle;
                ctx.bus.release(id);
                AccessOutcome::Completed
            }
            MesifStatus::S | MesifStatus::F => {
                match broadcast(
                    ctx,
                    BusRequest::new(BusRequestKind::BusRdX, parsed.raw, id),
                ) {
                    SnoopPoll::Waiting => AccessOutcome::Stalled,
                    SnoopPoll::Settled { .. } => {
                        complete_fill(ctx, id, parsed, way, cycle, MesifStatus::M)
                    }
                }
            }
            MesifStatus::I => panic!("write hit dispatched on an invalid line"),
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
                    // The newcomer becomes the designated forwarder; the
                    // previous one demoted itself while snooping.
                    complete_fill(ctx, id, parsed, way, cycle, MesifStatus::F)
                } else if ctx.memory.read_data(parsed.raw) {
                    complete_fill(ctx, id, parsed, way, cycle, MesifStatus::E)
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
                    complete_fill(ctx, id, parsed, way, cycle, MesifStatus::M)
                } else if ctx.memory.read_data(parsed.raw) {
                    complete_fill(ctx, id, parsed, way, cycle, MesifStatus::M)
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

    fn snooped_transition(kind: BusRequestKind, status: MesifStatus) -> MesifStatus {
        match kind {
            BusRequestKind::BusRd => match status {
                MesifStatus::M | MesifStatus::E | MesifStatus::F => MesifStatus::S,
                other => other,
            },
            BusRequestKind::BusRdX => MesifStatus::I,
            other => panic!("{} must not reach a MESIF snooper", other),
        }
    }
}
