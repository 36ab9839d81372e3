//! Cache Controller.
//!
//! The controller has two faces. The processor side takes one memory
//! access per cycle, locates the line, and dispatches to the protocol
//! handler for (hit, read/write). The snoop side answers the transaction
//! currently on the bus: it either finishes immediately or parks
//! multi-cycle transfer work in `pending_bus_request` and re-enters it on
//! every later broadcast of the same transaction.
//!
//! Controllers never hold references to each other. The fleet is a slice
//! indexed by controller id, and every cross-controller effect goes
//! through that slice plus the shared bus.

use crate::common::instruction::AccessKind;
use crate::protocols::{AccessOutcome, LineState, Protocol, TransactionCtx};
use crate::soc::bus::{Bus, BusRequest, BusRequestKind};
use crate::soc::memory::MemoryController;
use crate::stats::StatisticsAccumulator;

use super::cache::Cache;

/// Snoop-side work carried across cycles: a block (or word) transfer this
/// controller performs on behalf of the transaction on the bus.
#[derive(Clone, Copy, Debug)]
pub struct PendingBusWork {
    pub request: BusRequest,
    /// Location of this controller's copy of the snooped block.
    pub set_index: u32,
    pub way: usize,
    /// Remaining transfer cycles; strictly decreasing.
    pub cycles_left: u32,
}

/// One core's cache controller.
pub struct CacheController<P: Protocol> {
    pub id: usize,
    pub cache: Cache<P::Status>,
    /// In-flight snoop-side transfer, if any.
    pub pending_bus_request: Option<PendingBusWork>,
}

impl<P: Protocol> CacheController<P> {
    pub fn new(id: usize, cache: Cache<P::Status>) -> Self {
        Self {
            id,
            cache,
            pending_bus_request: None,
        }
    }
}

/// Presents one memory access to controller `id`.
///
/// Returns `Completed` when the access retires this cycle, `Stalled` when
/// the same instruction must be presented again. Hit statistics are
/// recorded on the completing cycle, bucketed by the line state the access
/// was served in (the state before the handler ran).
pub fn processor_request<P: Protocol>(
    ctrls: &mut [CacheController<P>],
    id: usize,
    kind: AccessKind,
    address: u32,
    cycle: u64,
    bus: &mut Bus,
    memory: &mut MemoryController,
    stats: &mut StatisticsAccumulator,
) -> AccessOutcome {
    let parsed = ctrls[id].cache.parse_address(address);
    let (way, is_hit) = ctrls[id].cache.locate(parsed.set_index, parsed.tag);
    let served_state = if is_hit {
        Some(ctrls[id].cache.line(parsed.set_index, way).status)
    } else {
        None
    };

    let mut ctx = TransactionCtx {
        ctrls: &mut *ctrls,
        bus: &mut *bus,
        memory: &mut *memory,
        stats: &mut *stats,
    };
    let outcome = match (is_hit, kind) {
        (true, AccessKind::Read) => P::read_hit(&mut ctx, id, parsed, way, cycle),
        (true, AccessKind::Write) => P::write_hit(&mut ctx, id, parsed, way, cycle),
        (false, AccessKind::Read) => P::read_miss(&mut ctx, id, parsed, way, cycle),
        (false, AccessKind::Write) => P::write_miss(&mut ctx, id, parsed, way, cycle),
    };

    if outcome == AccessOutcome::Completed {
        if let Some(status) = served_state {
            match kind {
                AccessKind::Read => stats.on_read_hit(id, status.label(), status.is_private()),
                AccessKind::Write => stats.on_write_hit(id, status.label(), status.is_private()),
            }
        }
    }
    outcome
}

/// Polls one controller's snoop response to the transaction on the bus.
///
/// A controller that has already responded this transaction is skipped,
/// and the origin short-circuits with an absent response. Otherwise the
/// pending transfer advances, or the protocol's snoop handler is asked for
/// a fresh response.
pub fn receive_bus_request<P: Protocol>(
    ctrl: &mut CacheController<P>,
    bus: &mut Bus,
    stats: &mut StatisticsAccumulator,
) {
    let id = ctrl.id;
    if bus.response_completed[id] {
        return;
    }
    let request = match bus.request {
        Some(request) => request,
        None => panic!("controller {} snooped with no request on the bus", id),
    };
    if request.origin == id {
        bus.response_completed[id] = true;
        bus.response_is_present[id] = false;
        return;
    }

    if let Some(pending) = ctrl.pending_bus_request.take() {
        continue_pending(ctrl, bus, stats, pending);
        return;
    }

    let parsed = ctrl.cache.parse_address(request.address);
    let (way, is_hit) = ctrl.cache.locate(parsed.set_index, parsed.tag);
    let pending = P::snoop(ctrl, bus, request, is_hit, way, stats);
    ctrl.pending_bus_request = pending;
}

/// Advances an in-flight snoop transfer by one cycle.
///
/// While cycles remain the controller keeps its wait line asserted. On the
/// final cycle it completes the response, charges the invalidation or
/// update implied by the request kind, and applies the snooped-side state
/// transition.
fn continue_pending<P: Protocol>(
    ctrl: &mut CacheController<P>,
    bus: &mut Bus,
    stats: &mut StatisticsAccumulator,
    mut pending: PendingBusWork,
) {
    let id = ctrl.id;
    bus.response_is_present[id] = true;
    if pending.cycles_left > 1 {
        pending.cycles_left -= 1;
        bus.response_wait[id] = true;
        ctrl.pending_bus_request = Some(pending);
        return;
    }

    bus.response_completed[id] = true;
    bus.response_wait[id] = false;
    match pending.request.kind {
        BusRequestKind::BusRdX | BusRequestKind::BusUpd => stats.on_invalidate(id),
        _ => {}
    }
    let line = ctrl.cache.line_mut(pending.set_index, pending.way);
    line.status = P::snooped_transition(pending.request.kind, line.status);
}
