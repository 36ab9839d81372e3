//! System Bus.
//!
//! The bus is the only shared resource in the machine. At most one cache
//! controller owns it at a time; while owned, the owner places a single
//! request on the request line and synchronously collects responses from
//! every other controller through the per-controller response lines.
//!
//! Arbitration is FIFO: controllers that fail to acquire the bus are
//! queued in registration order, and a release hands ownership straight to
//! the queue head. A controller that releases the bus cannot reacquire it
//! within the same cycle, so the head of the queue always makes progress.

use std::collections::VecDeque;
use std::fmt;

/// Kinds of coherence transactions placed on the request line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusRequestKind {
    /// Read a block with intent to share.
    BusRd,
    /// Read a block with intent to modify; sharers must invalidate.
    BusRdX,
    /// Broadcast a single updated word to sharers.
    BusUpd,
    /// Invalidate sharers without moving data.
    BusInvalidate,
    /// Write a dirty block back to memory.
    Flush,
}

impl fmt::Display for BusRequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BusRequestKind::BusRd => "BusRd",
            BusRequestKind::BusRdX => "BusRdX",
            BusRequestKind::BusUpd => "BusUpd",
            BusRequestKind::BusInvalidate => "BusInvalidate",
            BusRequestKind::Flush => "Flush",
        };
        f.write_str(name)
    }
}

/// A transaction on the request line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusRequest {
    pub kind: BusRequestKind,
    pub address: u32,
    /// Controller that initiated the transaction. The origin never snoops
    /// its own request.
    pub origin: usize,
}

impl BusRequest {
    pub fn new(kind: BusRequestKind, address: u32, origin: usize) -> Self {
        Self {
            kind,
            address,
            origin,
        }
    }
}

/// The shared bus: arbiter state, request line, and response lines.
///
/// The response lines are one triple of bits per controller:
///
/// * `response_completed[i]`: controller `i` has finished snooping the
///   current transaction and will not respond again.
/// * `response_is_present[i]`: controller `i` holds the requested block.
/// * `response_wait[i]`: controller `i` is mid block-transfer on behalf
///   of this transaction; the initiator must retry next cycle.
pub struct Bus {
    owner_id: Option<usize>,
    registration_queue: VecDeque<usize>,
    just_released: bool,

    /// The transaction currently being snooped, if any.
    pub request: Option<BusRequest>,

    /// The current transaction has already paid its victim write-back.
    pub already_flush: bool,
    /// The current transaction has already completed its sharing probe.
    pub already_busrd: bool,

    pub response_completed: Vec<bool>,
    pub response_is_present: Vec<bool>,
    pub response_wait: Vec<bool>,
}

impl Bus {
    /// Creates a bus with response lines for `num_controllers` controllers.
    pub fn new(num_controllers: usize) -> Self {
        Self {
            owner_id: None,
            registration_queue: VecDeque::new(),
            just_released: false,
            request: None,
            already_flush: false,
            already_busrd: false,
            response_completed: vec![false; num_controllers],
            response_is_present: vec![false; num_controllers],
            response_wait: vec![false; num_controllers],
        }
    }

    /// Number of controllers attached to the bus.
    pub fn num_attached(&self) -> usize {
        self.response_completed.len()
    }

    /// Current owner, if the bus is held.
    pub fn owner(&self) -> Option<usize> {
        self.owner_id
    }

    /// Tries to take ownership of the bus for `controller_id`.
    ///
    /// A controller that already owns the bus succeeds immediately. If the
    /// bus was released earlier in the same cycle, every acquirer is denied
    /// (and queued) so that the released-to waiter keeps its turn. A free
    /// bus is granted to the queue head, or to the requester when nobody is
    /// waiting; everyone else is appended to the queue at most once.
    pub fn acquire(&mut self, controller_id: usize) -> bool {
        if self.just_released {
            // The handed-over waiter is already the owner; queueing it
            // again would leave a stale queue entry behind.
            if self.owner_id != Some(controller_id) {
                self.register(controller_id);
            }
            return false;
        }
        if self.owner_id == Some(controller_id) {
            return true;
        }
        if self.owner_id.is_none() {
            match self.registration_queue.front() {
                Some(&head) if head == controller_id => {
                    self.registration_queue.pop_front();
                    self.owner_id = Some(controller_id);
                    return true;
                }
                None => {
                    self.owner_id = Some(controller_id);
                    return true;
                }
                Some(_) => {}
            }
        }
        self.register(controller_id);
        false
    }

    /// Releases the bus at the end of a transaction.
    ///
    /// Ownership passes directly to the next queued waiter, the transient
    /// transaction flags are cleared, and same-cycle reacquisition is
    /// latched off.
    pub fn release(&mut self, controller_id: usize) {
        if self.owner_id != Some(controller_id) {
            return;
        }
        self.owner_id = self.registration_queue.pop_front();
        self.request = None;
        self.already_flush = false;
        self.already_busrd = false;
        self.just_released = true;
    }

    /// Per-cycle housekeeping, called once before any processor steps.
    pub fn reset(&mut self) {
        self.just_released = false;
    }

    /// Clears all three response lines. Called by the initiator when its
    /// transaction fully completes, before releasing the bus.
    pub fn clear_responses(&mut self) {
        self.response_completed.fill(false);
        self.response_is_present.fill(false);
        self.response_wait.fill(false);
    }

    /// Clears only the completed bits, re-arming every controller to snoop
    /// a follow-up request within the same transaction.
    pub fn clear_completed(&mut self) {
        self.response_completed.fill(false);
    }

    fn register(&mut self, controller_id: usize) {
        if !self.registration_queue.contains(&controller_id) {
            self.registration_queue.push_back(controller_id);
        }
    }
}
