//! Bus arbiter for the shared memory subsystem.
//!
//! This module implements the arbiter that puts one master at a time in front of the L2 cache. It provides:
//! 1. **Request slots:** One slot per registered master, holding its present bus signals.
//! 2. **Grant selection:** Fixed-priority (default) or round-robin, re-evaluated on every `poll`.
//! 3. **Grant holding:** The incumbent keeps the target until its own strobe deasserts.
//! 4. **Completion delivery:** Exactly one ack or err per grant, never to a withdrawn or later transaction.

use tracing::{debug, error, trace, warn};

use crate::common::{Completion, ProtocolViolation, Transaction};
use crate::config::ArbitrationPolicy;

/// Per-master request slot.
#[derive(Clone, Debug, Default)]
struct MasterSlot {
    /// Present signals driven by the master (idle when nothing is requested).
    request: Transaction,
    /// Result waiting for the master to collect.
    response: Option<Completion>,
}

/// Arbiter multiplexing N masters onto a single downstream target.
///
/// At most one grant exists at any time. Selection only happens when the grant is free,
/// so a long transaction is never pre-empted.
#[derive(Debug)]
pub struct BusArbiter {
    slots: Vec<MasterSlot>,
    grant: Option<usize>,
    last_granted: Option<usize>,
    policy: ArbitrationPolicy,
}

impl BusArbiter {
    /// Creates an arbiter with `masters` request slots.
    ///
    /// # Arguments
    ///
    /// * `masters` - Number of master ports.
    /// * `policy` - Selection policy used when no grant is held.
    pub fn new(masters: usize, policy: ArbitrationPolicy) -> Self {
        Self {
            slots: vec![MasterSlot::default(); masters],
            grant: None,
            last_granted: None,
            policy,
        }
    }

    /// Number of master ports.
    pub fn masters(&self) -> usize {
        self.slots.len()
    }

    /// Index of the master currently holding the grant.
    pub const fn grant(&self) -> Option<usize> {
        self.grant
    }

    /// Returns `true` if `master` has a request that has not completed yet.
    pub fn is_pending(&self, master: usize) -> bool {
        self.slots
            .get(master)
            .is_some_and(|slot| slot.request.is_requesting())
    }

    /// Posts a transaction on behalf of `master` (asserts `active` + `strobe`).
    ///
    /// # Arguments
    ///
    /// * `master` - Master port index.
    /// * `txn` - Transaction to post; must be active and strobed.
    ///
    /// # Returns
    ///
    /// `Err` if the master holds the grant, already has a pending request, does not exist,
    /// or the transaction is malformed. The arbiter is unchanged in every error case.
    pub fn submit(&mut self, master: usize, txn: Transaction) -> Result<(), ProtocolViolation> {
        let result = self.check_submit(master, &txn);
        match result {
            Ok(()) => {
                trace!(master, address = txn.address, "request posted");
                self.slots[master].request = txn;
                self.slots[master].response = None;
            }
            Err(violation) => error!(master, %violation, "rejected bus submission"),
        }
        result
    }

    fn check_submit(&self, master: usize, txn: &Transaction) -> Result<(), ProtocolViolation> {
        let Some(slot) = self.slots.get(master) else {
            return Err(ProtocolViolation::UnknownMaster(master));
        };
        if !txn.is_well_formed() || !txn.is_requesting() {
            return Err(ProtocolViolation::Malformed);
        }
        if self.grant == Some(master) {
            return Err(ProtocolViolation::ResubmitWhileGranted(master));
        }
        if slot.request.is_requesting() {
            return Err(ProtocolViolation::AlreadyPending(master));
        }
        Ok(())
    }

    /// Deasserts `master`'s strobe, abandoning its request.
    ///
    /// A withdrawn incumbent loses the grant at the next `poll`. Any completion that later
    /// arrives for it is dropped.
    pub fn withdraw(&mut self, master: usize) {
        if let Some(slot) = self.slots.get_mut(master) {
            if slot.request.is_requesting() {
                debug!(master, "request withdrawn");
            }
            slot.request = Transaction::idle();
        }
    }

    /// Arbitrates for this cycle.
    ///
    /// # Returns
    ///
    /// The granted `(master, transaction)` if any master holds the grant after
    /// arbitration. Repeated polls without a completion return the same grant;
    /// an incumbent that withdrew is replaced.
    pub fn poll(&mut self) -> Option<(usize, Transaction)> {
        if let Some(incumbent) = self.grant {
            if self.slots[incumbent].request.is_requesting() {
                return Some((incumbent, self.slots[incumbent].request));
            }
            trace!(master = incumbent, "grant released");
            self.grant = None;
        }

        let winner = self.select()?;
        debug!(master = winner, policy = ?self.policy, "grant");
        self.grant = Some(winner);
        self.last_granted = Some(winner);
        Some((winner, self.slots[winner].request))
    }

    fn select(&self) -> Option<usize> {
        let count = self.slots.len();
        let start = match self.policy {
            ArbitrationPolicy::FixedPriority => 0,
            ArbitrationPolicy::RoundRobin => self.last_granted.map_or(0, |last| (last + 1) % count),
        };
        (0..count)
            .map(|offset| (start + offset) % count)
            .find(|&idx| self.slots[idx].request.is_requesting())
    }

    /// Delivers the downstream result to the incumbent and releases the grant.
    ///
    /// The incumbent's strobe is deasserted as it observes the ack or err.
    ///
    /// # Returns
    ///
    /// The master that received the result, or `ProtocolViolation::NoGrant` if nobody
    /// holds a live grant. A result for a withdrawn incumbent is dropped, and the grant
    /// is released all the same.
    pub fn complete(&mut self, result: Completion) -> Result<usize, ProtocolViolation> {
        let Some(master) = self.grant.take() else {
            warn!(?result, "completion with no grant");
            return Err(ProtocolViolation::NoGrant);
        };
        let slot = &mut self.slots[master];
        if !slot.request.is_requesting() {
            warn!(master, ?result, "dropping completion for withdrawn transaction");
            return Err(ProtocolViolation::NoGrant);
        }
        trace!(master, ack = result.is_ack(), "completion delivered");
        slot.request = Transaction::idle();
        slot.response = Some(result);
        Ok(master)
    }

    /// Collects the result waiting for `master`, if any.
    pub fn take_response(&mut self, master: usize) -> Option<Completion> {
        self.slots.get_mut(master).and_then(|slot| slot.response.take())
    }
}
