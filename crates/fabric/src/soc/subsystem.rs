//! Memory subsystem: arbiter → L2 cache → protocol bridge → controller.
//!
//! The subsystem owns the whole path below the masters. Each `tick` either counts down the
//! transaction in flight or, when idle, arbitrates and executes the granted transaction
//! through the cache. The completion is delivered once its latency has elapsed.
//!
//! Grants that decode outside main RAM are parked as a [`PeripheralAccess`]. The owner of
//! the other slaves serves them and hands the result back with `finish_peripheral`.

use tracing::{debug, trace, warn};

use super::arbiter::BusArbiter;
use super::bridge::ProtocolBridge;
use super::cache::CacheStage;
use super::sizing::SubsystemPlan;
use crate::common::{BusError, Completion, Transaction};

/// Transaction whose completion is waiting out its latency.
#[derive(Clone, Copy, Debug)]
struct InFlight {
    master: usize,
    completion: Completion,
    remaining: u64,
}

/// A granted transaction addressed outside main RAM.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeripheralAccess {
    /// Arbiter slot holding the grant.
    pub master: usize,
    /// The granted transaction.
    pub txn: Transaction,
}

/// Counters kept by the subsystem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubsystemStats {
    /// Grants issued by the arbiter.
    pub grants: u64,
    /// Completions delivered as ack.
    pub acks: u64,
    /// Completions delivered as err.
    pub errors: u64,
    /// Completions dropped because the master withdrew.
    pub dropped: u64,
}

/// The arbitrated memory path.
#[derive(Debug)]
pub struct MemorySubsystem {
    arbiter: BusArbiter,
    cache: CacheStage,
    bridge: ProtocolBridge,
    plan: SubsystemPlan,
    base: u64,
    in_flight: Option<InFlight>,
    peripheral: Option<PeripheralAccess>,
    stats: SubsystemStats,
}

impl MemorySubsystem {
    /// Wires the stages together.
    ///
    /// # Arguments
    ///
    /// * `arbiter` - Arbiter with one slot per master.
    /// * `cache` - L2 cache sized from `plan`.
    /// * `bridge` - Bridge in front of the controller.
    /// * `plan` - Derived sizes.
    /// * `base` - Main RAM base byte address.
    pub fn new(
        arbiter: BusArbiter,
        cache: CacheStage,
        bridge: ProtocolBridge,
        plan: SubsystemPlan,
        base: u64,
    ) -> Self {
        Self {
            arbiter,
            cache,
            bridge,
            plan,
            base,
            in_flight: None,
            peripheral: None,
            stats: SubsystemStats::default(),
        }
    }

    /// The arbiter.
    pub const fn arbiter(&self) -> &BusArbiter {
        &self.arbiter
    }

    /// Mutable arbiter, for masters posting and collecting.
    pub fn arbiter_mut(&mut self) -> &mut BusArbiter {
        &mut self.arbiter
    }

    /// The L2 cache.
    pub const fn cache(&self) -> &CacheStage {
        &self.cache
    }

    /// The protocol bridge.
    pub const fn bridge(&self) -> &ProtocolBridge {
        &self.bridge
    }

    /// Mutable protocol bridge.
    pub fn bridge_mut(&mut self) -> &mut ProtocolBridge {
        &mut self.bridge
    }

    /// Derived sizes.
    pub const fn plan(&self) -> &SubsystemPlan {
        &self.plan
    }

    /// Counters.
    pub const fn stats(&self) -> SubsystemStats {
        self.stats
    }

    /// Returns `true` while a transaction is in flight, here or at a peripheral.
    pub const fn is_busy(&self) -> bool {
        self.in_flight.is_some() || self.peripheral.is_some()
    }

    /// The grant waiting for a peripheral, if any.
    pub const fn peripheral(&self) -> Option<PeripheralAccess> {
        self.peripheral
    }

    /// Completes the parked peripheral access after `latency` more cycles.
    ///
    /// Does nothing when no access is parked.
    pub fn finish_peripheral(&mut self, completion: Completion, latency: u64) {
        let Some(access) = self.peripheral.take() else {
            return;
        };
        if latency == 0 {
            self.deliver(access.master, completion);
        } else {
            self.in_flight = Some(InFlight {
                master: access.master,
                completion,
                remaining: latency,
            });
        }
    }

    /// Drops the parked peripheral access because its master withdrew.
    ///
    /// The grant is released at the next arbitration.
    pub fn abandon_peripheral(&mut self) {
        if let Some(access) = self.peripheral.take() {
            debug!(master = access.master, "peripheral access withdrawn");
            self.stats.dropped += 1;
        }
    }

    /// Returns `true` if `address` (bytes) decodes to main RAM.
    pub const fn decodes(&self, address: u64) -> bool {
        address >= self.base && address - self.base < self.plan.main_ram_size
    }

    /// Advances one cycle.
    pub fn tick(&mut self) {
        if let Some(mut in_flight) = self.in_flight.take() {
            if in_flight.remaining > 1 {
                in_flight.remaining -= 1;
                self.in_flight = Some(in_flight);
            } else {
                self.deliver(in_flight.master, in_flight.completion);
            }
            return;
        }
        if self.peripheral.is_some() {
            return;
        }

        let Some((master, txn)) = self.arbiter.poll() else {
            return;
        };
        self.stats.grants += 1;
        if !self.decodes(txn.byte_address()) {
            trace!(master, address = txn.address, "grant routed off main RAM");
            self.peripheral = Some(PeripheralAccess { master, txn });
            return;
        }
        let (completion, latency) = self.execute(&txn);
        debug!(
            master,
            address = txn.address,
            write = txn.is_write(),
            latency,
            "transaction executed"
        );
        if latency == 0 {
            self.deliver(master, completion);
        } else {
            self.in_flight = Some(InFlight {
                master,
                completion,
                remaining: latency,
            });
        }
    }

    fn execute(&mut self, txn: &Transaction) -> (Completion, u64) {
        let address = txn.byte_address();
        match self.cache.access(address - self.base, txn, &mut self.bridge) {
            Ok((data, cycles)) => (Completion::Ack { data }, cycles),
            Err(err) => {
                warn!(%err, "downstream error");
                (Completion::Error(err), 1)
            }
        }
    }

    fn deliver(&mut self, master: usize, completion: Completion) {
        match self.arbiter.complete(completion) {
            Ok(_) if completion.is_ack() => self.stats.acks += 1,
            Ok(_) => self.stats.errors += 1,
            Err(_) => {
                debug!(master, "completion dropped");
                self.stats.dropped += 1;
            }
        }
    }

    /// Writes every dirty cache line back to the controller.
    ///
    /// # Returns
    ///
    /// Downstream cycles spent.
    pub fn flush(&mut self) -> Result<u64, BusError> {
        self.cache.flush(&mut self.bridge)
    }
}
