//! SoC composition and the top-level `Soc` type.
//!
//! This module wires the fabric together in one pass. It performs:
//! 1. **Validation:** The configuration is checked before anything is built.
//! 2. **Master registration:** Each named master gets one arbitrated slave port.
//! 3. **Controller registration:** Sizing is derived once, when the SDRAM is registered.
//! 4. **Finalization:** Memory map, cache, bridge, debug channel, timer, and CSR map are
//!    built; the builder is consumed, so nothing can be added afterwards.

use std::collections::BTreeMap;

use tracing::{debug, info, trace, warn};

use super::arbiter::BusArbiter;
use super::bridge::ProtocolBridge;
use super::cache::CacheStage;
use super::debug::{CoreDebugPort, DebugBusOut, DebugRegisterInterface, DebugTransportBridge};
use super::memory::MemoryController;
use super::memory_map::MemoryMap;
use super::registry::{CsrAccess, CsrMap, RegisterSurface};
use super::sizing::SubsystemPlan;
use super::subsystem::MemorySubsystem;
use super::timer::Timer;
use crate::common::constants::{BUS_WORD_BYTES, CSR_BANKS, CSR_BANK_SIZE, DEBUG_ADDRESS_MASK};
use crate::common::{BusError, Completion, ConfigError, ProtocolViolation, Transaction};
use crate::config::SocConfig;
use crate::stats::FabricStats;

/// Handle to one arbitrated master port.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MasterId(usize);

impl MasterId {
    /// Arbiter slot index (0 has the highest fixed priority).
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One-time composer for a [`Soc`].
pub struct SocBuilder {
    config: SocConfig,
    masters: Vec<String>,
    plan: Option<SubsystemPlan>,
    debug_port: Option<Box<dyn DebugRegisterInterface + Send>>,
}

impl std::fmt::Debug for SocBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocBuilder")
            .field("masters", &self.masters)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

impl SocBuilder {
    /// Validates `config` and starts a composition.
    ///
    /// # Returns
    ///
    /// The first `ConfigError` found by `SocConfig::validate`.
    pub fn new(config: &SocConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            masters: Vec::new(),
            plan: None,
            debug_port: None,
        })
    }

    /// Registers a bus master. Masters registered earlier have higher fixed priority.
    ///
    /// # Returns
    ///
    /// The master's handle, or `DuplicateMaster` if the name is taken.
    pub fn add_master(&mut self, name: &str) -> Result<MasterId, ConfigError> {
        if self.masters.iter().any(|m| m == name) {
            return Err(ConfigError::DuplicateMaster(name.to_string()));
        }
        self.masters.push(name.to_string());
        debug!(name, index = self.masters.len() - 1, "master registered");
        Ok(MasterId(self.masters.len() - 1))
    }

    /// Registers the SDRAM controller and derives the subsystem sizes.
    ///
    /// # Returns
    ///
    /// The derived plan; `DuplicateController` on a second call, or the width and geometry
    /// errors of `SubsystemPlan::derive`.
    pub fn register_sdram(&mut self) -> Result<SubsystemPlan, ConfigError> {
        if self.plan.is_some() {
            return Err(ConfigError::DuplicateController);
        }
        let plan = SubsystemPlan::derive(&self.config)?;
        info!(
            port_bits = plan.port_data_width,
            port_address_bits = plan.port_address_width,
            main_ram = plan.main_ram_size,
            l2 = plan.cache_size,
            "SDRAM registered"
        );
        self.plan = Some(plan);
        Ok(plan)
    }

    /// Replaces the core debug register model that answers the debug bridge.
    #[must_use]
    pub fn with_debug_port(mut self, port: Box<dyn DebugRegisterInterface + Send>) -> Self {
        self.debug_port = Some(port);
        self
    }

    /// Builds the SoC.
    ///
    /// # Returns
    ///
    /// `MissingController` if `register_sdram` was never called; memory map, burst framing,
    /// and CSR bank errors otherwise.
    pub fn finalize(self) -> Result<Soc, ConfigError> {
        let plan = self.plan.ok_or(ConfigError::MissingController)?;
        let config = self.config;

        let mut memory_map = MemoryMap::new();
        memory_map.add("main_ram", config.mem_map.main_ram, plan.main_ram_size)?;
        memory_map.add("csr", config.mem_map.csr, u64::from(CSR_BANKS) * CSR_BANK_SIZE)?;
        if config.debug.is_some() {
            let window = (u64::from(DEBUG_ADDRESS_MASK) + 1) * BUS_WORD_BYTES;
            memory_map.add("debug", config.mem_map.debug, window)?;
        }

        let controller = MemoryController::new(&config.sdram, &plan);
        let bridge = ProtocolBridge::new(&config.bridge, Box::new(controller))?;
        let cache = CacheStage::new(
            plan.cache_size,
            plan.port_bytes() as usize,
            &config.cache,
            config.full_memory_we(),
        );
        let arbiter = BusArbiter::new(self.masters.len(), config.bus.arbitration);
        let memory = MemorySubsystem::new(arbiter, cache, bridge, plan, config.mem_map.main_ram);

        let debug = match config.debug {
            Some(debug_config) => {
                let port: Box<dyn DebugRegisterInterface + Send> = match self.debug_port {
                    Some(port) => port,
                    None => Box::new(CoreDebugPort::new(debug_config.port_latency)),
                };
                Some(DebugChannel {
                    bridge: DebugTransportBridge::new(),
                    port,
                    bus: Transaction::idle(),
                })
            }
            None => None,
        };
        let timer = config.timer.map(|t| Timer::new(t.width));

        let mut csr_map = CsrMap::new(config.mem_map.csr, config.csr.data_width);
        let surfaces: [(&str, Option<&dyn RegisterSurface>); 2] = [
            ("debug", debug.as_ref().map(|d| &d.bridge as &dyn RegisterSurface)),
            ("timer0", timer.as_ref().map(|t| t as &dyn RegisterSurface)),
        ];
        for (name, surface) in surfaces {
            let Some(surface) = surface else { continue };
            let bank = config.csr.banks.get(name).copied().ok_or_else(|| {
                ConfigError::CsrBank(format!("no bank assigned to `{name}`"))
            })?;
            csr_map.add_component(name, bank, &surface.csr_registers())?;
        }
        csr_map.add_constant("L2_SIZE", plan.cache_size);
        csr_map.add_constant("MAIN_RAM_BASE", config.mem_map.main_ram);
        csr_map.add_constant("MAIN_RAM_SIZE", plan.main_ram_size);
        csr_map.add_constant("SDRAM_PORT_WIDTH", u64::from(plan.port_data_width));
        csr_map.add_constant("CSR_DATA_WIDTH", u64::from(config.csr.data_width));

        let has_debug = debug.is_some();
        let has_timer = timer.is_some();
        info!(
            masters = self.masters.len(),
            bridge = ?config.bridge.mode,
            has_debug,
            has_timer,
            "SoC composed"
        );

        Ok(Soc {
            masters: self.masters,
            memory,
            debug,
            timer,
            memory_map,
            csr_map,
            csr_staging: BTreeMap::new(),
            cycle: 0,
        })
    }
}

/// Debug bridge, its register interface, and the bus signals driving it.
struct DebugChannel {
    bridge: DebugTransportBridge,
    port: Box<dyn DebugRegisterInterface + Send>,
    bus: Transaction,
}

/// The composed system.
///
/// Exposes one arbitrated slave port per registered master, the debug register channel, and
/// the CSR bus. Master transactions are routed by the memory map to main RAM, the CSR bus,
/// or the debug window. `tick` advances every component by one cycle.
pub struct Soc {
    masters: Vec<String>,
    memory: MemorySubsystem,
    debug: Option<DebugChannel>,
    timer: Option<Timer>,
    memory_map: MemoryMap,
    csr_map: CsrMap,
    csr_staging: BTreeMap<u64, u32>,
    cycle: u64,
}

impl std::fmt::Debug for Soc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Soc")
            .field("masters", &self.masters)
            .field("memory", &self.memory)
            .field("cycle", &self.cycle)
            .finish_non_exhaustive()
    }
}

impl Soc {
    /// Registered master names, in priority order.
    pub fn masters(&self) -> &[String] {
        &self.masters
    }

    /// Looks up a master by name.
    pub fn master(&self, name: &str) -> Option<MasterId> {
        self.masters.iter().position(|m| m == name).map(MasterId)
    }

    /// Posts a transaction on a master port.
    pub fn submit(&mut self, master: MasterId, txn: Transaction) -> Result<(), ProtocolViolation> {
        self.memory.arbiter_mut().submit(master.0, txn)
    }

    /// Withdraws a master's pending transaction.
    pub fn withdraw(&mut self, master: MasterId) {
        self.memory.arbiter_mut().withdraw(master.0);
    }

    /// Collects a master's completion.
    pub fn take_response(&mut self, master: MasterId) -> Option<Completion> {
        self.memory.arbiter_mut().take_response(master.0)
    }

    /// Returns `true` while the master's transaction has not completed.
    pub fn is_pending(&self, master: MasterId) -> bool {
        self.memory.arbiter().is_pending(master.0)
    }

    /// Drives the debug window's bus signals; they hold until driven again.
    ///
    /// Master accesses to the window share these signals and wait while they are driven.
    /// Ignored when the SoC has no debug channel.
    pub fn debug_drive(&mut self, txn: Transaction) {
        if let Some(debug) = &mut self.debug {
            debug.bus = txn;
        }
    }

    /// Drops `active` and `strobe` on the debug window.
    pub fn debug_release(&mut self) {
        self.debug_drive(Transaction::idle());
    }

    /// Present bus outputs of the debug bridge.
    pub fn debug_output(&self) -> Option<DebugBusOut> {
        self.debug.as_ref().map(|d| d.bridge.bus_output())
    }

    /// The debug bridge.
    pub fn debug_bridge(&self) -> Option<&DebugTransportBridge> {
        self.debug.as_ref().map(|d| &d.bridge)
    }

    /// The timer peripheral.
    pub const fn timer(&self) -> Option<&Timer> {
        self.timer.as_ref()
    }

    /// Mutable timer peripheral.
    pub fn timer_mut(&mut self) -> Option<&mut Timer> {
        self.timer.as_mut()
    }

    /// Interrupt lines raised this cycle (the timer's zero event).
    pub fn irq(&self) -> bool {
        self.timer.as_ref().is_some_and(Timer::irq)
    }

    /// The memory subsystem.
    pub const fn memory(&self) -> &MemorySubsystem {
        &self.memory
    }

    /// Mutable memory subsystem.
    pub fn memory_mut(&mut self) -> &mut MemorySubsystem {
        &mut self.memory
    }

    /// Derived sizes.
    pub const fn plan(&self) -> &SubsystemPlan {
        self.memory.plan()
    }

    /// Validated memory map.
    pub const fn memory_map(&self) -> &MemoryMap {
        &self.memory_map
    }

    /// CSR layout and constants.
    pub const fn csr_map(&self) -> &CsrMap {
        &self.csr_map
    }

    /// Cycles elapsed.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    fn surface(&self, component: &str) -> Option<&dyn RegisterSurface> {
        match component {
            "debug" => self.debug.as_ref().map(|d| &d.bridge as &dyn RegisterSurface),
            "timer0" => self.timer.as_ref().map(|t| t as &dyn RegisterSurface),
            _ => None,
        }
    }

    fn surface_mut(&mut self, component: &str) -> Option<&mut dyn RegisterSurface> {
        match component {
            "debug" => self
                .debug
                .as_mut()
                .map(|d| &mut d.bridge as &mut dyn RegisterSurface),
            "timer0" => self.timer.as_mut().map(|t| t as &mut dyn RegisterSurface),
            _ => None,
        }
    }

    /// Reads one CSR bus word.
    ///
    /// # Returns
    ///
    /// The slice of the register selected by `address`, or `BusError::Unmapped`.
    pub fn csr_read(&self, address: u64) -> Result<u32, BusError> {
        let slot = self
            .csr_map
            .decode(address)
            .ok_or(BusError::Unmapped((address / BUS_WORD_BYTES) as u32))?;
        let value = self
            .surface(&slot.entry.component)
            .map_or(0, |s| s.read_csr(slot.entry.register.name));
        Ok(slot.extract(value))
    }

    /// Writes one CSR bus word.
    ///
    /// Multi-word registers are staged and committed when their last word is written.
    /// Writes to status registers are ignored.
    pub fn csr_write(&mut self, address: u64, data: u32) -> Result<(), BusError> {
        let slot = self
            .csr_map
            .decode(address)
            .ok_or(BusError::Unmapped((address / BUS_WORD_BYTES) as u32))?;
        if slot.entry.register.access == CsrAccess::ReadOnly {
            return Ok(());
        }
        let key = slot.entry.address;
        let staged = self.csr_staging.get(&key).copied().unwrap_or(0);
        let staged = slot.insert(staged, data);
        if !slot.is_last() {
            let _ = self.csr_staging.insert(key, staged);
            return Ok(());
        }
        let _ = self.csr_staging.remove(&key);
        let component = slot.entry.component.clone();
        let name = slot.entry.register.name;
        if let Some(surface) = self.surface_mut(&component) {
            surface.write_csr(name, staged);
        }
        Ok(())
    }

    /// Advances the whole SoC by one cycle.
    ///
    /// The memory subsystem goes first; a grant it parked outside main RAM is then routed
    /// through the memory map to the CSR bus or the debug window. Present outputs of the
    /// debug bridge and its register interface are sampled next, and both are clocked from
    /// those samples. The timer follows.
    pub fn tick(&mut self) {
        self.memory.tick();
        self.route_peripheral();
        if let Some(debug) = &mut self.debug {
            let bus = debug.bus;
            let response = debug.port.response();
            let command = debug.bridge.command();
            debug.bridge.clock(&bus, &response);
            debug.port.clock(&command);
        }
        if let Some(timer) = &mut self.timer {
            timer.tick();
        }
        self.cycle += 1;
    }

    /// Serves the grant the memory subsystem parked outside main RAM, if any.
    fn route_peripheral(&mut self) {
        let Some(access) = self.memory.peripheral() else {
            return;
        };
        if !self.memory.arbiter().is_pending(access.master) {
            self.memory.abandon_peripheral();
            let driving = |d: &&mut DebugChannel| {
                d.bus.is_requesting() && d.bus.same_request(&access.txn)
            };
            if let Some(debug) = self.debug.as_mut().filter(driving) {
                debug.bus = Transaction::idle();
            }
            return;
        }

        let owner = self
            .memory_map
            .decode(access.txn.byte_address())
            .map(|region| region.owner.clone());
        match owner.as_deref() {
            Some("csr") => {
                let completion = self.csr_access(&access.txn);
                self.memory.finish_peripheral(completion, 1);
            }
            Some("debug") => self.route_debug(access.txn),
            _ => {
                warn!(address = access.txn.byte_address(), "unmapped bus access");
                let error = BusError::Unmapped(access.txn.address);
                self.memory.finish_peripheral(Completion::Error(error), 1);
            }
        }
    }

    /// Holds a master's request on the debug window until the bridge acks it.
    ///
    /// The request is only presented once the bridge is idle and the window's signals are
    /// free, so it never lands in the middle of a `debug_drive` session.
    fn route_debug(&mut self, txn: Transaction) {
        let Some(debug) = &mut self.debug else {
            self.memory
                .finish_peripheral(Completion::Error(BusError::Unmapped(txn.address)), 1);
            return;
        };
        if debug.bus.is_requesting() && debug.bus.same_request(&txn) {
            let out = debug.bridge.bus_output();
            if out.ack {
                debug.bus = Transaction::idle();
                let data = out.read_data;
                self.memory.finish_peripheral(Completion::Ack { data }, 0);
            }
            return;
        }
        let free = !debug.bus.is_requesting()
            && !debug.bridge.transfer_in_progress()
            && !debug.bridge.transfer_wait_for_ack();
        if free {
            trace!(address = txn.address, "master request on debug window");
            debug.bus = txn;
        }
    }

    /// One CSR bus access on behalf of a master.
    fn csr_access(&mut self, txn: &Transaction) -> Completion {
        let address = txn.byte_address();
        let result = if txn.is_write() {
            self.csr_write(address, txn.write_data).map(|()| 0)
        } else {
            self.csr_read(address)
        };
        match result {
            Ok(data) => Completion::Ack { data },
            Err(err) => Completion::Error(err),
        }
    }

    /// Counter snapshot across all components.
    pub fn stats(&self) -> FabricStats {
        let memory = self.memory.stats();
        FabricStats {
            cycles: self.cycle,
            grants: memory.grants,
            acks: memory.acks,
            bus_errors: memory.errors,
            dropped_completions: memory.dropped,
            cache: self.memory.cache().stats(),
            line_transfers: self.memory.bridge().transfers(),
            controller: self.memory.bridge().port().stats(),
            debug_handshakes: self
                .debug
                .as_ref()
                .map_or(0, |d| u64::from(d.bridge.packet_counter())),
            debug_abandoned: self.debug.as_ref().map_or(0, |d| d.bridge.abandoned()),
            debug_violations: self.debug.as_ref().map_or(0, |d| d.bridge.violations()),
        }
    }

    /// Reads one bus word straight from the controller, bypassing the cache.
    ///
    /// Dirty cache lines are not visible here until `flush`.
    pub fn peek_word(&mut self, address: u64) -> Result<u32, BusError> {
        let word_address = (address / BUS_WORD_BYTES) as u32;
        if !self.memory.decodes(address) {
            return Err(BusError::Unmapped(word_address));
        }
        let offset = address - self.memory_map.region("main_ram").map_or(0, |r| r.base);
        let port = self.memory.bridge_mut().port_mut();
        let port_bytes = port.data_bytes() as u64;
        let (line, _) = port.read(offset / port_bytes)?;
        let lane = (offset % port_bytes) as usize & !3;
        let mut word = [0u8; 4];
        for (dst, src) in word.iter_mut().zip(line.iter().skip(lane)) {
            *dst = *src;
        }
        Ok(u32::from_le_bytes(word))
    }
}
