//! Simulator: owns the SoC and the scripted masters side by side.
//!
//! Each cycle the masters act on the present outputs (collecting completions, posting new
//! requests), then the SoC advances one step.

use tracing::info;

use super::traffic::{DebugRequester, TrafficMaster};
use crate::soc::Soc;
use crate::stats::FabricStats;

/// Outcome of `Simulator::run`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Cycles simulated by this call.
    pub cycles: u64,
    /// Whether every master finished before the cycle limit.
    pub finished: bool,
    /// Read-back mismatches across all masters.
    pub mismatches: u64,
    /// Rejected submissions across all masters.
    pub rejected: u64,
}

/// Top-level simulator: the SoC plus its traffic sources.
#[derive(Debug)]
pub struct Simulator {
    soc: Soc,
    masters: Vec<TrafficMaster>,
    debug: Option<DebugRequester>,
}

impl Simulator {
    /// Creates a simulator with no traffic.
    pub const fn new(soc: Soc) -> Self {
        Self {
            soc,
            masters: Vec::new(),
            debug: None,
        }
    }

    /// Adds a scripted master.
    pub fn add_master(&mut self, master: TrafficMaster) {
        self.masters.push(master);
    }

    /// Attaches a requester to the debug window.
    pub fn set_debug_requester(&mut self, requester: DebugRequester) {
        self.debug = Some(requester);
    }

    /// The SoC.
    pub const fn soc(&self) -> &Soc {
        &self.soc
    }

    /// Mutable SoC.
    pub fn soc_mut(&mut self) -> &mut Soc {
        &mut self.soc
    }

    /// Scripted masters.
    pub fn masters(&self) -> &[TrafficMaster] {
        &self.masters
    }

    /// Debug requester, if attached.
    pub const fn debug_requester(&self) -> Option<&DebugRequester> {
        self.debug.as_ref()
    }

    /// Returns `true` when all traffic has completed and the memory path is idle.
    pub fn is_done(&self) -> bool {
        self.masters.iter().all(TrafficMaster::is_done)
            && self.debug.as_ref().is_none_or(DebugRequester::is_done)
            && !self.soc.memory().is_busy()
    }

    /// Advances the simulator by one clock cycle.
    pub fn tick(&mut self) {
        for master in &mut self.masters {
            master.step(&mut self.soc);
        }
        if let Some(debug) = &mut self.debug {
            debug.step(&mut self.soc);
        }
        self.soc.tick();
    }

    /// Runs until all traffic completes or `max_cycles` elapse.
    pub fn run(&mut self, max_cycles: u64) -> RunSummary {
        let mut cycles = 0;
        while cycles < max_cycles && !self.is_done() {
            self.tick();
            cycles += 1;
        }
        let summary = RunSummary {
            cycles,
            finished: self.is_done(),
            mismatches: self.masters.iter().map(TrafficMaster::mismatches).sum(),
            rejected: self.masters.iter().map(TrafficMaster::rejected).sum(),
        };
        info!(?summary, "run finished");
        summary
    }

    /// Counter snapshot.
    pub fn stats(&self) -> FabricStats {
        self.soc.stats()
    }
}
