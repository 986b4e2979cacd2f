//! Fabric statistics collection and reporting.
//!
//! This module gathers the counters kept by each component into one snapshot. It provides:
//! 1. **Bus:** Grants, acks, errors, and completions dropped after a withdrawal.
//! 2. **L2 cache:** Hits, misses, fills, write-backs, and write-throughs.
//! 3. **Controller:** Line transfers, native reads/writes, and busy cycles.
//! 4. **Debug channel:** Completed, abandoned, and violating handshakes.

use std::fmt;

use crate::soc::cache::CacheStats;
use crate::soc::memory::ControllerStats;

/// Snapshot of every fabric counter, taken with `Soc::stats`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FabricStats {
    /// Cycles elapsed.
    pub cycles: u64,
    /// Grants issued by the arbiter.
    pub grants: u64,
    /// Transactions acknowledged.
    pub acks: u64,
    /// Transactions answered with `err`.
    pub bus_errors: u64,
    /// Completions dropped because their master withdrew.
    pub dropped_completions: u64,
    /// L2 cache counters.
    pub cache: CacheStats,
    /// Line transfers through the protocol bridge.
    pub line_transfers: u64,
    /// Native port counters.
    pub controller: ControllerStats,
    /// Completed debug handshakes.
    pub debug_handshakes: u64,
    /// Debug sessions withdrawn by the requester.
    pub debug_abandoned: u64,
    /// Debug requests changed mid-handshake.
    pub debug_violations: u64,
}

impl FabricStats {
    /// L2 hit rate in percent; zero before any access.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache.hits + self.cache.misses;
        if total == 0 {
            0.0
        } else {
            100.0 * self.cache.hits as f64 / total as f64
        }
    }

    /// Prints the report to stdout.
    pub fn print(&self) {
        println!("{self}");
    }
}

impl fmt::Display for FabricStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "==========================================================")?;
        writeln!(f, "SOC FABRIC STATISTICS")?;
        writeln!(f, "==========================================================")?;
        writeln!(f, "sim_cycles               {}", self.cycles)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "BUS")?;
        writeln!(f, "  bus.grants             {}", self.grants)?;
        writeln!(f, "  bus.acks               {}", self.acks)?;
        writeln!(f, "  bus.errors             {}", self.bus_errors)?;
        writeln!(f, "  bus.dropped            {}", self.dropped_completions)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "L2 CACHE")?;
        writeln!(f, "  l2.hits                {}", self.cache.hits)?;
        writeln!(f, "  l2.misses              {}", self.cache.misses)?;
        writeln!(f, "  l2.hit_rate            {:.2}%", self.cache_hit_rate())?;
        writeln!(f, "  l2.fills               {}", self.cache.fills)?;
        writeln!(f, "  l2.writebacks          {}", self.cache.writebacks)?;
        writeln!(f, "  l2.write_throughs      {}", self.cache.write_throughs)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "MEMORY CONTROLLER")?;
        writeln!(f, "  bridge.transfers       {}", self.line_transfers)?;
        writeln!(f, "  sdram.reads            {}", self.controller.reads)?;
        writeln!(f, "  sdram.writes           {}", self.controller.writes)?;
        writeln!(f, "  sdram.busy_cycles      {}", self.controller.busy_cycles)?;
        writeln!(f, "----------------------------------------------------------")?;
        writeln!(f, "DEBUG")?;
        writeln!(f, "  debug.handshakes       {}", self.debug_handshakes)?;
        writeln!(f, "  debug.abandoned        {}", self.debug_abandoned)?;
        writeln!(f, "  debug.violations       {}", self.debug_violations)?;
        write!(f, "==========================================================")
    }
}
