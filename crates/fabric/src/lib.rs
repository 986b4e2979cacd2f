//! Cycle-level SoC memory fabric library.
//!
//! This crate models the bus fabric of a small system-on-chip with the following:
//! 1. **Arbitration:** Several bus masters share one slave port through a fixed-priority or
//!    round-robin arbiter.
//! 2. **Memory path:** A direct-mapped L2 cache, a native or AXI protocol bridge, and an SDRAM
//!    controller model with configurable timing.
//! 3. **Debug channel:** A bus-mapped debug transport bridge handshaking with a core's debug
//!    register interface.
//! 4. **Peripherals:** A countdown timer and a CSR bus with per-component banks.
//! 5. **Simulation:** Scripted traffic masters, a step loop, and statistics reporting.

/// Common types and constants (transactions, errors, bit helpers).
pub mod common;
/// Fabric configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Simulation driver and scripted traffic.
pub mod sim;
/// System-on-chip fabric (builder, arbiter, cache, bridges, debug, timer).
pub mod soc;
/// Fabric statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `SocConfig::default()` or deserialize from JSON.
pub use crate::config::SocConfig;
/// Composed system; build with `SocBuilder`.
pub use crate::soc::{Soc, SocBuilder};
/// Counter snapshot returned by `Soc::stats`.
pub use crate::stats::FabricStats;
