//! System-on-Chip fabric components.
//!
//! This module organizes the components of the composed fabric: the arbitrated memory path,
//! the debug transport bridge, the timer peripheral, and the builder that wires them.

/// Bus arbiter.
pub mod arbiter;

/// Protocol bridge (native and AXI modes).
pub mod bridge;

/// SoC builder and the composed `Soc`.
pub mod builder;

/// Direct-mapped L2 cache.
pub mod cache;

/// Debug transport bridge and core debug port.
pub mod debug;

/// SDRAM controller model.
pub mod memory;

/// Address region registration.
pub mod memory_map;

/// CSR register collection.
pub mod registry;

/// Configuration-time sizing.
pub mod sizing;

/// Arbiter → cache → bridge → controller composition.
pub mod subsystem;

/// Countdown timer peripheral.
pub mod timer;

pub use builder::{MasterId, Soc, SocBuilder};
