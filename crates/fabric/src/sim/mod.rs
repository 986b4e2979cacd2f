//! Simulation driver and scripted traffic.
//!
//! Provides the step loop that clocks a composed SoC together with the masters that
//! exercise it.

/// Step loop.
pub mod simulator;

/// Scripted bus and debug masters.
pub mod traffic;

pub use simulator::{RunSummary, Simulator};
pub use traffic::{DebugOp, DebugRequester, TrafficMaster, TrafficOp};
