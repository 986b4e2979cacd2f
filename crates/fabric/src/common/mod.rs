//! Common types shared by every fabric component.
//!
//! This module provides the fundamental building blocks used across the crate. It includes:
//! 1. **Constants:** Bus width, debug register layout, and sizing limits.
//! 2. **Transactions:** Bus transactions, completions, and port-width line transfers.
//! 3. **Error Handling:** Configuration errors, protocol violations, and runtime bus errors.
//! 4. **Bit Helpers:** Power-of-two rounding and lane-mask arithmetic.

/// Power-of-two and log2 helpers.
pub mod bits;

/// Fabric-wide constants.
pub mod constants;

/// Error types.
pub mod error;

/// Bus transaction, completion, and line transfer types.
pub mod transaction;

pub use error::{BusError, ConfigError, ProtocolViolation};
pub use transaction::{BurstType, Completion, Direction, LineTransfer, Transaction};
