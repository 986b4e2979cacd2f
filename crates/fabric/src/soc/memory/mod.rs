//! Main memory behind the SDRAM controller.
//!
//! This module implements the controller side of the memory subsystem. It provides:
//! 1. **Port:** The `NativePort` trait the protocol bridge drives.
//! 2. **Storage:** Sparse, lazily allocated backing bytes for main RAM.
//! 3. **Controller:** Latency modeling (fixed or row-buffer) on top of the storage.

/// SDRAM controller model and latency models.
pub mod controller;

/// Native port trait.
pub mod port;

/// Sparse main RAM storage.
pub mod storage;

pub use controller::{ControllerStats, MemoryController};
pub use port::NativePort;
pub use storage::SparseStorage;
