//! Error types for composition, bus protocol, and runtime faults.
//!
//! This module defines the three failure classes of the fabric. It provides:
//! 1. **Configuration Errors:** Fatal setup mistakes detected before any wiring happens.
//! 2. **Protocol Violations:** Contract breaches by a master or requester; rejected without
//!    touching component state.
//! 3. **Bus Errors:** Runtime `err` responses from a downstream target, propagated unmodified.
//!
//! An out-of-range debug register selector is deliberately absent: it has defined sentinel
//! behavior and is not a failure.

use thiserror::Error;

use super::constants::MAX_CACHE_SIZE;

/// Fatal configuration or composition error.
///
/// Returned by the validation functions that run once before wiring. None of these can occur
/// once a [`Soc`](crate::soc::Soc) has been built.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `register_sdram` was called a second time.
    #[error("a memory controller is already registered")]
    DuplicateController,

    /// `finalize` was called before any memory controller was registered.
    #[error("finalize called before a memory controller was registered (call register_sdram first)")]
    MissingController,

    /// The controller's native port cannot carry a full SoC bus word.
    #[error("controller port is {port_bits} bits wide but the SoC bus needs at least {bus_bits}")]
    WidthMismatch {
        /// Derived port data width in bits.
        port_bits: u32,
        /// SoC bus data width in bits.
        bus_bits: u32,
    },

    /// The controller's native port is wider than the lane masks can describe.
    #[error("controller port is {port_bits} bits wide; at most {max_bits} bits are supported")]
    PortTooWide {
        /// Derived port data width in bits.
        port_bits: u32,
        /// Largest supported width.
        max_bits: u32,
    },

    /// A memory region size is not a power of two.
    #[error("region `{name}` size {size:#x} is not a power of two")]
    NotPowerOfTwo {
        /// Region owner.
        name: String,
        /// Offending size in bytes.
        size: u64,
    },

    /// A memory region base is not aligned to its size.
    #[error("region `{name}` base {base:#x} is not aligned to its size {size:#x}")]
    Misaligned {
        /// Region owner.
        name: String,
        /// Region base address.
        base: u64,
        /// Region size in bytes.
        size: u64,
    },

    /// Two memory regions overlap.
    #[error("region `{name}` overlaps region `{other}`")]
    Overlap {
        /// Region being registered.
        name: String,
        /// Region already present.
        other: String,
    },

    /// A memory region owner was registered twice.
    #[error("region `{0}` is already registered")]
    DuplicateRegion(String),

    /// The alternate-protocol adapter cannot frame a line into a legal burst.
    #[error("cannot frame a {line_bytes}-byte line into {beat_bits}-bit beats: {reason}")]
    BurstLength {
        /// Line (port word) size in bytes.
        line_bytes: u64,
        /// Requested beat width in bits.
        beat_bits: u32,
        /// Why the framing is malformed.
        reason: &'static str,
    },

    /// Controller geometry is unusable.
    #[error("invalid SDRAM geometry: {0}")]
    Geometry(String),

    /// CSR data width is not supported by this composition.
    #[error("CSR data width {0} is unsupported: SDRAM initialization with a CPU requires 8")]
    CsrDataWidth(u32),

    /// Two components claim the same CSR bank, or one component claims two.
    #[error("CSR bank conflict: {0}")]
    CsrBank(String),

    /// Timer counter width outside 1..=32 bits.
    #[error("timer width {0} is outside 1..=32 bits")]
    TimerWidth(u32),

    /// L2 cache size that cannot be rounded to a supported power of two.
    #[error("L2 cache size {0:#x} exceeds the {max:#x}-byte limit", max = MAX_CACHE_SIZE)]
    CacheSize(u64),

    /// A bus master name was registered twice.
    #[error("bus master `{0}` is already registered")]
    DuplicateMaster(String),

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Contract violation by a bus master or debug requester.
///
/// The offending request is rejected and the component state is left exactly as it was.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    /// A master submitted a new transaction while it still holds the grant.
    #[error("master {0} submitted a transaction while holding the grant")]
    ResubmitWhileGranted(usize),

    /// A master submitted while its previous request is still pending.
    #[error("master {0} already has a pending request")]
    AlreadyPending(usize),

    /// The master index does not name a registered port.
    #[error("no master port with index {0}")]
    UnknownMaster(usize),

    /// The transaction asserts strobe without active, or is not active at all.
    #[error("malformed transaction: strobe requires active")]
    Malformed,

    /// A completion arrived while no live grant exists.
    #[error("completion delivered with no live grant")]
    NoGrant,

    /// The requester changed the bus signals while a debug session is live.
    #[error("requester changed the transaction mid-handshake")]
    RequestChanged,
}

/// Runtime error asserted by a downstream target.
///
/// The fabric never retries; a master receives this unchanged inside
/// [`Completion::Error`](crate::common::Completion::Error).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum BusError {
    /// No region decodes this bus word address.
    #[error("bus address {0:#x} is not mapped")]
    Unmapped(u32),

    /// The port address does not fit the controller's address width.
    #[error("port address {address:#x} exceeds the {width}-bit port address space")]
    OutOfRange {
        /// Port word address.
        address: u64,
        /// Port address width in bits.
        width: u32,
    },
}
