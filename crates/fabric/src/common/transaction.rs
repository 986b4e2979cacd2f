//! Bus transaction types.
//!
//! This module defines the values that travel across the fabric. It provides:
//! 1. **Transaction:** One read or write on the 32-bit arbitrated bus, with its cycle/strobe flags.
//! 2. **Completion:** The ack or err a master receives for a granted transaction.
//! 3. **LineTransfer:** The wide, port-sized unit exchanged between the cache and the bridge.

use super::constants::{BUS_WORD_BYTES, SEL_ALL};
use super::error::BusError;

/// Direction of a bus transaction (the `writeEnable` signal).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Master reads from the target.
    #[default]
    Read,
    /// Master writes to the target.
    Write,
}

/// Burst-type tag (the Wishbone cycle type identifier).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BurstType {
    /// Single classic cycle.
    #[default]
    Classic,
    /// Burst to a constant address.
    ConstantAddress,
    /// Burst with incrementing addresses.
    Incrementing,
    /// Last beat of a burst.
    EndOfBurst,
}

impl BurstType {
    /// Returns the 3-bit encoding carried on the bus.
    pub const fn encoding(self) -> u8 {
        match self {
            Self::Classic => 0b000,
            Self::ConstantAddress => 0b001,
            Self::Incrementing => 0b010,
            Self::EndOfBurst => 0b111,
        }
    }
}

/// One exchange on the arbitrated bus.
///
/// `address` is a word address: the byte address divided by the 4-byte bus word.
/// A transaction is well-formed only while `active` (the cycle signal) is asserted,
/// and `strobe` never appears without `active`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    /// Word address.
    pub address: u32,
    /// Byte lanes taking part in the transfer (bit 0 = least significant byte).
    pub byte_select: u8,
    /// Read or write.
    pub direction: Direction,
    /// Data driven by the master on writes.
    pub write_data: u32,
    /// Data returned by the target; filled on completion.
    pub read_data: u32,
    /// Burst-type tag.
    pub burst: BurstType,
    /// Cycle signal.
    pub active: bool,
    /// Strobe signal.
    pub strobe: bool,
}

impl Transaction {
    /// Builds an active, strobed full-word read.
    pub const fn read(address: u32) -> Self {
        Self {
            address,
            byte_select: SEL_ALL,
            direction: Direction::Read,
            write_data: 0,
            read_data: 0,
            burst: BurstType::Classic,
            active: true,
            strobe: true,
        }
    }

    /// Builds an active, strobed full-word write.
    pub const fn write(address: u32, data: u32) -> Self {
        Self::write_masked(address, data, SEL_ALL)
    }

    /// Builds an active, strobed write touching only the lanes in `byte_select`.
    pub const fn write_masked(address: u32, data: u32, byte_select: u8) -> Self {
        Self {
            address,
            byte_select: byte_select & SEL_ALL,
            direction: Direction::Write,
            write_data: data,
            read_data: 0,
            burst: BurstType::Classic,
            active: true,
            strobe: true,
        }
    }

    /// Returns the idle bus: nothing active, nothing strobed.
    pub const fn idle() -> Self {
        Self {
            address: 0,
            byte_select: 0,
            direction: Direction::Read,
            write_data: 0,
            read_data: 0,
            burst: BurstType::Classic,
            active: false,
            strobe: false,
        }
    }

    /// Returns a copy carrying a different burst tag.
    #[must_use]
    pub const fn with_burst(mut self, burst: BurstType) -> Self {
        self.burst = burst;
        self
    }

    /// Returns `true` if the flags obey the `strobe ⇒ active` rule.
    pub const fn is_well_formed(&self) -> bool {
        !self.strobe || self.active
    }

    /// Returns `true` if the transaction is requesting service this cycle.
    pub const fn is_requesting(&self) -> bool {
        self.active && self.strobe
    }

    /// Returns `true` for writes.
    pub const fn is_write(&self) -> bool {
        matches!(self.direction, Direction::Write)
    }

    /// Byte address of the addressed word.
    pub const fn byte_address(&self) -> u64 {
        self.address as u64 * BUS_WORD_BYTES
    }

    /// Returns `true` when both transactions describe the same request.
    ///
    /// Flags and returned data are ignored.
    pub fn same_request(&self, other: &Self) -> bool {
        self.address == other.address
            && self.direction == other.direction
            && self.byte_select == other.byte_select
            && (self.direction == Direction::Read || self.write_data == other.write_data)
    }
}

/// Outcome of a granted transaction as seen by its master (`ack` or `err`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// Target acknowledged; `data` is the read data (zero for writes).
    Ack {
        /// Read data.
        data: u32,
    },
    /// Target asserted `err`.
    Error(BusError),
}

impl Completion {
    /// Returns `true` for an acknowledgement.
    pub const fn is_ack(&self) -> bool {
        matches!(self, Self::Ack { .. })
    }

    /// Returns the read data of an acknowledgement.
    pub const fn data(&self) -> Option<u32> {
        match self {
            Self::Ack { data } => Some(*data),
            Self::Error(_) => None,
        }
    }
}

/// A port-width transfer between the cache and the protocol bridge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineTransfer {
    /// Port word address (byte address divided by the port width in bytes).
    pub address: u64,
    /// Read (fill) or write (write-back / write-through).
    pub direction: Direction,
    /// Exactly one port word of data; read transfers come back filled.
    pub data: Vec<u8>,
    /// One bit per byte of `data`; only enabled bytes are written.
    pub byte_enable: u64,
}

impl LineTransfer {
    /// Builds a fill request for one port word.
    pub fn read(address: u64, line_bytes: usize) -> Self {
        Self {
            address,
            direction: Direction::Read,
            data: vec![0; line_bytes],
            byte_enable: 0,
        }
    }

    /// Builds a write of `data` with the given byte enables.
    pub const fn write(address: u64, data: Vec<u8>, byte_enable: u64) -> Self {
        Self {
            address,
            direction: Direction::Write,
            data,
            byte_enable,
        }
    }

    /// Mask with every byte of a `line_bytes`-wide word enabled.
    pub const fn full_mask(line_bytes: usize) -> u64 {
        if line_bytes >= 64 {
            u64::MAX
        } else {
            (1u64 << line_bytes) - 1
        }
    }
}
