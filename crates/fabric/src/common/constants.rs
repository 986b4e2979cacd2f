//! Fabric-wide constants.
//!
//! This module defines the fixed parameters of the arbitrated bus and the debug window. It includes:
//! 1. **Bus Constants:** Data width, word size and byte-select layout of the 32-bit bus.
//! 2. **Debug Constants:** Register offsets, address mask and the invalid-selector sentinel.
//! 3. **Sizing Limits:** Caps applied while deriving memory and port geometry.

/// Data width of the arbitrated SoC bus in bits.
pub const BUS_DATA_WIDTH: u32 = 32;

/// Bytes carried by one bus word.
pub const BUS_WORD_BYTES: u64 = (BUS_DATA_WIDTH / 8) as u64;

/// Number of bits to shift to convert between bus word addresses and byte addresses.
pub const BUS_WORD_SHIFT: u32 = 2;

/// Byte-select mask with every lane of a bus word enabled.
pub const SEL_ALL: u8 = 0b1111;

/// Upper bound on derived main RAM size (512 MiB).
pub const MAIN_RAM_SIZE_LIMIT: u64 = 0x2000_0000;

/// Upper bound on the L2 cache size after rounding; no larger than main RAM can be.
pub const MAX_CACHE_SIZE: u64 = MAIN_RAM_SIZE_LIMIT;

/// Widest downstream port the lane masks can describe (64 bytes).
pub const MAX_PORT_WIDTH: u32 = 512;

/// Longest burst the alternate-protocol adapter may frame.
pub const MAX_BURST_BEATS: u64 = 256;

/// Mask applied to the raw word address before it becomes a debug register address.
pub const DEBUG_ADDRESS_MASK: u32 = 0x3F;

/// Debug register holding the core control/status word.
pub const DEBUG_CORE: u8 = 0x00;

/// Debug register used for instruction injection and result readback.
pub const DEBUG_DATA: u8 = 0x04;

/// Write-only control register: writing a selector pulls that register back.
pub const DEBUG_REFRESH: u8 = 0x08;

/// Value written into register A when a refresh names an unknown register.
pub const DEBUG_INVALID_SENTINEL: u32 = 0xFEED_BEEF;

/// Size in bytes of one CSR bank.
pub const CSR_BANK_SIZE: u64 = 0x800;

/// Number of banks in the CSR region.
pub const CSR_BANKS: u32 = 32;
