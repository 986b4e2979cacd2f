//! Configuration-time sizing of the memory subsystem.
//!
//! Everything here is derived once, before wiring, from the SDRAM geometry and the
//! cache settings. It provides:
//! 1. **Port width:** DFI data width times phases, rounded down to a power of two.
//! 2. **Main RAM size:** Capacity addressed by the geometry, capped at the region limit.
//! 3. **Port address width:** Port words needed to cover main RAM.
//! 4. **Cache size:** Configured minimum raised to two port words, then to a power of two.

use crate::common::bits::{exact_log2, floor_power_of_two, next_power_of_two};
use crate::common::constants::{BUS_DATA_WIDTH, MAIN_RAM_SIZE_LIMIT, MAX_PORT_WIDTH};
use crate::common::ConfigError;
use crate::config::{MemoryType, SdramGeometry, SocConfig};

/// L2 cache size for a given configured minimum and port width.
///
/// # Arguments
///
/// * `configured` - Configured minimum size in bytes.
/// * `port_bytes` - Downstream port width in bytes.
///
/// # Returns
///
/// `next_power_of_two(max(configured, 2 * port_bytes))`.
pub const fn cache_size(configured: u64, port_bytes: u64) -> u64 {
    let floor = 2 * port_bytes;
    let effective_min = if configured > floor { configured } else { floor };
    next_power_of_two(effective_min)
}

/// Data width in bits of the controller's native port.
pub fn port_data_width(geometry: &SdramGeometry, memtype: MemoryType) -> u32 {
    let dfi_bits = match memtype {
        MemoryType::Sdr => geometry.data_bits,
        MemoryType::Ddr => 2 * geometry.data_bits,
    };
    floor_power_of_two(u64::from(dfi_bits) * u64::from(geometry.phases)) as u32
}

/// Main RAM size in bytes: `2^(bank + row + col) * data_bits / 8`, capped.
pub fn main_ram_size(geometry: &SdramGeometry) -> u64 {
    let words = 1u64 << (geometry.bank_bits + geometry.row_bits + geometry.col_bits);
    let size = words.saturating_mul(u64::from(geometry.data_bits / 8));
    size.min(MAIN_RAM_SIZE_LIMIT)
}

/// Every size the memory subsystem needs, derived in one place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubsystemPlan {
    /// Native port data width in bits.
    pub port_data_width: u32,
    /// Native port address width in bits (port word addresses).
    pub port_address_width: u32,
    /// Main RAM size in bytes.
    pub main_ram_size: u64,
    /// L2 cache size in bytes.
    pub cache_size: u64,
}

impl SubsystemPlan {
    /// Derives the plan and checks that the port can serve the SoC bus.
    ///
    /// # Returns
    ///
    /// `WidthMismatch` if the port is narrower than a bus word, `PortTooWide` if it exceeds
    /// what a lane mask can describe, and `Geometry` if the port is wider than main RAM.
    pub fn derive(config: &SocConfig) -> Result<Self, ConfigError> {
        let geometry = &config.sdram.geometry;
        let port_data_width = port_data_width(geometry, config.sdram.memtype);
        if port_data_width < BUS_DATA_WIDTH {
            return Err(ConfigError::WidthMismatch {
                port_bits: port_data_width,
                bus_bits: BUS_DATA_WIDTH,
            });
        }
        if port_data_width > MAX_PORT_WIDTH {
            return Err(ConfigError::PortTooWide {
                port_bits: port_data_width,
                max_bits: MAX_PORT_WIDTH,
            });
        }

        let port_bytes = u64::from(port_data_width / 8);
        let main_ram_size = main_ram_size(geometry);
        if main_ram_size < port_bytes {
            return Err(ConfigError::Geometry(format!(
                "main RAM of {main_ram_size} bytes is smaller than one {port_bytes}-byte port word"
            )));
        }
        let port_address_width = exact_log2(main_ram_size / port_bytes).ok_or_else(|| {
            ConfigError::Geometry(format!(
                "main RAM size {main_ram_size:#x} is not a whole power of two of port words"
            ))
        })?;

        Ok(Self {
            port_data_width,
            port_address_width,
            main_ram_size,
            cache_size: cache_size(config.cache.min_size, port_bytes),
        })
    }

    /// Native port width in bytes.
    pub const fn port_bytes(&self) -> u64 {
        (self.port_data_width / 8) as u64
    }

    /// Number of lines in the direct-mapped L2 cache.
    pub const fn cache_lines(&self) -> u64 {
        self.cache_size / self.port_bytes()
    }
}
