//! Configuration for the SoC fabric.
//!
//! This module defines every structure and enum used to parameterize composition. It provides:
//! 1. **Defaults:** Baseline memory map, SDRAM geometry, cache, and timing constants.
//! 2. **Structures:** Hierarchical config for bus, memory map, SDRAM, cache, bridge, CSR, debug, and timer.
//! 3. **Enums:** Arbitration policy, write policy, bridge mode, target family, and debug variant.
//! 4. **Validation:** `SocConfig::validate`, run once before any wiring.
//!
//! Configuration is supplied as JSON (see `SocConfig::from_json`) or built with `SocConfig::default()`.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::common::constants::{CSR_BANKS, MAX_CACHE_SIZE};
use crate::common::ConfigError;

/// Default configuration constants for the fabric.
///
/// These values define the baseline composition when a field is not
/// explicitly present in the configuration document.
mod defaults {
    /// Base address of main RAM.
    pub const MAIN_RAM_BASE: u64 = 0x4000_0000;

    /// Base address of the CSR region.
    pub const CSR_BASE: u64 = 0x8200_0000;

    /// Base address of the debug transport window.
    pub const DEBUG_BASE: u64 = 0xF00F_0000;

    /// Configured L2 cache size in bytes before the sizing policy is applied.
    pub const L2_SIZE: u64 = 8192;

    /// L2 hit latency in cycles.
    pub const CACHE_LATENCY: u64 = 1;

    /// SDRAM address pins.
    pub const ADDRESS_BITS: u32 = 14;

    /// SDRAM bank address bits.
    pub const BANK_BITS: u32 = 3;

    /// SDRAM row address bits.
    pub const ROW_BITS: u32 = 14;

    /// SDRAM column address bits.
    pub const COL_BITS: u32 = 10;

    /// SDRAM module data width in bits.
    pub const DATA_BITS: u32 = 16;

    /// Number of DFI phases.
    pub const PHASES: u32 = 4;

    /// Fixed controller latency in cycles.
    pub const FIXED_LATENCY: u64 = 8;

    /// CAS latency in controller cycles.
    pub const T_CAS: u64 = 6;

    /// RAS latency in controller cycles.
    pub const T_RAS: u64 = 6;

    /// Precharge latency in controller cycles.
    pub const T_PRE: u64 = 6;

    /// CSR bus data width in bits.
    pub const CSR_DATA_WIDTH: u32 = 8;

    /// Cycles the debug register interface takes to answer a command.
    pub const DEBUG_PORT_LATENCY: u32 = 2;

    /// Timer counter width in bits.
    pub const TIMER_WIDTH: u32 = 32;
}

/// Policy used by the arbiter when no grant is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ArbitrationPolicy {
    /// Lowest-index requesting master wins.
    #[default]
    FixedPriority,
    /// Search starts at the master after the one granted last.
    RoundRobin,
}

/// Write handling in the L2 cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum WritePolicy {
    /// Writes update the line and mark it dirty; dirty lines are written back on eviction.
    #[default]
    WriteBack,
    /// Writes update the line and are forwarded downstream immediately.
    WriteThrough,
}

/// Protocol used between the L2 cache and the memory controller port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BridgeMode {
    /// Direct translation onto the controller's native port.
    #[default]
    Native,
    /// Burst-addressed streaming requests converted back to native accesses.
    #[serde(alias = "AXI")]
    Axi,
}

/// Latency model of the memory controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ControllerTiming {
    /// Every access takes `fixed_latency` cycles.
    #[default]
    Simple,
    /// Row-buffer-aware latency (CAS, RAS, precharge).
    #[serde(alias = "DRAM")]
    Dram,
}

/// SDRAM data rate; determines the DFI data width per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemoryType {
    /// Single data rate: DFI width equals module width.
    Sdr,
    /// Double data rate: DFI width is twice the module width.
    #[default]
    Ddr,
}

/// Synthesis target family. Only used to pick compatibility defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TargetFamily {
    /// No family-specific workaround.
    #[default]
    Generic,
    /// Xilinx parts built with Vivado; cannot map byte-enable L2 memories correctly.
    XilinxVivado,
    /// Xilinx parts built with ISE.
    XilinxIse,
    /// Lattice parts built with Diamond.
    LatticeDiamond,
}

/// Debug bridge variant.
///
/// Only the bus-mapped variant with a tied reset line exists. The legacy soft-reset
/// variant is intentionally not offered, so naming it fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DebugVariant {
    /// Registers decoded from the bus address; reset never driven by the bridge.
    #[default]
    BusMapped,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use socfabric_core::config::{BridgeMode, SocConfig, WritePolicy};
///
/// let json = r#"{
///     "cache": { "min_size": 4096, "write_policy": "WriteThrough" },
///     "bridge": { "mode": "Axi" },
///     "debug": { "port_latency": 1 }
/// }"#;
///
/// let config = SocConfig::from_json(json).unwrap();
/// assert_eq!(config.cache.min_size, 4096);
/// assert_eq!(config.cache.write_policy, WritePolicy::WriteThrough);
/// assert_eq!(config.bridge.mode, BridgeMode::Axi);
/// assert!(config.debug.is_some());
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SocConfig {
    /// Arbitrated bus settings.
    #[serde(default)]
    pub bus: BusConfig,
    /// Region base addresses.
    #[serde(default)]
    pub mem_map: MemMapConfig,
    /// SDRAM controller geometry and timing.
    #[serde(default)]
    pub sdram: SdramConfig,
    /// L2 cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Cache-to-controller bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Synthesis target family.
    #[serde(default)]
    pub target: TargetFamily,
    /// CSR bus settings.
    #[serde(default)]
    pub csr: CsrConfig,
    /// Debug transport bridge; absent means no debug channel.
    #[serde(default)]
    pub debug: Option<DebugConfig>,
    /// Timer peripheral; absent means no timer.
    #[serde(default)]
    pub timer: Option<TimerConfig>,
    /// Whether a CPU is part of the SoC (enables the CSR width check).
    #[serde(default = "SocConfig::default_with_cpu")]
    pub with_cpu: bool,
}

impl SocConfig {
    fn default_with_cpu() -> bool {
        true
    }

    /// Parses a JSON configuration document.
    ///
    /// # Arguments
    ///
    /// * `json` - Configuration text; every field is optional.
    ///
    /// # Returns
    ///
    /// The parsed configuration, or `ConfigError::Parse` with the parser's message.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validates everything that can be checked without wiring.
    ///
    /// Checks the CSR data width, CSR bank assignments, SDRAM geometry, L2 cache size, and
    /// timer width.
    /// Width matching between the port and the bus is checked when the controller
    /// is registered, since it depends on derived geometry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.csr.validate(self.with_cpu)?;
        self.sdram.geometry.validate()?;
        let cache_size = self.cache.min_size.checked_next_power_of_two();
        if cache_size.is_none_or(|size| size > MAX_CACHE_SIZE) {
            return Err(ConfigError::CacheSize(self.cache.min_size));
        }
        if let Some(timer) = self.timer {
            if timer.width == 0 || timer.width > 32 {
                return Err(ConfigError::TimerWidth(timer.width));
            }
        }
        Ok(())
    }

    /// Whether the full-memory-write-enable transform applies to the L2 cache.
    ///
    /// The flag only takes effect on the Xilinx Vivado family.
    pub fn full_memory_we(&self) -> bool {
        self.cache.full_memory_we && self.target == TargetFamily::XilinxVivado
    }
}

impl Default for SocConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            mem_map: MemMapConfig::default(),
            sdram: SdramConfig::default(),
            cache: CacheConfig::default(),
            bridge: BridgeConfig::default(),
            target: TargetFamily::default(),
            csr: CsrConfig::default(),
            debug: None,
            timer: None,
            with_cpu: true,
        }
    }
}

/// Arbitrated bus settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BusConfig {
    /// Grant selection policy.
    #[serde(default)]
    pub arbitration: ArbitrationPolicy,
}

/// Base addresses of the fabric's regions.
#[derive(Debug, Clone, Deserialize)]
pub struct MemMapConfig {
    /// Main RAM base address.
    #[serde(default = "MemMapConfig::default_main_ram")]
    pub main_ram: u64,
    /// CSR region base address.
    #[serde(default = "MemMapConfig::default_csr")]
    pub csr: u64,
    /// Debug transport window base address.
    #[serde(default = "MemMapConfig::default_debug")]
    pub debug: u64,
}

impl MemMapConfig {
    fn default_main_ram() -> u64 {
        defaults::MAIN_RAM_BASE
    }

    fn default_csr() -> u64 {
        defaults::CSR_BASE
    }

    fn default_debug() -> u64 {
        defaults::DEBUG_BASE
    }
}

impl Default for MemMapConfig {
    fn default() -> Self {
        Self {
            main_ram: defaults::MAIN_RAM_BASE,
            csr: defaults::CSR_BASE,
            debug: defaults::DEBUG_BASE,
        }
    }
}

/// SDRAM controller geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SdramGeometry {
    /// Address pins.
    #[serde(default = "SdramGeometry::default_address_bits")]
    pub address_bits: u32,
    /// Bank address bits.
    #[serde(default = "SdramGeometry::default_bank_bits")]
    pub bank_bits: u32,
    /// Row address bits.
    #[serde(default = "SdramGeometry::default_row_bits")]
    pub row_bits: u32,
    /// Column address bits.
    #[serde(default = "SdramGeometry::default_col_bits")]
    pub col_bits: u32,
    /// Module data width in bits.
    #[serde(default = "SdramGeometry::default_data_bits")]
    pub data_bits: u32,
    /// Number of ranks.
    #[serde(default = "SdramGeometry::default_ranks")]
    pub ranks: u32,
    /// Number of DFI phases.
    #[serde(default = "SdramGeometry::default_phases")]
    pub phases: u32,
}

impl SdramGeometry {
    fn default_address_bits() -> u32 {
        defaults::ADDRESS_BITS
    }

    fn default_bank_bits() -> u32 {
        defaults::BANK_BITS
    }

    fn default_row_bits() -> u32 {
        defaults::ROW_BITS
    }

    fn default_col_bits() -> u32 {
        defaults::COL_BITS
    }

    fn default_data_bits() -> u32 {
        defaults::DATA_BITS
    }

    fn default_ranks() -> u32 {
        1
    }

    fn default_phases() -> u32 {
        defaults::PHASES
    }

    /// Rejects geometries that cannot describe a memory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.row_bits == 0 || self.col_bits == 0 {
            return Err(ConfigError::Geometry(
                "row and column bits must be non-zero".into(),
            ));
        }
        if self.data_bits == 0 || self.data_bits % 8 != 0 {
            return Err(ConfigError::Geometry(format!(
                "data width {} is not a whole number of bytes",
                self.data_bits
            )));
        }
        if self.phases == 0 || self.ranks == 0 {
            return Err(ConfigError::Geometry(
                "phases and ranks must be non-zero".into(),
            ));
        }
        if self.address_bits < self.row_bits.max(self.col_bits) {
            return Err(ConfigError::Geometry(format!(
                "{} address pins cannot carry {} row / {} column bits",
                self.address_bits, self.row_bits, self.col_bits
            )));
        }
        if self.bank_bits + self.row_bits + self.col_bits > 40 {
            return Err(ConfigError::Geometry(
                "more than 2^40 addressable words".into(),
            ));
        }
        Ok(())
    }
}

impl Default for SdramGeometry {
    fn default() -> Self {
        Self {
            address_bits: defaults::ADDRESS_BITS,
            bank_bits: defaults::BANK_BITS,
            row_bits: defaults::ROW_BITS,
            col_bits: defaults::COL_BITS,
            data_bits: defaults::DATA_BITS,
            ranks: 1,
            phases: defaults::PHASES,
        }
    }
}

/// SDRAM controller configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SdramConfig {
    /// Controller geometry.
    #[serde(default)]
    pub geometry: SdramGeometry,
    /// Data rate.
    #[serde(default)]
    pub memtype: MemoryType,
    /// Latency model.
    #[serde(default)]
    pub timing: ControllerTiming,
    /// Latency of every access under `ControllerTiming::Simple`.
    #[serde(default = "SdramConfig::default_fixed_latency")]
    pub fixed_latency: u64,
    /// CAS latency (column access strobe).
    #[serde(default = "SdramConfig::default_t_cas")]
    pub t_cas: u64,
    /// RAS latency (row access strobe).
    #[serde(default = "SdramConfig::default_t_ras")]
    pub t_ras: u64,
    /// Precharge latency.
    #[serde(default = "SdramConfig::default_t_pre")]
    pub t_pre: u64,
}

impl SdramConfig {
    fn default_fixed_latency() -> u64 {
        defaults::FIXED_LATENCY
    }

    fn default_t_cas() -> u64 {
        defaults::T_CAS
    }

    fn default_t_ras() -> u64 {
        defaults::T_RAS
    }

    fn default_t_pre() -> u64 {
        defaults::T_PRE
    }
}

impl Default for SdramConfig {
    fn default() -> Self {
        Self {
            geometry: SdramGeometry::default(),
            memtype: MemoryType::default(),
            timing: ControllerTiming::default(),
            fixed_latency: defaults::FIXED_LATENCY,
            t_cas: defaults::T_CAS,
            t_ras: defaults::T_RAS,
            t_pre: defaults::T_PRE,
        }
    }
}

/// L2 cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Configured size in bytes; raised to two port words and rounded to a power of two.
    #[serde(default = "CacheConfig::default_min_size")]
    pub min_size: u64,
    /// Write handling.
    #[serde(default)]
    pub write_policy: WritePolicy,
    /// Hit latency in cycles.
    #[serde(default = "CacheConfig::default_latency")]
    pub latency: u64,
    /// Request the full-memory-write-enable transform (effective on Vivado only).
    #[serde(default = "CacheConfig::default_full_memory_we")]
    pub full_memory_we: bool,
}

impl CacheConfig {
    fn default_min_size() -> u64 {
        defaults::L2_SIZE
    }

    fn default_latency() -> u64 {
        defaults::CACHE_LATENCY
    }

    fn default_full_memory_we() -> bool {
        true
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            min_size: defaults::L2_SIZE,
            write_policy: WritePolicy::default(),
            latency: defaults::CACHE_LATENCY,
            full_memory_we: true,
        }
    }
}

/// Cache-to-controller bridge configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct BridgeConfig {
    /// Bridging protocol.
    #[serde(default)]
    pub mode: BridgeMode,
    /// Beat width of the alternate protocol in bits; defaults to the port width.
    #[serde(default)]
    pub beat_width: Option<u32>,
}

/// CSR bus configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CsrConfig {
    /// CSR bus data width in bits.
    #[serde(default = "CsrConfig::default_data_width")]
    pub data_width: u32,
    /// Bank number per component name.
    #[serde(default = "CsrConfig::default_banks")]
    pub banks: BTreeMap<String, u32>,
}

impl CsrConfig {
    fn default_data_width() -> u32 {
        defaults::CSR_DATA_WIDTH
    }

    fn default_banks() -> BTreeMap<String, u32> {
        [("sdram", 8), ("l2_cache", 9), ("debug", 10), ("timer0", 11)]
            .into_iter()
            .map(|(name, bank)| (name.to_string(), bank))
            .collect()
    }

    /// Checks the data width, that every bank exists, and that no two components share one.
    pub fn validate(&self, with_cpu: bool) -> Result<(), ConfigError> {
        if !matches!(self.data_width, 8 | 16 | 32) {
            return Err(ConfigError::CsrDataWidth(self.data_width));
        }
        if with_cpu && self.data_width != 8 {
            return Err(ConfigError::CsrDataWidth(self.data_width));
        }
        let mut seen: BTreeMap<u32, &str> = BTreeMap::new();
        for (name, bank) in &self.banks {
            if *bank >= CSR_BANKS {
                return Err(ConfigError::CsrBank(format!(
                    "bank {bank} of `{name}` is outside the {} banks of the CSR region",
                    CSR_BANKS
                )));
            }
            if let Some(other) = seen.insert(*bank, name) {
                return Err(ConfigError::CsrBank(format!(
                    "bank {bank} assigned to both `{other}` and `{name}`"
                )));
            }
        }
        Ok(())
    }
}

impl Default for CsrConfig {
    fn default() -> Self {
        Self {
            data_width: defaults::CSR_DATA_WIDTH,
            banks: Self::default_banks(),
        }
    }
}

/// Debug transport bridge configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DebugConfig {
    /// Bridge variant.
    #[serde(default)]
    pub variant: DebugVariant,
    /// Cycles the core's debug register interface takes to answer a command.
    #[serde(default = "DebugConfig::default_port_latency")]
    pub port_latency: u32,
}

impl DebugConfig {
    fn default_port_latency() -> u32 {
        defaults::DEBUG_PORT_LATENCY
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            variant: DebugVariant::default(),
            port_latency: defaults::DEBUG_PORT_LATENCY,
        }
    }
}

/// Timer peripheral configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TimerConfig {
    /// Counter width in bits (1..=32).
    #[serde(default = "TimerConfig::default_width")]
    pub width: u32,
}

impl TimerConfig {
    fn default_width() -> u32 {
        defaults::TIMER_WIDTH
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            width: defaults::TIMER_WIDTH,
        }
    }
}
