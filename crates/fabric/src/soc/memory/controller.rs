//! SDRAM controller model: native port, backing storage, and latency.
//!
//! This module provides:
//! 1. **FixedLatency:** Every access takes the same number of cycles.
//! 2. **RowBufferLatency:** Per-bank open-row tracking with CAS, RAS, and precharge costs.
//! 3. **MemoryController:** The native port seen by the protocol bridge, built from geometry.

use tracing::trace;

use super::port::NativePort;
use super::storage::SparseStorage;
use crate::common::BusError;
use crate::config::{ControllerTiming, SdramConfig};
use crate::soc::sizing::SubsystemPlan;

/// Latency model applied to every native-port access.
pub trait LatencyModel {
    /// Returns the number of cycles required for an access to the given byte offset.
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset into main RAM (used for row-buffer modeling).
    fn access_latency(&mut self, offset: u64) -> u64;
}

/// Fixed-latency model.
#[derive(Clone, Copy, Debug)]
pub struct FixedLatency {
    latency: u64,
}

impl FixedLatency {
    /// Creates a model charging `latency` cycles per access.
    pub const fn new(latency: u64) -> Self {
        Self { latency }
    }
}

impl LatencyModel for FixedLatency {
    fn access_latency(&mut self, _offset: u64) -> u64 {
        self.latency
    }
}

/// Row-buffer model with one open row per bank.
///
/// Module words are decoded as `row | bank | column`, most significant first.
#[derive(Clone, Debug)]
pub struct RowBufferLatency {
    open_rows: Vec<Option<u64>>,
    t_cas: u64,
    t_ras: u64,
    t_pre: u64,
    word_shift: u32,
    col_bits: u32,
    bank_bits: u32,
}

impl RowBufferLatency {
    /// Creates a row-buffer model for the controller's geometry, with every bank closed.
    pub fn new(sdram: &SdramConfig) -> Self {
        let geometry = &sdram.geometry;
        Self {
            open_rows: vec![None; 1 << geometry.bank_bits],
            t_cas: sdram.t_cas,
            t_ras: sdram.t_ras,
            t_pre: sdram.t_pre,
            word_shift: (geometry.data_bits / 8).trailing_zeros(),
            col_bits: geometry.col_bits,
            bank_bits: geometry.bank_bits,
        }
    }
}

impl LatencyModel for RowBufferLatency {
    fn access_latency(&mut self, offset: u64) -> u64 {
        let word = offset >> self.word_shift;
        let bank = ((word >> self.col_bits) & ((1 << self.bank_bits) - 1)) as usize;
        let row = word >> (self.col_bits + self.bank_bits);
        let open = &mut self.open_rows[bank];
        match *open {
            Some(current) if current == row => self.t_cas,
            Some(_) => {
                *open = Some(row);
                self.t_pre + self.t_ras + self.t_cas
            }
            None => {
                *open = Some(row);
                self.t_ras + self.t_cas
            }
        }
    }
}

/// Access counters kept by the controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerStats {
    /// Port word reads served.
    pub reads: u64,
    /// Port word writes served.
    pub writes: u64,
    /// Cycles spent serving accesses.
    pub busy_cycles: u64,
}

/// Functional model of the SDRAM controller behind its native port.
pub struct MemoryController {
    storage: SparseStorage,
    timing: Box<dyn LatencyModel + Send>,
    data_width: u32,
    address_width: u32,
    stats: ControllerStats,
}

impl std::fmt::Debug for MemoryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryController")
            .field("data_width", &self.data_width)
            .field("address_width", &self.address_width)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl MemoryController {
    /// Builds the controller for a derived plan.
    ///
    /// # Arguments
    ///
    /// * `sdram` - Controller configuration (timing model and latencies).
    /// * `plan` - Derived port width, address width, and main RAM size.
    pub fn new(sdram: &SdramConfig, plan: &SubsystemPlan) -> Self {
        let timing: Box<dyn LatencyModel + Send> = match sdram.timing {
            ControllerTiming::Simple => Box::new(FixedLatency::new(sdram.fixed_latency)),
            ControllerTiming::Dram => Box::new(RowBufferLatency::new(sdram)),
        };
        Self {
            storage: SparseStorage::new(plan.main_ram_size),
            timing,
            data_width: plan.port_data_width,
            address_width: plan.port_address_width,
            stats: ControllerStats::default(),
        }
    }

    /// Backing storage, for inspection and image loading.
    pub const fn storage(&self) -> &SparseStorage {
        &self.storage
    }

    /// Mutable backing storage.
    pub fn storage_mut(&mut self) -> &mut SparseStorage {
        &mut self.storage
    }

    fn offset_of(&self, address: u64) -> Result<u64, BusError> {
        if address >> self.address_width != 0 {
            return Err(BusError::OutOfRange {
                address,
                width: self.address_width,
            });
        }
        Ok(address * self.data_bytes() as u64)
    }
}

impl NativePort for MemoryController {
    fn data_width(&self) -> u32 {
        self.data_width
    }

    fn address_width(&self) -> u32 {
        self.address_width
    }

    fn stats(&self) -> ControllerStats {
        self.stats
    }

    fn read(&mut self, address: u64) -> Result<(Vec<u8>, u64), BusError> {
        let offset = self.offset_of(address)?;
        let mut data = vec![0; self.data_bytes()];
        self.storage.read(offset, &mut data);
        let latency = self.timing.access_latency(offset);
        self.stats.reads += 1;
        self.stats.busy_cycles += latency;
        trace!(address, latency, "native read");
        Ok((data, latency))
    }

    fn write(&mut self, address: u64, data: &[u8], byte_enable: u64) -> Result<u64, BusError> {
        let offset = self.offset_of(address)?;
        let width = self.data_bytes().min(data.len());
        self.storage.write(offset, &data[..width], byte_enable);
        let latency = self.timing.access_latency(offset);
        self.stats.writes += 1;
        self.stats.busy_cycles += latency;
        trace!(address, byte_enable, latency, "native write");
        Ok(latency)
    }
}
