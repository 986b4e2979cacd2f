//! Direct-mapped L2 cache between the arbitrated bus and the protocol bridge.
//!
//! This module implements the cache stage of the memory subsystem. Lines are exactly one
//! native port word wide, so every fill, write-back and write-through is a single
//! `LineTransfer`. It models:
//! 1. **Reads:** A hit returns cached data; a miss fills the line first.
//! 2. **Writes:** Allocate on miss in both policies. Write-back marks the line dirty and
//!    writes it back on eviction; write-through forwards the lanes immediately.
//! 3. **Full memory write-enable:** When enabled, every write covers the whole bus word.

use tracing::{debug, trace};

use crate::common::bits::lane_mask;
use crate::common::constants::{BUS_WORD_BYTES, SEL_ALL};
use crate::common::{BusError, LineTransfer, Transaction};
use crate::config::{CacheConfig, WritePolicy};

/// Anything that can move a port-width line: the protocol bridge, or a test double.
pub trait LineTarget {
    /// Performs one line transfer.
    ///
    /// # Returns
    ///
    /// The transfer with read data filled in, and the cycles it took.
    fn transfer(&mut self, xfer: LineTransfer) -> Result<(LineTransfer, u64), BusError>;
}

/// Cache line: tag, one port word of data, and validity/dirty bits.
#[derive(Clone, Debug, Default)]
struct CacheLine {
    tag: u64,
    valid: bool,
    dirty: bool,
    data: Vec<u8>,
}

/// Counters kept by the cache stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Accesses served from a valid line.
    pub hits: u64,
    /// Accesses that needed a fill.
    pub misses: u64,
    /// Lines fetched from downstream.
    pub fills: u64,
    /// Dirty lines written back (eviction or flush).
    pub writebacks: u64,
    /// Writes forwarded under the write-through policy.
    pub write_throughs: u64,
}

/// Direct-mapped, one-line-per-port-word cache.
#[derive(Clone, Debug)]
pub struct CacheStage {
    lines: Vec<CacheLine>,
    line_bytes: usize,
    latency: u64,
    write_policy: WritePolicy,
    full_memory_we: bool,
    stats: CacheStats,
}

impl CacheStage {
    /// Creates an empty cache.
    ///
    /// # Arguments
    ///
    /// * `size_bytes` - Derived cache size (power of two, at least two lines).
    /// * `line_bytes` - Native port width in bytes.
    /// * `config` - Write policy and hit latency.
    /// * `full_memory_we` - Whether every write covers the whole bus word.
    pub fn new(size_bytes: u64, line_bytes: usize, config: &CacheConfig, full_memory_we: bool) -> Self {
        let line_count = (size_bytes / line_bytes as u64).max(1) as usize;
        Self {
            lines: vec![
                CacheLine {
                    data: vec![0; line_bytes],
                    ..CacheLine::default()
                };
                line_count
            ],
            line_bytes,
            latency: config.latency,
            write_policy: config.write_policy,
            full_memory_we,
            stats: CacheStats::default(),
        }
    }

    /// Total capacity in bytes.
    pub fn size(&self) -> u64 {
        (self.lines.len() * self.line_bytes) as u64
    }

    /// Line width in bytes.
    pub const fn line_bytes(&self) -> usize {
        self.line_bytes
    }

    /// Write policy in effect.
    pub const fn write_policy(&self) -> WritePolicy {
        self.write_policy
    }

    /// Whether the full-memory-write-enable transform is applied.
    pub const fn full_memory_we(&self) -> bool {
        self.full_memory_we
    }

    /// Counters.
    pub const fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Returns `true` if the line holding `offset` is resident.
    pub fn contains(&self, offset: u64) -> bool {
        let (index, tag, _) = self.locate(offset);
        let line = &self.lines[index];
        line.valid && line.tag == tag
    }

    /// Returns `true` if the line holding `offset` is resident and dirty.
    pub fn is_dirty(&self, offset: u64) -> bool {
        let (index, _, _) = self.locate(offset);
        self.contains(offset) && self.lines[index].dirty
    }

    /// Splits a main-RAM byte offset into line index, tag, and byte lane.
    fn locate(&self, offset: u64) -> (usize, u64, usize) {
        let port_address = offset / self.line_bytes as u64;
        let count = self.lines.len() as u64;
        (
            (port_address % count) as usize,
            port_address / count,
            (offset % self.line_bytes as u64) as usize,
        )
    }

    fn port_address(&self, index: usize, tag: u64) -> u64 {
        tag * self.lines.len() as u64 + index as u64
    }

    /// Makes the line for `(index, tag)` resident, evicting and filling as needed.
    ///
    /// # Returns
    ///
    /// The downstream cycles spent (zero on a hit).
    fn ensure_line(
        &mut self,
        index: usize,
        tag: u64,
        downstream: &mut dyn LineTarget,
    ) -> Result<u64, BusError> {
        let line = &self.lines[index];
        if line.valid && line.tag == tag {
            self.stats.hits += 1;
            return Ok(0);
        }
        self.stats.misses += 1;

        let mut cycles = 0;
        if line.valid && line.dirty {
            let victim = self.port_address(index, line.tag);
            debug!(victim, index, "evicting dirty line");
            let xfer = LineTransfer::write(
                victim,
                line.data.clone(),
                LineTransfer::full_mask(self.line_bytes),
            );
            cycles += downstream.transfer(xfer)?.1;
            self.lines[index].dirty = false;
            self.stats.writebacks += 1;
        }

        let address = self.port_address(index, tag);
        let (filled, fill_cycles) =
            downstream.transfer(LineTransfer::read(address, self.line_bytes))?;
        cycles += fill_cycles;
        self.stats.fills += 1;

        let mut data = filled.data;
        data.resize(self.line_bytes, 0);
        self.lines[index] = CacheLine {
            tag,
            valid: true,
            dirty: false,
            data,
        };
        trace!(address, index, "line filled");
        Ok(cycles)
    }

    /// Serves one bus transaction.
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset of the addressed bus word within main RAM.
    /// * `txn` - The granted transaction.
    /// * `downstream` - Where fills and write-backs go.
    ///
    /// # Returns
    ///
    /// `(read_data, cycles)`; `read_data` is zero for writes. Downstream errors propagate
    /// unmodified.
    pub fn access(
        &mut self,
        offset: u64,
        txn: &Transaction,
        downstream: &mut dyn LineTarget,
    ) -> Result<(u32, u64), BusError> {
        let offset = offset & !(BUS_WORD_BYTES - 1);
        let (index, tag, lane) = self.locate(offset);
        let mut cycles = self.ensure_line(index, tag, downstream)? + self.latency;

        if !txn.is_write() {
            let mut word = [0u8; 4];
            word.copy_from_slice(&self.lines[index].data[lane..lane + 4]);
            return Ok((u32::from_le_bytes(word), cycles));
        }

        let select = if self.full_memory_we {
            SEL_ALL
        } else {
            txn.byte_select
        };
        let mut data = self.lines[index].data.clone();
        for (i, byte) in txn.write_data.to_le_bytes().into_iter().enumerate() {
            if select & (1 << i) != 0 {
                data[lane + i] = byte;
            }
        }

        match self.write_policy {
            WritePolicy::WriteBack => {
                self.lines[index].data = data;
                self.lines[index].dirty = true;
            }
            WritePolicy::WriteThrough => {
                let address = self.port_address(index, tag);
                let xfer = LineTransfer::write(address, data.clone(), lane_mask(select, lane));
                cycles += downstream.transfer(xfer)?.1;
                self.stats.write_throughs += 1;
                self.lines[index].data = data;
            }
        }
        Ok((0, cycles))
    }

    /// Writes back every dirty line; lines stay resident and become clean.
    ///
    /// # Returns
    ///
    /// The downstream cycles spent.
    pub fn flush(&mut self, downstream: &mut dyn LineTarget) -> Result<u64, BusError> {
        let mut cycles = 0;
        for index in 0..self.lines.len() {
            let line = &self.lines[index];
            if !(line.valid && line.dirty) {
                continue;
            }
            let xfer = LineTransfer::write(
                self.port_address(index, line.tag),
                line.data.clone(),
                LineTransfer::full_mask(self.line_bytes),
            );
            cycles += downstream.transfer(xfer)?.1;
            self.lines[index].dirty = false;
            self.stats.writebacks += 1;
        }
        debug!(cycles, "cache flushed");
        Ok(cycles)
    }
}
