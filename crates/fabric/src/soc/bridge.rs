//! Protocol bridge between the L2 cache and the controller's native port.
//!
//! This module implements the bridge the cache writes lines through. It provides:
//! 1. **Native mode:** One line transfer becomes one native port access.
//! 2. **AXI mode:** A line transfer is framed into an incrementing burst over a byte address
//!    space, and every beat is converted back into a native access on the right lanes.
//! 3. **Setup checks:** Burst framing is validated once, so a malformed burst is a
//!    configuration error and never a run-time one.

use tracing::{debug, trace};

use crate::common::bits::exact_log2;
use crate::common::constants::MAX_BURST_BEATS;
use crate::common::{BusError, ConfigError, Direction, LineTransfer};
use crate::config::{BridgeConfig, BridgeMode};
use crate::soc::cache::LineTarget;
use crate::soc::memory::NativePort;

/// AXI burst type (`AxBURST`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AxiBurstKind {
    /// Fixed address.
    Fixed,
    /// Incrementing address.
    Incr,
    /// Wrapping address.
    Wrap,
}

/// One write-data beat (`W` channel) or read-data beat (`R` channel).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AxiBeat {
    /// Beat data, `beat_bytes` long.
    pub data: Vec<u8>,
    /// Write strobe, one bit per byte of `data`.
    pub strb: u64,
}

/// A framed burst: the address channel request plus its data beats.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AxiBurst {
    /// Byte address of the first beat.
    pub address: u64,
    /// `AxLEN`: number of beats minus one.
    pub len: u8,
    /// `AxSIZE`: log2 of the beat width in bytes.
    pub size: u8,
    /// `AxBURST`.
    pub kind: AxiBurstKind,
    /// Write beats; empty for reads.
    pub beats: Vec<AxiBeat>,
}

impl AxiBurst {
    /// Number of beats in the burst.
    pub fn beat_count(&self) -> u64 {
        u64::from(self.len) + 1
    }
}

/// Frames line transfers into bursts and converts beats back into native accesses.
///
/// Byte address width is `port.address_width + log2(port_bytes)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxiAdapter {
    address_width: u32,
    port_bytes: u64,
    beat_bytes: u64,
}

impl AxiAdapter {
    /// Validates the framing for a port and builds the adapter.
    ///
    /// # Arguments
    ///
    /// * `port_data_width` - Native port data width in bits.
    /// * `port_address_width` - Native port address width in bits.
    /// * `beat_width` - Beat width in bits; `None` uses the port width.
    ///
    /// # Returns
    ///
    /// `ConfigError::BurstLength` if the beat width is not a power of two, is narrower than a
    /// byte, is wider than the port, or needs more than 256 beats per line.
    pub fn new(
        port_data_width: u32,
        port_address_width: u32,
        beat_width: Option<u32>,
    ) -> Result<Self, ConfigError> {
        let port_bytes = u64::from(port_data_width / 8);
        let beat_bits = beat_width.unwrap_or(port_data_width);
        let malformed = |reason| ConfigError::BurstLength {
            line_bytes: port_bytes,
            beat_bits,
            reason,
        };

        if beat_bits < 8 {
            return Err(malformed("beats must be at least one byte wide"));
        }
        if !beat_bits.is_power_of_two() {
            return Err(malformed("beat width is not a power of two"));
        }
        if beat_bits > port_data_width {
            return Err(malformed("beats are wider than the native port"));
        }
        let beat_bytes = u64::from(beat_bits / 8);
        if port_bytes / beat_bytes > MAX_BURST_BEATS {
            return Err(malformed("a line needs more than 256 beats"));
        }
        let Some(lane_bits) = exact_log2(port_bytes) else {
            return Err(malformed("port width is not a power of two"));
        };

        Ok(Self {
            address_width: port_address_width + lane_bits,
            port_bytes,
            beat_bytes,
        })
    }

    /// Width of the burst byte address space in bits.
    pub const fn address_width(&self) -> u32 {
        self.address_width
    }

    /// Beat width in bytes.
    pub const fn beat_bytes(&self) -> u64 {
        self.beat_bytes
    }

    /// Beats needed to move one line.
    pub const fn beats_per_line(&self) -> u64 {
        self.port_bytes / self.beat_bytes
    }

    /// Frames a line transfer into a burst.
    pub fn frame(&self, xfer: &LineTransfer) -> Result<AxiBurst, BusError> {
        let address = xfer.address * self.port_bytes;
        if address >> self.address_width != 0 {
            return Err(BusError::OutOfRange {
                address,
                width: self.address_width,
            });
        }

        let beats = match xfer.direction {
            Direction::Read => Vec::new(),
            Direction::Write => xfer
                .data
                .chunks(self.beat_bytes as usize)
                .enumerate()
                .map(|(i, chunk)| AxiBeat {
                    data: chunk.to_vec(),
                    strb: (xfer.byte_enable >> (i as u64 * self.beat_bytes))
                        & LineTransfer::full_mask(self.beat_bytes as usize),
                })
                .collect(),
        };

        Ok(AxiBurst {
            address,
            len: (self.beats_per_line() - 1) as u8,
            size: self.beat_bytes.trailing_zeros() as u8,
            kind: AxiBurstKind::Incr,
            beats,
        })
    }

    /// Runs a framed burst against the native port, one access per beat.
    ///
    /// # Returns
    ///
    /// The read beats (empty for writes) and the total cycles spent.
    pub fn execute(
        &self,
        burst: &AxiBurst,
        is_write: bool,
        port: &mut dyn NativePort,
    ) -> Result<(Vec<AxiBeat>, u64), BusError> {
        let mut cycles = 0;
        let mut read_beats = Vec::new();
        let lane_mask = LineTransfer::full_mask(self.beat_bytes as usize);

        for beat_idx in 0..burst.beat_count() {
            let byte_address = burst.address + beat_idx * self.beat_bytes;
            let port_address = byte_address / self.port_bytes;
            let lane = byte_address % self.port_bytes;

            if is_write {
                let Some(beat) = burst.beats.get(beat_idx as usize) else {
                    break;
                };
                if beat.strb == 0 {
                    continue;
                }
                let mut word = vec![0; self.port_bytes as usize];
                for (dst, &src) in word[lane as usize..].iter_mut().zip(&beat.data) {
                    *dst = src;
                }
                cycles += port.write(port_address, &word, (beat.strb & lane_mask) << lane)?;
            } else {
                let (word, latency) = port.read(port_address)?;
                cycles += latency;
                read_beats.push(AxiBeat {
                    data: word[lane as usize..(lane + self.beat_bytes) as usize].to_vec(),
                    strb: lane_mask,
                });
            }
        }

        trace!(
            address = burst.address,
            beats = burst.beat_count(),
            cycles,
            "burst executed"
        );
        Ok((read_beats, cycles))
    }
}

/// Active bridging protocol.
#[derive(Clone, Copy, Debug)]
enum Mode {
    Native,
    Axi(AxiAdapter),
}

/// Bridge from cache line transfers to the controller's native port.
pub struct ProtocolBridge {
    mode: Mode,
    port: Box<dyn NativePort + Send>,
    transfers: u64,
}

impl std::fmt::Debug for ProtocolBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolBridge")
            .field("mode", &self.mode)
            .field("transfers", &self.transfers)
            .finish_non_exhaustive()
    }
}

impl ProtocolBridge {
    /// Builds a bridge in the configured mode in front of `port`.
    ///
    /// # Returns
    ///
    /// `ConfigError::BurstLength` when AXI mode cannot frame a port word.
    pub fn new(config: &BridgeConfig, port: Box<dyn NativePort + Send>) -> Result<Self, ConfigError> {
        let mode = match config.mode {
            BridgeMode::Native => Mode::Native,
            BridgeMode::Axi => Mode::Axi(AxiAdapter::new(
                port.data_width(),
                port.address_width(),
                config.beat_width,
            )?),
        };
        debug!(?mode, port_bits = port.data_width(), "protocol bridge configured");
        Ok(Self {
            mode,
            port,
            transfers: 0,
        })
    }

    /// The configured mode.
    pub const fn mode(&self) -> BridgeMode {
        match self.mode {
            Mode::Native => BridgeMode::Native,
            Mode::Axi(_) => BridgeMode::Axi,
        }
    }

    /// The AXI adapter, when in AXI mode.
    pub const fn axi(&self) -> Option<&AxiAdapter> {
        match &self.mode {
            Mode::Native => None,
            Mode::Axi(adapter) => Some(adapter),
        }
    }

    /// The native port behind the bridge.
    pub fn port(&self) -> &dyn NativePort {
        &*self.port
    }

    /// Mutable native port.
    pub fn port_mut(&mut self) -> &mut dyn NativePort {
        &mut *self.port
    }

    /// Line transfers forwarded so far.
    pub const fn transfers(&self) -> u64 {
        self.transfers
    }

    /// Forwards one line transfer to the controller.
    ///
    /// # Returns
    ///
    /// The transfer with read data filled in, and the cycles spent downstream.
    /// Errors from the port propagate unmodified.
    pub fn forward(&mut self, mut xfer: LineTransfer) -> Result<(LineTransfer, u64), BusError> {
        self.transfers += 1;
        let cycles = match self.mode {
            Mode::Native => match xfer.direction {
                Direction::Read => {
                    let (data, latency) = self.port.read(xfer.address)?;
                    xfer.data = data;
                    latency
                }
                Direction::Write => self.port.write(xfer.address, &xfer.data, xfer.byte_enable)?,
            },
            Mode::Axi(adapter) => {
                let burst = adapter.frame(&xfer)?;
                let is_write = xfer.direction == Direction::Write;
                let (beats, latency) = adapter.execute(&burst, is_write, &mut *self.port)?;
                if !is_write {
                    xfer.data = beats.into_iter().flat_map(|beat| beat.data).collect();
                }
                latency
            }
        };
        Ok((xfer, cycles))
    }
}

impl LineTarget for ProtocolBridge {
    fn transfer(&mut self, xfer: LineTransfer) -> Result<(LineTransfer, u64), BusError> {
        self.forward(xfer)
    }
}
