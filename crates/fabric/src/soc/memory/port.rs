//! Native port of the SDRAM controller.

use super::controller::ControllerStats;
use crate::common::BusError;

/// The controller's native user port, one port word per access.
///
/// Addresses are port word addresses. Every access reports how many cycles it took.
pub trait NativePort {
    /// Port data width in bits.
    fn data_width(&self) -> u32;

    /// Port address width in bits.
    fn address_width(&self) -> u32;

    /// Reads one port word.
    ///
    /// # Returns
    ///
    /// The word's bytes (little-endian lane order) and the access latency in cycles.
    fn read(&mut self, address: u64) -> Result<(Vec<u8>, u64), BusError>;

    /// Writes the enabled bytes of one port word.
    ///
    /// # Arguments
    ///
    /// * `address` - Port word address.
    /// * `data` - One port word of data.
    /// * `byte_enable` - One bit per byte of `data`.
    ///
    /// # Returns
    ///
    /// The access latency in cycles.
    fn write(&mut self, address: u64, data: &[u8], byte_enable: u64) -> Result<u64, BusError>;

    /// Number of bytes in one port word.
    fn data_bytes(&self) -> usize {
        (self.data_width() / 8) as usize
    }

    /// Access counters; ports that keep none report zeros.
    fn stats(&self) -> ControllerStats {
        ControllerStats::default()
    }
}
