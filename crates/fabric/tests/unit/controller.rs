//! Memory controller tests.
//!
//! Verifies the fixed and row-buffer latency models, the controller's native port, and
//! the sparse backing store.

use pretty_assertions::assert_eq;
use socfabric_core::common::BusError;
use socfabric_core::config::{ControllerTiming, SdramConfig, SocConfig};
use socfabric_core::soc::memory::controller::{FixedLatency, LatencyModel, RowBufferLatency};
use socfabric_core::soc::memory::{MemoryController, NativePort, SparseStorage};
use socfabric_core::soc::sizing::SubsystemPlan;

fn dram_timing() -> SdramConfig {
    SdramConfig {
        timing: ControllerTiming::Dram,
        t_cas: 5,
        t_ras: 10,
        t_pre: 8,
        ..SdramConfig::default()
    }
}

// ══════════════════════════════════════════════════════════
// 1. Latency models
// ══════════════════════════════════════════════════════════

#[test]
fn fixed_latency_is_address_independent() {
    let mut model = FixedLatency::new(7);
    assert_eq!(model.access_latency(0), 7);
    assert_eq!(model.access_latency(0x1000_0000), 7);
}

#[test]
fn row_buffer_cold_hit_and_conflict() {
    // 16-bit module words, 10 column bits, 3 bank bits: one row spans 2 KiB per bank,
    // and the next row of bank 0 starts 16 KiB later.
    let mut model = RowBufferLatency::new(&dram_timing());

    assert_eq!(model.access_latency(0), 15, "closed bank: t_ras + t_cas");
    assert_eq!(model.access_latency(0x2), 5, "open row: t_cas");
    assert_eq!(model.access_latency(0x7FE), 5, "same row, last column");
    assert_eq!(model.access_latency(0x4000), 23, "row conflict: t_pre + t_ras + t_cas");
    assert_eq!(model.access_latency(0x4002), 5);
}

#[test]
fn row_buffer_tracks_banks_independently() {
    let mut model = RowBufferLatency::new(&dram_timing());
    assert_eq!(model.access_latency(0), 15);
    // Column bits exhausted: next bank.
    assert_eq!(model.access_latency(0x800), 15);
    assert_eq!(model.access_latency(0x0), 5);
    assert_eq!(model.access_latency(0x800), 5);
}

// ══════════════════════════════════════════════════════════
// 2. Controller port
// ══════════════════════════════════════════════════════════

fn controller(sdram: &SdramConfig) -> MemoryController {
    let plan = SubsystemPlan::derive(&SocConfig::default()).unwrap();
    MemoryController::new(sdram, &plan)
}

#[test]
fn port_geometry_matches_plan() {
    let port = controller(&SdramConfig::default());
    assert_eq!(port.data_width(), 128);
    assert_eq!(port.address_width(), 24);
    assert_eq!(port.data_bytes(), 16);
    assert_eq!(port.storage().len(), 256 << 20);
}

#[test]
fn byte_enables_select_written_bytes() {
    let mut port = controller(&SdramConfig::default());
    let _ = port.write(9, &[0xFF; 16], 0xFFFF).unwrap();
    let latency = port.write(9, &[0x11; 16], 0x00F0).unwrap();
    assert_eq!(latency, 8);

    let (data, _) = port.read(9).unwrap();
    let expected: Vec<u8> = (0..16)
        .map(|i| if (4..8).contains(&i) { 0x11 } else { 0xFF })
        .collect();
    assert_eq!(data, expected);

    let stats = port.stats();
    assert_eq!((stats.reads, stats.writes, stats.busy_cycles), (1, 2, 24));
}

#[test]
fn address_beyond_port_width_is_out_of_range() {
    let mut port = controller(&SdramConfig::default());
    assert_eq!(
        port.read(1 << 24).unwrap_err(),
        BusError::OutOfRange {
            address: 1 << 24,
            width: 24
        }
    );
    assert_eq!(port.stats().reads, 0);
}

#[test]
fn dram_timing_is_applied_per_access() {
    let mut port = controller(&dram_timing());
    let (_, cold) = port.read(0).unwrap();
    let (_, hit) = port.read(1).unwrap();
    assert_eq!((cold, hit), (15, 5));
}

// ══════════════════════════════════════════════════════════
// 3. Sparse storage
// ══════════════════════════════════════════════════════════

#[test]
fn unwritten_storage_reads_zero_without_allocating() {
    let storage = SparseStorage::new(1 << 30);
    let mut buf = [0xAA; 8];
    storage.read(0x1234_5678, &mut buf);
    assert_eq!(buf, [0; 8]);
    assert_eq!(storage.resident_pages(), 0);
}

#[test]
fn writes_allocate_only_touched_pages() {
    let mut storage = SparseStorage::new(1 << 20);
    storage.write(0xFFE, &[1, 2, 3, 4], 0xF);
    assert_eq!(storage.resident_pages(), 2);

    let mut buf = [0; 4];
    storage.read(0xFFE, &mut buf);
    assert_eq!(buf, [1, 2, 3, 4]);
}

#[test]
fn load_truncates_to_capacity() {
    let mut storage = SparseStorage::new(8);
    storage.load(4, &[9; 16]);
    let mut buf = [0; 8];
    storage.read(0, &mut buf);
    assert_eq!(buf, [0, 0, 0, 0, 9, 9, 9, 9]);
}
