//! SoC composition tests.
//!
//! Verifies the builder's error cases and the layout it records: memory map, CSR banks,
//! and constants.

use crate::common::harness::{compose, fast_config, full_config};
use pretty_assertions::assert_eq;
use socfabric_core::common::ConfigError;
use socfabric_core::config::{BridgeMode, MemoryType, SocConfig};
use socfabric_core::soc::SocBuilder;

#[test]
fn second_controller_is_rejected() {
    let mut builder = SocBuilder::new(&SocConfig::default()).unwrap();
    let _ = builder.register_sdram().unwrap();
    assert_eq!(builder.register_sdram(), Err(ConfigError::DuplicateController));
}

#[test]
fn finalize_without_controller_is_rejected() {
    let mut builder = SocBuilder::new(&SocConfig::default()).unwrap();
    let _ = builder.add_master("cpu").unwrap();
    assert!(matches!(
        builder.finalize(),
        Err(ConfigError::MissingController)
    ));
}

#[test]
fn duplicate_master_is_rejected() {
    let mut builder = SocBuilder::new(&SocConfig::default()).unwrap();
    assert_eq!(builder.add_master("cpu").map(|id| id.index()), Ok(0));
    assert_eq!(builder.add_master("dma").map(|id| id.index()), Ok(1));
    assert_eq!(
        builder.add_master("cpu"),
        Err(ConfigError::DuplicateMaster("cpu".into()))
    );
}

#[test]
fn narrow_controller_is_rejected_at_registration() {
    let mut config = SocConfig::default();
    config.sdram.memtype = MemoryType::Sdr;
    config.sdram.geometry.data_bits = 8;
    config.sdram.geometry.phases = 1;
    let mut builder = SocBuilder::new(&config).unwrap();
    assert!(matches!(
        builder.register_sdram(),
        Err(ConfigError::WidthMismatch { port_bits: 8, .. })
    ));
}

#[test]
fn invalid_config_is_rejected_before_composition() {
    let mut config = SocConfig::default();
    config.csr.data_width = 16;
    assert!(matches!(
        SocBuilder::new(&config),
        Err(ConfigError::CsrDataWidth(16))
    ));
}

#[test]
fn component_without_bank_is_rejected() {
    let mut config = full_config();
    let _ = config.csr.banks.remove("debug");
    let mut builder = SocBuilder::new(&config).unwrap();
    let _ = builder.register_sdram().unwrap();
    assert!(matches!(builder.finalize(), Err(ConfigError::CsrBank(_))));
}

#[test]
fn malformed_axi_burst_fails_composition() {
    let mut config = SocConfig::default();
    config.bridge.mode = BridgeMode::Axi;
    config.bridge.beat_width = Some(256);
    let mut builder = SocBuilder::new(&config).unwrap();
    let _ = builder.register_sdram().unwrap();
    assert!(matches!(
        builder.finalize(),
        Err(ConfigError::BurstLength { .. })
    ));
}

#[test]
fn overlapping_regions_fail_composition() {
    let mut config = full_config();
    config.mem_map.debug = config.mem_map.main_ram;
    let mut builder = SocBuilder::new(&config).unwrap();
    let _ = builder.register_sdram().unwrap();
    assert!(matches!(
        builder.finalize(),
        Err(ConfigError::Overlap { .. })
    ));
}

#[test]
fn memory_map_lists_every_region() {
    let (soc, _) = compose(&full_config(), &["cpu"]);
    let regions: Vec<_> = soc
        .memory_map()
        .regions()
        .iter()
        .map(|r| (r.owner.as_str(), r.base, r.size))
        .collect();
    assert_eq!(
        regions,
        vec![
            ("main_ram", 0x4000_0000, 256 << 20),
            ("csr", 0x8200_0000, 0x1_0000),
            ("debug", 0xF00F_0000, 0x100),
        ]
    );
}

#[test]
fn debug_window_is_absent_without_debug_channel() {
    let (soc, _) = compose(&fast_config(), &["cpu"]);
    assert!(soc.memory_map().region("debug").is_none());
    assert!(soc.debug_bridge().is_none());
    assert!(soc.debug_output().is_none());
}

#[test]
fn constants_and_banks_are_recorded() {
    let (soc, _) = compose(&full_config(), &["cpu"]);
    let csr = soc.csr_map();
    assert_eq!(csr.constant("L2_SIZE"), Some(8192));
    assert_eq!(csr.constant("MAIN_RAM_BASE"), Some(0x4000_0000));
    assert_eq!(csr.constant("MAIN_RAM_SIZE"), Some(256 << 20));
    assert_eq!(csr.constant("SDRAM_PORT_WIDTH"), Some(128));
    assert_eq!(csr.constant("CSR_DATA_WIDTH"), Some(8));
    assert_eq!(csr.banks().get("debug"), Some(&10));
    assert_eq!(csr.banks().get("timer0"), Some(&11));
    assert!(csr.register("debug", "counter").is_some());
}

#[test]
fn masters_are_looked_up_by_name() {
    let (soc, ids) = compose(&fast_config(), &["cpu", "dma"]);
    assert_eq!(soc.masters().to_vec(), vec!["cpu".to_string(), "dma".to_string()]);
    assert_eq!(soc.master("dma"), Some(ids[1]));
    assert_eq!(soc.master("gpu"), None);
}
