//! Configuration parsing and validation tests.

use pretty_assertions::assert_eq;
use rstest::rstest;
use socfabric_core::common::ConfigError;
use socfabric_core::config::{
    ArbitrationPolicy, BridgeMode, ControllerTiming, MemoryType, SocConfig, TargetFamily,
    WritePolicy,
};

#[test]
fn empty_document_yields_defaults() {
    let config = SocConfig::from_json("{}").unwrap();
    assert_eq!(config.bus.arbitration, ArbitrationPolicy::FixedPriority);
    assert_eq!(config.mem_map.main_ram, 0x4000_0000);
    assert_eq!(config.cache.min_size, 8192);
    assert_eq!(config.cache.write_policy, WritePolicy::WriteBack);
    assert_eq!(config.bridge.mode, BridgeMode::Native);
    assert_eq!(config.sdram.memtype, MemoryType::Ddr);
    assert_eq!(config.sdram.timing, ControllerTiming::Simple);
    assert_eq!(config.csr.data_width, 8);
    assert_eq!(config.csr.banks.get("timer0"), Some(&11));
    assert!(config.debug.is_none());
    assert!(config.timer.is_none());
    assert!(config.with_cpu);
    config.validate().unwrap();
}

#[test]
fn nested_sections_override_defaults() {
    let json = r#"{
        "bus": { "arbitration": "RoundRobin" },
        "sdram": { "timing": "DRAM", "t_cas": 4, "geometry": { "data_bits": 32 } },
        "bridge": { "mode": "AXI", "beat_width": 64 },
        "target": "XilinxVivado",
        "timer": { "width": 24 },
        "debug": {}
    }"#;
    let config = SocConfig::from_json(json).unwrap();
    assert_eq!(config.bus.arbitration, ArbitrationPolicy::RoundRobin);
    assert_eq!(config.sdram.timing, ControllerTiming::Dram);
    assert_eq!(config.sdram.t_cas, 4);
    assert_eq!(config.sdram.t_ras, 6);
    assert_eq!(config.sdram.geometry.data_bits, 32);
    assert_eq!(config.sdram.geometry.row_bits, 14);
    assert_eq!(config.bridge.beat_width, Some(64));
    assert_eq!(config.target, TargetFamily::XilinxVivado);
    assert_eq!(config.timer.map(|t| t.width), Some(24));
    assert_eq!(config.debug.map(|d| d.port_latency), Some(2));
}

#[rstest]
#[case(r#"{ "cache": { "write_policy": "WriteAround" } }"#)]
#[case(r#"{ "debug": { "variant": "SoftReset" } }"#)]
#[case(r#"{ "mem_map": { "main_ram": "high" } }"#)]
#[case("not json")]
fn malformed_documents_are_parse_errors(#[case] json: &str) {
    assert!(matches!(SocConfig::from_json(json), Err(ConfigError::Parse(_))));
}

#[test]
fn full_memory_we_only_applies_on_vivado() {
    let mut config = SocConfig::default();
    assert!(config.cache.full_memory_we);
    assert!(!config.full_memory_we());
    config.target = TargetFamily::XilinxVivado;
    assert!(config.full_memory_we());
    config.cache.full_memory_we = false;
    assert!(!config.full_memory_we());
}

#[rstest]
#[case(16, true)]
#[case(32, true)]
#[case(12, false)]
fn csr_width_is_checked(#[case] width: u32, #[case] with_cpu: bool) {
    let mut config = SocConfig::default();
    config.csr.data_width = width;
    config.with_cpu = with_cpu;
    assert_eq!(config.validate(), Err(ConfigError::CsrDataWidth(width)));
}

#[test]
fn wide_csr_bus_is_allowed_without_cpu() {
    let mut config = SocConfig::default();
    config.csr.data_width = 32;
    config.with_cpu = false;
    config.validate().unwrap();
}

#[test]
fn shared_and_out_of_range_banks_are_rejected() {
    let mut config = SocConfig::default();
    let _ = config.csr.banks.insert("uart".into(), 11);
    assert!(matches!(config.validate(), Err(ConfigError::CsrBank(_))));

    let mut config = SocConfig::default();
    let _ = config.csr.banks.insert("uart".into(), 32);
    assert!(matches!(config.validate(), Err(ConfigError::CsrBank(_))));
}

#[rstest]
#[case(0)]
#[case(33)]
fn timer_width_is_bounded(#[case] width: u32) {
    let json = format!(r#"{{ "timer": {{ "width": {width} }} }}"#);
    let config = SocConfig::from_json(&json).unwrap();
    assert_eq!(config.validate(), Err(ConfigError::TimerWidth(width)));
}

#[rstest]
#[case(u64::MAX)]
#[case((1 << 63) + 1)]
#[case(1 << 40)]
#[case(0x2000_0001)]
fn oversized_cache_is_rejected(#[case] min_size: u64) {
    let json = format!(r#"{{ "cache": {{ "min_size": {min_size} }} }}"#);
    let config = SocConfig::from_json(&json).unwrap();
    assert_eq!(config.validate(), Err(ConfigError::CacheSize(min_size)));
    assert!(matches!(
        socfabric_core::SocBuilder::new(&config),
        Err(ConfigError::CacheSize(_))
    ));
}

#[test]
fn largest_cache_is_accepted() {
    let mut config = SocConfig::default();
    config.cache.min_size = 0x2000_0000;
    config.validate().unwrap();
}

#[test]
fn unusable_geometry_is_rejected() {
    let mut config = SocConfig::default();
    config.sdram.geometry.data_bits = 12;
    assert!(matches!(config.validate(), Err(ConfigError::Geometry(_))));

    let mut config = SocConfig::default();
    config.sdram.geometry.address_bits = 8;
    assert!(matches!(config.validate(), Err(ConfigError::Geometry(_))));
}
