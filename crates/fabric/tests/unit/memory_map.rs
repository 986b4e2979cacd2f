//! Memory map registration tests.

use pretty_assertions::assert_eq;
use socfabric_core::common::ConfigError;
use socfabric_core::soc::memory_map::MemoryMap;

#[test]
fn regions_are_sorted_and_decoded() {
    let mut map = MemoryMap::new();
    map.add("csr", 0x8200_0000, 0x1_0000).unwrap();
    map.add("main_ram", 0x4000_0000, 0x1000_0000).unwrap();

    let owners: Vec<_> = map.regions().iter().map(|r| r.owner.as_str()).collect();
    assert_eq!(owners, vec!["main_ram", "csr"]);
    assert_eq!(map.decode(0x4FFF_FFFF).map(|r| r.owner.as_str()), Some("main_ram"));
    assert_eq!(map.decode(0x5000_0000), None);
    assert_eq!(map.region("csr").map(|r| r.end()), Some(0x8201_0000));
}

#[test]
fn duplicate_owner_is_rejected() {
    let mut map = MemoryMap::new();
    map.add("rom", 0, 0x1000).unwrap();
    assert_eq!(
        map.add("rom", 0x10_0000, 0x1000),
        Err(ConfigError::DuplicateRegion("rom".into()))
    );
}

#[test]
fn size_must_be_a_power_of_two() {
    let mut map = MemoryMap::new();
    assert_eq!(
        map.add("sram", 0, 0x3000),
        Err(ConfigError::NotPowerOfTwo {
            name: "sram".into(),
            size: 0x3000
        })
    );
    assert!(map.add("zero", 0, 0).is_err());
}

#[test]
fn base_must_be_aligned_to_size() {
    let mut map = MemoryMap::new();
    assert_eq!(
        map.add("sram", 0x1000, 0x2000),
        Err(ConfigError::Misaligned {
            name: "sram".into(),
            base: 0x1000,
            size: 0x2000
        })
    );
}

#[test]
fn overlapping_regions_are_rejected_and_map_is_unchanged() {
    let mut map = MemoryMap::new();
    map.add("main_ram", 0x4000_0000, 0x1000_0000).unwrap();
    assert_eq!(
        map.add("debug", 0x4800_0000, 0x100),
        Err(ConfigError::Overlap {
            name: "debug".into(),
            other: "main_ram".into()
        })
    );
    assert_eq!(map.regions().len(), 1);
    // Adjacent is fine.
    map.add("debug", 0x5000_0000, 0x100).unwrap();
}
