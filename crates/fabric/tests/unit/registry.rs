//! CSR layout tests.
//!
//! Registers are placed in their component's bank on a 4-byte stride and split into
//! bus-width words, most significant first.

use pretty_assertions::assert_eq;
use socfabric_core::common::ConfigError;
use socfabric_core::soc::registry::{CsrMap, CsrRegister, RegisterSurface};
use socfabric_core::soc::timer::Timer;

const BASE: u64 = 0x8200_0000;

fn timer_map(data_width: u32) -> CsrMap {
    let mut map = CsrMap::new(BASE, data_width);
    map.add_component("timer0", 11, &Timer::new(32).csr_registers())
        .unwrap();
    map
}

#[test]
fn registers_are_laid_out_in_the_bank() {
    let map = timer_map(8);
    let bank = BASE + 11 * 0x800;

    let load = map.register("timer0", "load").unwrap();
    assert_eq!((load.address, load.words), (bank, 4));
    let reload = map.register("timer0", "reload").unwrap();
    assert_eq!(reload.address, bank + 16);
    let en = map.register("timer0", "en").unwrap();
    assert_eq!((en.address, en.words), (bank + 32, 1));
    assert_eq!(map.banks().get("timer0"), Some(&11));
}

#[test]
fn wide_bus_needs_one_word_per_register() {
    let map = timer_map(32);
    assert!(map.entries().iter().all(|e| e.words == 1));
    let reload = map.register("timer0", "reload").unwrap();
    assert_eq!(reload.address, BASE + 11 * 0x800 + 4);
}

#[test]
fn words_are_sliced_most_significant_first() {
    let map = timer_map(8);
    let load = map.register("timer0", "load").unwrap().address;

    let first = map.decode(load).unwrap();
    let second = map.decode(load + 4).unwrap();
    let last = map.decode(load + 12).unwrap();
    assert_eq!(first.extract(0x1122_3344), 0x11);
    assert_eq!(second.extract(0x1122_3344), 0x22);
    assert_eq!(last.extract(0x1122_3344), 0x44);
    assert!(!first.is_last());
    assert!(last.is_last());

    let staged = first.insert(0, 0xAB);
    let staged = last.insert(staged, 0xCD);
    assert_eq!(staged, 0xAB00_00CD);
}

#[test]
fn unaligned_addresses_decode_to_their_word() {
    let map = timer_map(8);
    let load = map.register("timer0", "load").unwrap().address;
    assert_eq!(map.decode(load + 5).map(|s| s.word), Some(1));
    assert!(map.decode(BASE).is_none());
}

#[test]
fn component_cannot_be_added_twice() {
    let mut map = timer_map(8);
    let err = map
        .add_component("timer0", 12, &[CsrRegister::storage("x", 8)])
        .unwrap_err();
    assert!(matches!(err, ConfigError::CsrBank(_)));
}

#[test]
fn bank_overflow_is_rejected() {
    let mut map = CsrMap::new(BASE, 8);
    let registers = vec![CsrRegister::storage("r", 32); 129];
    assert!(matches!(
        map.add_component("big", 0, &registers),
        Err(ConfigError::CsrBank(_))
    ));
}

#[test]
fn constants_are_recorded() {
    let mut map = CsrMap::new(BASE, 8);
    map.add_constant("L2_SIZE", 8192);
    assert_eq!(map.constant("L2_SIZE"), Some(8192));
    assert_eq!(map.constant("MISSING"), None);
}
