//! Countdown timer tests.
//!
//! Covers loading while disabled, one-shot and periodic modes, value latching, the zero
//! event, and the CSR surface.

use pretty_assertions::assert_eq;
use socfabric_core::soc::registry::{CsrAccess, RegisterSurface};
use socfabric_core::soc::timer::Timer;

fn ticks(timer: &mut Timer, n: usize) {
    for _ in 0..n {
        timer.tick();
    }
}

#[test]
fn disabled_timer_tracks_load() {
    let mut timer = Timer::new(32);
    timer.set_load(5);
    timer.tick();
    assert_eq!(timer.counter(), 5);
    ticks(&mut timer, 3);
    assert_eq!(timer.counter(), 5);
    assert!(!timer.event_pending());
}

#[test]
fn one_shot_fires_once_and_stops() {
    let mut timer = Timer::new(32);
    timer.set_load(3);
    timer.set_reload(0);
    timer.tick();
    timer.set_enabled(true);

    ticks(&mut timer, 2);
    assert_eq!(timer.counter(), 1);
    assert!(!timer.event_pending());

    timer.tick();
    assert_eq!(timer.counter(), 0);
    assert!(timer.event_pending());

    timer.clear_event();
    ticks(&mut timer, 10);
    assert_eq!(timer.counter(), 0);
    assert!(!timer.event_pending());
}

#[test]
fn periodic_reloads_and_fires_every_period() {
    let mut timer = Timer::new(32);
    timer.set_reload(2);
    timer.set_enabled(true);

    let mut events = Vec::new();
    for cycle in 0..9 {
        timer.tick();
        if timer.event_pending() {
            events.push(cycle);
            timer.clear_event();
        }
    }
    // 0 → 2 → 1 → 0 (event) → 2 → 1 → 0 (event) ...
    assert_eq!(events, vec![2, 5, 8]);
}

#[test]
fn value_is_latched_on_update() {
    let mut timer = Timer::new(32);
    timer.set_load(100);
    timer.tick();
    timer.set_enabled(true);
    ticks(&mut timer, 10);

    assert_eq!(timer.value(), 0);
    timer.update_value();
    assert_eq!(timer.value(), 90);
    ticks(&mut timer, 5);
    assert_eq!(timer.value(), 90);
}

#[test]
fn irq_requires_event_enable() {
    let mut timer = Timer::new(32);
    timer.set_load(1);
    timer.tick();
    timer.set_enabled(true);
    timer.tick();

    assert!(timer.event_pending());
    assert!(!timer.irq());
    timer.set_event_enable(true);
    assert!(timer.irq());
    timer.clear_event();
    assert!(!timer.irq());
}

#[test]
fn values_are_masked_to_the_counter_width() {
    let mut timer = Timer::new(8);
    timer.set_load(0x1FF);
    timer.tick();
    assert_eq!(timer.counter(), 0xFF);
}

#[test]
fn csr_surface_drives_the_timer() {
    let mut timer = Timer::new(16);
    let registers = timer.csr_registers();
    let names: Vec<_> = registers.iter().map(|r| r.name).collect();
    assert_eq!(
        names,
        vec!["load", "reload", "en", "update_value", "value", "ev_status", "ev_pending", "ev_enable"]
    );
    assert_eq!(registers[4].access, CsrAccess::ReadOnly);
    assert_eq!(registers[0].bits, 16);

    timer.write_csr("load", 4);
    timer.tick();
    timer.write_csr("reload", 4);
    timer.write_csr("ev_enable", 1);
    timer.write_csr("en", 1);
    assert_eq!(timer.read_csr("ev_status"), 1);

    ticks(&mut timer, 4);
    assert_eq!(timer.read_csr("ev_pending"), 1);
    assert!(timer.irq());

    timer.write_csr("ev_pending", 1);
    assert_eq!(timer.read_csr("ev_pending"), 0);

    timer.write_csr("update_value", 1);
    assert_eq!(timer.read_csr("value"), timer.counter());
}
