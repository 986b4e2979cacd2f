//! Countdown timer peripheral.
//!
//! Polling, one-shot, and periodic use all come from the same register set:
//! - `en = 0` keeps the counter loaded from `load`.
//! - `en = 1` counts down; at zero the counter reloads from `reload` (0 stops reloading).
//! - Writing `update_value` latches the counter into `value`.
//!
//! The `zero` event fires when the counter goes from non-zero to zero. It sets `ev_pending`,
//! and `irq` is raised while the event is both pending and enabled.

use tracing::trace;

use crate::soc::registry::{CsrRegister, RegisterSurface};

/// Countdown timer with a single `zero` event.
#[derive(Clone, Debug)]
pub struct Timer {
    width: u32,
    load: u32,
    reload: u32,
    en: bool,
    value: u32,
    counter: u32,
    ev_pending: bool,
    ev_enable: bool,
}

impl Timer {
    /// Creates a disabled timer with a `width`-bit counter (1..=32).
    pub const fn new(width: u32) -> Self {
        Self {
            width,
            load: 0,
            reload: 0,
            en: false,
            value: 0,
            counter: 0,
            ev_pending: false,
            ev_enable: false,
        }
    }

    const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1 << self.width) - 1
        }
    }

    /// Counter width in bits.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Sets the value loaded while the timer is disabled.
    pub const fn set_load(&mut self, load: u32) {
        self.load = load & self.mask();
    }

    /// Sets the value reloaded when the counter reaches zero.
    pub const fn set_reload(&mut self, reload: u32) {
        self.reload = reload & self.mask();
    }

    /// Enables or disables counting.
    pub const fn set_enabled(&mut self, en: bool) {
        self.en = en;
    }

    /// Latches the live counter into `value`.
    pub const fn update_value(&mut self) {
        self.value = self.counter;
    }

    /// Last latched counter value.
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Live counter (not visible to software without `update_value`).
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Enables or masks the zero event interrupt.
    pub const fn set_event_enable(&mut self, enable: bool) {
        self.ev_enable = enable;
    }

    /// Whether a zero event is pending.
    pub const fn event_pending(&self) -> bool {
        self.ev_pending
    }

    /// Clears the pending zero event.
    pub const fn clear_event(&mut self) {
        self.ev_pending = false;
    }

    /// Interrupt line.
    pub const fn irq(&self) -> bool {
        self.ev_pending && self.ev_enable
    }

    /// Advances one cycle.
    pub fn tick(&mut self) {
        let before = self.counter;
        self.counter = if self.en {
            if self.counter == 0 {
                self.reload
            } else {
                self.counter - 1
            }
        } else {
            self.load
        };
        if before != 0 && self.counter == 0 {
            trace!("timer reached zero");
            self.ev_pending = true;
        }
    }
}

impl RegisterSurface for Timer {
    fn csr_registers(&self) -> Vec<CsrRegister> {
        vec![
            CsrRegister::storage("load", self.width),
            CsrRegister::storage("reload", self.width),
            CsrRegister::storage("en", 1),
            CsrRegister::storage("update_value", 1),
            CsrRegister::status("value", self.width),
            CsrRegister::status("ev_status", 1),
            CsrRegister::storage("ev_pending", 1),
            CsrRegister::storage("ev_enable", 1),
        ]
    }

    fn read_csr(&self, name: &str) -> u32 {
        match name {
            "load" => self.load,
            "reload" => self.reload,
            "en" => u32::from(self.en),
            "value" => self.value,
            "ev_status" => u32::from(self.counter != 0),
            "ev_pending" => u32::from(self.ev_pending),
            "ev_enable" => u32::from(self.ev_enable),
            _ => 0,
        }
    }

    fn write_csr(&mut self, name: &str, value: u32) {
        match name {
            "load" => self.set_load(value),
            "reload" => self.set_reload(value),
            "en" => self.set_enabled(value & 1 != 0),
            "update_value" => self.update_value(),
            "ev_pending" if value & 1 != 0 => self.clear_event(),
            "ev_enable" => self.set_event_enable(value & 1 != 0),
            _ => {}
        }
    }
}
