//! CSR register collection and address assignment.
//!
//! Components that expose control/status registers implement `RegisterSurface`. The builder
//! asks each one for its registers in a single pass and lays them out in the component's
//! bank. It provides:
//! 1. **Register descriptions:** name, width, and access mode.
//! 2. **Bank layout:** each bank spans `CSR_BANK_SIZE` bytes from the CSR base, and each
//!    register takes `ceil(bits / csr_data_width)` words on a 4-byte stride.
//! 3. **Word slicing:** multi-word registers are split most significant word first; writes
//!    commit when the last word lands.
//! 4. **Constants:** named sizes recorded at composition time.

use std::collections::BTreeMap;

use crate::common::constants::{BUS_WORD_BYTES, CSR_BANK_SIZE};
use crate::common::ConfigError;

/// Who may write a register from the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsrAccess {
    /// Storage register, written by software.
    ReadWrite,
    /// Status register, written by hardware only; bus writes are ignored.
    ReadOnly,
}

/// One register as described by its component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CsrRegister {
    /// Register name, unique within the component.
    pub name: &'static str,
    /// Width in bits (1..=32).
    pub bits: u32,
    /// Access mode.
    pub access: CsrAccess,
}

impl CsrRegister {
    /// Storage register.
    pub const fn storage(name: &'static str, bits: u32) -> Self {
        Self {
            name,
            bits,
            access: CsrAccess::ReadWrite,
        }
    }

    /// Status register.
    pub const fn status(name: &'static str, bits: u32) -> Self {
        Self {
            name,
            bits,
            access: CsrAccess::ReadOnly,
        }
    }
}

/// A component exposing CSRs.
pub trait RegisterSurface {
    /// Registers in address order.
    fn csr_registers(&self) -> Vec<CsrRegister>;

    /// Current value of a register; unknown names read as zero.
    fn read_csr(&self, name: &str) -> u32;

    /// Commits a full register value written by software.
    fn write_csr(&mut self, name: &str, value: u32);
}

/// A register placed in the CSR address space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrEntry {
    /// Owning component (its bank name).
    pub component: String,
    /// Register description.
    pub register: CsrRegister,
    /// Byte address of the first word.
    pub address: u64,
    /// Number of bus words the register spans.
    pub words: u32,
}

/// One bus word of a register, as decoded from an address.
#[derive(Clone, Copy, Debug)]
pub struct CsrSlot<'a> {
    /// The register the word belongs to.
    pub entry: &'a CsrEntry,
    /// Word index, 0 being the most significant.
    pub word: u32,
    data_width: u32,
}

impl CsrSlot<'_> {
    fn shift(&self) -> u32 {
        (self.entry.words - 1 - self.word) * self.data_width
    }

    fn mask(&self) -> u32 {
        if self.data_width >= 32 {
            u32::MAX
        } else {
            (1 << self.data_width) - 1
        }
    }

    /// Extracts this word from a full register value.
    pub fn extract(&self, value: u32) -> u32 {
        value.checked_shr(self.shift()).unwrap_or(0) & self.mask()
    }

    /// Replaces this word inside `staged` with `data`.
    pub fn insert(&self, staged: u32, data: u32) -> u32 {
        let shift = self.shift();
        let mask = self.mask().checked_shl(shift).unwrap_or(0);
        (staged & !mask) | ((data & self.mask()).checked_shl(shift).unwrap_or(0) & mask)
    }

    /// Returns `true` for the least significant word, whose write commits the register.
    pub const fn is_last(&self) -> bool {
        self.word + 1 == self.entry.words
    }
}

/// Complete CSR layout of a composed SoC.
#[derive(Clone, Debug, Default)]
pub struct CsrMap {
    base: u64,
    data_width: u32,
    banks: BTreeMap<String, u32>,
    entries: Vec<CsrEntry>,
    constants: BTreeMap<&'static str, u64>,
}

impl CsrMap {
    /// Creates an empty map for a CSR region.
    ///
    /// # Arguments
    ///
    /// * `base` - CSR region base address.
    /// * `data_width` - CSR bus data width in bits.
    pub fn new(base: u64, data_width: u32) -> Self {
        Self {
            base,
            data_width,
            ..Self::default()
        }
    }

    /// Lays out a component's registers in its bank.
    ///
    /// # Returns
    ///
    /// `ConfigError::CsrBank` if the component was already added or its registers overflow
    /// the bank.
    pub fn add_component(
        &mut self,
        name: &str,
        bank: u32,
        registers: &[CsrRegister],
    ) -> Result<(), ConfigError> {
        if self.banks.contains_key(name) {
            return Err(ConfigError::CsrBank(format!("`{name}` added twice")));
        }
        let bank_base = self.base + u64::from(bank) * CSR_BANK_SIZE;
        let mut address = bank_base;
        for register in registers {
            let words = register.bits.div_ceil(self.data_width).max(1);
            self.entries.push(CsrEntry {
                component: name.to_string(),
                register: *register,
                address,
                words,
            });
            address += u64::from(words) * BUS_WORD_BYTES;
        }
        if address - bank_base > CSR_BANK_SIZE {
            return Err(ConfigError::CsrBank(format!(
                "registers of `{name}` overflow bank {bank}"
            )));
        }
        let _ = self.banks.insert(name.to_string(), bank);
        Ok(())
    }

    /// Records a named constant.
    pub fn add_constant(&mut self, name: &'static str, value: u64) {
        let _ = self.constants.insert(name, value);
    }

    /// CSR region base address.
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// CSR bus data width in bits.
    pub const fn data_width(&self) -> u32 {
        self.data_width
    }

    /// Bank number of each component.
    pub const fn banks(&self) -> &BTreeMap<String, u32> {
        &self.banks
    }

    /// Every placed register, in insertion order.
    pub fn entries(&self) -> &[CsrEntry] {
        &self.entries
    }

    /// Recorded constants.
    pub const fn constants(&self) -> &BTreeMap<&'static str, u64> {
        &self.constants
    }

    /// Looks up a constant.
    pub fn constant(&self, name: &str) -> Option<u64> {
        self.constants.get(name).copied()
    }

    /// Finds a register by component and name.
    pub fn register(&self, component: &str, name: &str) -> Option<&CsrEntry> {
        self.entries
            .iter()
            .find(|e| e.component == component && e.register.name == name)
    }

    /// Decodes a byte address to the register word it selects.
    pub fn decode(&self, address: u64) -> Option<CsrSlot<'_>> {
        let aligned = address & !(BUS_WORD_BYTES - 1);
        self.entries.iter().find_map(|entry| {
            let end = entry.address + u64::from(entry.words) * BUS_WORD_BYTES;
            (entry.address..end).contains(&aligned).then(|| CsrSlot {
                entry,
                word: ((aligned - entry.address) / BUS_WORD_BYTES) as u32,
                data_width: self.data_width,
            })
        })
    }
}
