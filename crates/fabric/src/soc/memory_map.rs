//! Address regions of the composed SoC.
//!
//! Regions are registered once at composition time and kept sorted by base address.
//! Every region must be a power of two in size, aligned to that size, and disjoint from
//! every other region.

use crate::common::ConfigError;

/// One entry of the memory map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemoryMapEntry {
    /// Owning component.
    pub owner: String,
    /// Base byte address.
    pub base: u64,
    /// Size in bytes (power of two).
    pub size: u64,
}

impl MemoryMapEntry {
    /// One past the last byte.
    pub const fn end(&self) -> u64 {
        self.base + self.size
    }

    /// Returns `true` if `address` falls inside the region.
    pub const fn contains(&self, address: u64) -> bool {
        address >= self.base && address < self.end()
    }
}

/// Validated set of regions.
#[derive(Clone, Debug, Default)]
pub struct MemoryMap {
    regions: Vec<MemoryMapEntry>,
}

impl MemoryMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a region.
    ///
    /// # Arguments
    ///
    /// * `owner` - Component name; must be unique.
    /// * `base` - Base byte address, aligned to `size`.
    /// * `size` - Size in bytes; must be a power of two.
    ///
    /// # Returns
    ///
    /// `DuplicateRegion`, `NotPowerOfTwo`, `Misaligned`, or `Overlap` on failure; the map is
    /// unchanged in that case.
    pub fn add(&mut self, owner: &str, base: u64, size: u64) -> Result<(), ConfigError> {
        if self.regions.iter().any(|r| r.owner == owner) {
            return Err(ConfigError::DuplicateRegion(owner.to_string()));
        }
        if !size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                name: owner.to_string(),
                size,
            });
        }
        if base & (size - 1) != 0 {
            return Err(ConfigError::Misaligned {
                name: owner.to_string(),
                base,
                size,
            });
        }
        let entry = MemoryMapEntry {
            owner: owner.to_string(),
            base,
            size,
        };
        if let Some(other) = self
            .regions
            .iter()
            .find(|r| r.base < entry.end() && entry.base < r.end())
        {
            return Err(ConfigError::Overlap {
                name: owner.to_string(),
                other: other.owner.clone(),
            });
        }
        self.regions.push(entry);
        self.regions.sort_by_key(|r| r.base);
        Ok(())
    }

    /// Region containing `address`.
    pub fn decode(&self, address: u64) -> Option<&MemoryMapEntry> {
        self.regions.iter().find(|r| r.contains(address))
    }

    /// Region owned by `owner`.
    pub fn region(&self, owner: &str) -> Option<&MemoryMapEntry> {
        self.regions.iter().find(|r| r.owner == owner)
    }

    /// Every region, sorted by base address.
    pub fn regions(&self) -> &[MemoryMapEntry] {
        &self.regions
    }
}
