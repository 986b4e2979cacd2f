//! Sparse backing storage for main RAM.
//!
//! Main RAM can be hundreds of megabytes while a simulation touches a few pages, so
//! pages are allocated on first write. Unwritten bytes read as zero.

use std::collections::HashMap;

/// Allocation granule in bytes.
const PAGE_SIZE: usize = 4096;

/// Lazily allocated byte store of a fixed size.
#[derive(Debug, Default)]
pub struct SparseStorage {
    pages: HashMap<u64, Box<[u8]>>,
    size: u64,
}

impl SparseStorage {
    /// Creates an empty store of `size` bytes.
    pub fn new(size: u64) -> Self {
        Self {
            pages: HashMap::new(),
            size,
        }
    }

    /// Capacity in bytes.
    pub const fn len(&self) -> u64 {
        self.size
    }

    /// Returns `true` for a zero-sized store.
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of pages that have been written.
    pub fn resident_pages(&self) -> usize {
        self.pages.len()
    }

    /// Copies `buf.len()` bytes starting at `offset` into `buf`.
    ///
    /// The caller guarantees `offset + buf.len() <= len()`.
    pub fn read(&self, offset: u64, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            let addr = offset + i as u64;
            let (page, within) = Self::split(addr);
            *byte = self.pages.get(&page).map_or(0, |p| p[within]);
        }
    }

    /// Writes `data[i]` at `offset + i` for every `i` whose bit is set in `byte_enable`.
    pub fn write(&mut self, offset: u64, data: &[u8], byte_enable: u64) {
        for (i, &byte) in data.iter().enumerate().take(64) {
            if byte_enable & (1 << i) == 0 {
                continue;
            }
            let (page, within) = Self::split(offset + i as u64);
            let page = self
                .pages
                .entry(page)
                .or_insert_with(|| vec![0; PAGE_SIZE].into_boxed_slice());
            page[within] = byte;
        }
    }

    /// Loads a contiguous image at `offset`, truncated to the store size.
    pub fn load(&mut self, offset: u64, image: &[u8]) {
        let room = self.size.saturating_sub(offset) as usize;
        for (chunk_idx, chunk) in image[..image.len().min(room)].chunks(64).enumerate() {
            let base = offset + (chunk_idx * 64) as u64;
            self.write(base, chunk, u64::MAX);
        }
    }

    const fn split(addr: u64) -> (u64, usize) {
        (addr / PAGE_SIZE as u64, (addr % PAGE_SIZE as u64) as usize)
    }
}
