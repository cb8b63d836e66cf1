//! # Physical Frame
//!
//! One page worth of emulated physical memory. Page tables and data pages
//! share this representation; what a frame *means* depends only on which
//! entry references it.

use vms_info::memory::{NUM_PTE_ENTRIES, PAGE_SIZE};

/// A 4 KiB-aligned frame of physical memory.
#[repr(C, align(4096))]
#[derive(Clone)]
pub struct Frame([u8; PAGE_SIZE]);

impl Frame {
    /// Create an all-zero frame.
    #[inline]
    #[must_use]
    pub const fn zeroed() -> Self {
        Self([0; PAGE_SIZE])
    }

    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.0
    }

    /// `true` if every byte is zero.
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Zero-fill the frame.
    #[inline]
    pub fn zero(&mut self) {
        self.0.fill(0);
    }

    /// Overwrite this frame with the bytes of `other`.
    #[inline]
    pub fn copy_from(&mut self, other: &Self) {
        self.0.copy_from_slice(&other.0);
    }

    /// Load the 64-bit word in slot `index` when the frame is viewed as a
    /// table of [`NUM_PTE_ENTRIES`] entries.
    ///
    /// # Panics
    /// If `index` is out of range.
    #[inline]
    #[must_use]
    pub fn load_entry(&self, index: usize) -> u64 {
        assert!(index < NUM_PTE_ENTRIES, "entry index {index} out of range");
        let start = index * size_of::<u64>();
        let mut word = [0; size_of::<u64>()];
        word.copy_from_slice(&self.0[start..start + size_of::<u64>()]);
        u64::from_ne_bytes(word)
    }

    /// Store the 64-bit word in slot `index`.
    ///
    /// # Panics
    /// If `index` is out of range.
    #[inline]
    pub fn store_entry(&mut self, index: usize, value: u64) {
        assert!(index < NUM_PTE_ENTRIES, "entry index {index} out of range");
        let start = index * size_of::<u64>();
        self.0[start..start + size_of::<u64>()].copy_from_slice(&value.to_ne_bytes());
    }

    /// Load the 32-bit value stored at byte `offset`.
    ///
    /// # Panics
    /// If the four bytes at `offset` do not lie inside the frame.
    #[inline]
    #[must_use]
    pub fn load_i32(&self, offset: usize) -> i32 {
        let end = Self::value_end(offset);
        let mut word = [0; size_of::<i32>()];
        word.copy_from_slice(&self.0[offset..end]);
        i32::from_ne_bytes(word)
    }

    /// Store a 32-bit value at byte `offset`.
    ///
    /// # Panics
    /// If the four bytes at `offset` do not lie inside the frame.
    #[inline]
    pub fn store_i32(&mut self, offset: usize, value: i32) {
        let end = Self::value_end(offset);
        self.0[offset..end].copy_from_slice(&value.to_ne_bytes());
    }

    fn value_end(offset: usize) -> usize {
        let end = offset + size_of::<i32>();
        assert!(
            end <= PAGE_SIZE,
            "value at offset {offset:#x} crosses the end of the frame"
        );
        end
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::zeroed()
    }
}
