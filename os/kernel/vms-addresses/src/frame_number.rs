use core::fmt;
use vms_info::memory::{OFFSET_BITS, PPN_MAX};

use crate::PhysicalAddress;

/// Number of one physical frame: its position in the frame pool.
///
/// This is also the physical page number (PPN) stored in page-table entries,
/// so converting between a frame and its base address is a shift by the
/// 12-bit offset width.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FrameNumber(u64);

impl FrameNumber {
    /// Construct from a raw frame number.
    ///
    /// ### Debug assertions
    /// - Asserts the value fits the 44-bit PPN field.
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        debug_assert!(v <= PPN_MAX);
        Self(v)
    }

    /// Frame number of a pool slot.
    #[inline]
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self::new(index as u64)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Pool slot of this frame.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Physical address of the first byte of this frame (`ppn << 12`).
    #[inline]
    #[must_use]
    pub const fn base(self) -> PhysicalAddress {
        PhysicalAddress::new(self.0 << OFFSET_BITS)
    }

    /// The frame whose first byte is `base`.
    ///
    /// # Panics
    /// If `base` is not page aligned.
    #[inline]
    #[must_use]
    pub const fn from_base(base: PhysicalAddress) -> Self {
        assert!(base.is_page_aligned(), "frame base must be page aligned");
        Self::containing(base)
    }

    /// The frame containing `pa` (offset bits dropped).
    #[inline]
    #[must_use]
    pub const fn containing(pa: PhysicalAddress) -> Self {
        Self(pa.as_u64() >> OFFSET_BITS)
    }
}

impl fmt::Debug for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", self.0)
    }
}

impl fmt::Display for FrameNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}
