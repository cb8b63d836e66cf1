use core::fmt;
use vms_info::memory::OFFSET_MASK;

use crate::FrameNumber;

/// Physical memory address: a byte offset into the frame pool.
///
/// No alignment guarantees by itself; [`FrameNumber::base`] yields aligned
/// values and [`PhysicalAddress::frame`] recovers the containing frame.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(u64);

impl PhysicalAddress {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// `true` if the address is the first byte of a frame.
    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.0 & OFFSET_MASK == 0
    }

    /// The frame containing this address.
    #[inline]
    #[must_use]
    pub const fn frame(self) -> FrameNumber {
        FrameNumber::containing(self)
    }

    /// The byte offset inside the containing frame.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.0 & OFFSET_MASK
    }

    /// Combine a frame base with an in-page offset: `base | (offset & 0xFFF)`.
    #[inline]
    #[must_use]
    pub const fn join(frame: FrameNumber, offset: u64) -> Self {
        Self(frame.base().0 | (offset & OFFSET_MASK))
    }
}

impl fmt::Debug for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:X})", self.0)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl From<u64> for PhysicalAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}
