use core::fmt;
use vms_info::memory::{MMU_LEVELS, OFFSET_MASK, VIRTUAL_ADDRESS_BITS};

use crate::{Level, TableIndex};

/// Per-level indices of a virtual address, ordered `[L2, L1, L0]`.
pub type TableIndices = [TableIndex; MMU_LEVELS as usize];

/// Virtual memory address.
///
/// Only the low 39 bits take part in translation; higher bits are carried but
/// ignored by the walk.
///
/// ### Examples
/// ```rust
/// # use vms_addresses::*;
/// let va = VirtualAddress::new(0xABC123);
/// assert_eq!(va.index(Level::LEAF).as_usize(), 0xBC);
/// assert_eq!(va.offset(), 0x123);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(u64);

impl VirtualAddress {
    /// Mask of the bits that take part in translation.
    pub const TRANSLATED_MASK: u64 = (1 << VIRTUAL_ADDRESS_BITS) - 1;

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

    /// The 9-bit table index used at `level`.
    #[inline]
    #[must_use]
    pub const fn index(self, level: Level) -> TableIndex {
        TableIndex::of(self, level)
    }

    /// The 12-bit offset inside the page.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> u64 {
        self.0 & OFFSET_MASK
    }

    /// Split into `[L2, L1, L0]` indices and the in-page offset.
    #[inline]
    #[must_use]
    pub const fn split(self) -> (TableIndices, u64) {
        (
            [
                self.index(Level::new(2)),
                self.index(Level::new(1)),
                self.index(Level::new(0)),
            ],
            self.offset(),
        )
    }

    /// Reassemble a virtual address from `[L2, L1, L0]` indices and an offset.
    ///
    /// The inverse of [`split`](Self::split) on the low 39 bits.
    #[inline]
    #[must_use]
    pub const fn join(indices: TableIndices, offset: u64) -> Self {
        debug_assert!(offset <= OFFSET_MASK);
        Self(
            (indices[0].as_u64() << Level::new(2).shift())
                | (indices[1].as_u64() << Level::new(1).shift())
                | (indices[2].as_u64() << Level::new(0).shift())
                | offset,
        )
    }

    /// The address with everything above bit 38 cleared.
    #[inline]
    #[must_use]
    pub const fn translated_bits(self) -> Self {
        Self(self.0 & Self::TRANSLATED_MASK)
    }
}

impl fmt::Debug for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VA(0x{:X})", self.0)
    }
}

impl fmt::Display for VirtualAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl From<u64> for VirtualAddress {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<VirtualAddress> for u64 {
    #[inline]
    fn from(va: VirtualAddress) -> Self {
        va.as_u64()
    }
}
