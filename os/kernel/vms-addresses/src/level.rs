//! # Translation Levels and Table Indices

use core::fmt;
use vms_info::memory::{INDEX_BITS, INDEX_MASK, MMU_LEVELS, NUM_PTE_ENTRIES, OFFSET_BITS};

use crate::VirtualAddress;

/// A translation level.
///
/// Level 2 is the root table, level 0 holds the leaf entries that reference
/// data frames. Range is `0..3` (checked in debug builds).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Level(u8);

/// Index into one page table, derived from a 9-bit slice of a virtual address.
///
/// Range is `0..512` (checked in debug builds).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TableIndex(u16);

impl Level {
    /// The root level, where every walk starts.
    pub const ROOT: Self = Self(MMU_LEVELS - 1);

    /// The leaf level.
    pub const LEAF: Self = Self(0);

    /// Construct from a raw level number.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 3` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u8) -> Self {
        debug_assert!(v < MMU_LEVELS);
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_leaf(self) -> bool {
        self.0 == 0
    }

    /// The level below this one, or `None` at the leaf.
    #[inline]
    #[must_use]
    pub const fn next_lower(self) -> Option<Self> {
        if self.is_leaf() {
            None
        } else {
            Some(Self(self.0 - 1))
        }
    }

    /// Bit position of this level's index inside a virtual address (`9·level + 12`).
    #[inline]
    #[must_use]
    pub const fn shift(self) -> u32 {
        INDEX_BITS * self.0 as u32 + OFFSET_BITS
    }

    /// All levels in walk order: root first, leaf last.
    pub fn walk_order() -> impl Iterator<Item = Self> {
        (0..MMU_LEVELS).rev().map(Self)
    }
}

impl TableIndex {
    /// Extract the 9-bit index of `va` at `level`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn of(va: VirtualAddress, level: Level) -> Self {
        Self(((va.as_u64() >> level.shift()) & INDEX_MASK) as u16)
    }

    /// Construct from a raw index.
    ///
    /// ### Debug assertions
    /// - Asserts `v < 512` in debug builds.
    #[inline]
    #[must_use]
    pub const fn new(v: u16) -> Self {
        debug_assert!((v as usize) < NUM_PTE_ENTRIES);
        Self(v)
    }

    /// Return the index as `usize` for table access.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Every slot of a table, in ascending order.
    #[allow(clippy::cast_possible_truncation)]
    pub fn all() -> impl Iterator<Item = Self> {
        (0..NUM_PTE_ENTRIES as u16).map(Self)
    }
}

impl fmt::Debug for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for TableIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
