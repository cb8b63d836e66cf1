//! # Page Tables
//!
//! A page table is an ordinary [`Frame`] read as 512 consecutive 64-bit
//! [`PageTableEntry`] words. The same shape is used at all three levels:
//!
//! ```text
//!  root (L2)  →  L1  →  L0 (leaf)  →  data frame
//!     │          │        │
//!     │          │        └── entry.ppn = data frame, read/write set
//!     │          └─────────── entry.ppn = L0 table, read/write clear
//!     └────────────────────── entry.ppn = L1 table, read/write clear
//! ```
//!
//! [`PageTable`] and [`PageTableMut`] are borrowed views; they do not own the
//! frame and never allocate.

use vms_addresses::{Level, TableIndex, VirtualAddress};
use vms_alloc::Frame;

use crate::PageTableEntry;

/// Index of `va` at `level`: the 9-bit slice starting at bit `9·level + 12`.
#[inline]
#[must_use]
pub const fn index_at(va: VirtualAddress, level: Level) -> TableIndex {
    TableIndex::of(va, level)
}

/// Read-only view of a frame as a page table.
#[derive(Copy, Clone)]
pub struct PageTable<'f> {
    frame: &'f Frame,
}

/// Mutable view of a frame as a page table.
pub struct PageTableMut<'f> {
    frame: &'f mut Frame,
}

impl<'f> PageTable<'f> {
    #[inline]
    #[must_use]
    pub const fn new(frame: &'f Frame) -> Self {
        Self { frame }
    }

    /// The entry in slot `index`.
    #[inline]
    #[must_use]
    pub fn entry_at(self, index: TableIndex) -> PageTableEntry {
        PageTableEntry::from_bits(self.frame.load_entry(index.as_usize()))
    }

    /// The entry selecting `va` at `level`.
    #[inline]
    #[must_use]
    pub fn entry(self, va: VirtualAddress, level: Level) -> PageTableEntry {
        self.entry_at(index_at(va, level))
    }

    /// All valid entries with their slots, in ascending slot order.
    pub fn valid_entries(self) -> impl Iterator<Item = (TableIndex, PageTableEntry)> + 'f {
        TableIndex::all()
            .map(move |i| (i, self.entry_at(i)))
            .filter(|(_, e)| e.valid())
    }
}

impl<'f> PageTableMut<'f> {
    #[inline]
    pub const fn new(frame: &'f mut Frame) -> Self {
        Self { frame }
    }

    #[inline]
    #[must_use]
    pub fn entry_at(&self, index: TableIndex) -> PageTableEntry {
        PageTable::new(self.frame).entry_at(index)
    }

    #[inline]
    #[must_use]
    pub fn entry(&self, va: VirtualAddress, level: Level) -> PageTableEntry {
        self.entry_at(index_at(va, level))
    }

    /// Overwrite slot `index`.
    #[inline]
    pub fn set_entry_at(&mut self, index: TableIndex, entry: PageTableEntry) {
        self.frame.store_entry(index.as_usize(), entry.into_bits());
    }

    /// Overwrite the entry selecting `va` at `level`.
    #[inline]
    pub fn set_entry(&mut self, va: VirtualAddress, level: Level, entry: PageTableEntry) {
        self.set_entry_at(index_at(va, level), entry);
    }

    /// Read-modify-write slot `index` in place.
    #[inline]
    pub fn update_entry_at(&mut self, index: TableIndex, f: impl FnOnce(&mut PageTableEntry)) {
        let mut entry = self.entry_at(index);
        f(&mut entry);
        self.set_entry_at(index, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vms_addresses::FrameNumber;

    #[test]
    fn entries_land_at_their_slot() {
        let mut frame = Frame::zeroed();
        let va = VirtualAddress::new(0xABC123);

        let mut table = PageTableMut::new(&mut frame);
        table.set_entry(va, Level::LEAF, PageTableEntry::leaf(FrameNumber::new(3), true, true));
        assert_eq!(table.entry_at(TableIndex::new(0xBC)).ppn(), FrameNumber::new(3));

        // the same table seen as an L1 table: slot 5 is still empty
        assert!(!table.entry(va, Level::new(1)).valid());

        let view = PageTable::new(&frame);
        let valid: Vec<_> = view.valid_entries().map(|(i, _)| i.as_usize()).collect();
        assert_eq!(valid, [0xBC]);
    }

    #[test]
    fn update_in_place_keeps_other_slots() {
        let mut frame = Frame::zeroed();
        let mut table = PageTableMut::new(&mut frame);
        table.set_entry_at(TableIndex::new(0), PageTableEntry::interior(FrameNumber::new(1)));
        table.set_entry_at(TableIndex::new(511), PageTableEntry::interior(FrameNumber::new(2)));

        table.update_entry_at(TableIndex::new(511), |e| e.set_read(true));

        assert!(!table.entry_at(TableIndex::new(0)).read());
        assert!(table.entry_at(TableIndex::new(511)).read());
        assert_eq!(table.entry_at(TableIndex::new(511)).ppn(), FrameNumber::new(2));
    }

    #[test]
    fn index_at_uses_level_offsets() {
        let va = VirtualAddress::new((7 << 30) | (6 << 21) | (5 << 12) | 0xFFF);
        assert_eq!(index_at(va, Level::new(2)).as_usize(), 7);
        assert_eq!(index_at(va, Level::new(1)).as_usize(), 6);
        assert_eq!(index_at(va, Level::new(0)).as_usize(), 5);
    }
}
