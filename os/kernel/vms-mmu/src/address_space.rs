//! # Address Space
//!
//! A handle to one table tree, identified by its root frame, borrowing the
//! physical memory it lives in. Unlike the translator it never faults:
//!
//! - [`AddressSpace::map_page`] allocates and links missing level-1/level-0
//!   tables, then installs one leaf.
//! - [`AddressSpace::query`] and [`AddressSpace::leaf`] walk without invoking
//!   any handler and report an unusable entry as `None`.
//! - [`AddressSpace::fork_copy`] and [`AddressSpace::fork_copy_on_write`]
//!   duplicate the tree (see [`fork`](crate::fork)).

use vms_addresses::{FrameNumber, Level, PhysicalAddress, VirtualAddress};

use crate::fork::{self, Strategy};
use crate::{Fatal, PageTableEntry, PhysicalMemory};

/// The root frame of a table tree.
pub type RootPage = FrameNumber;

/// Handle to a single, concrete address space.
pub struct AddressSpace<'m> {
    root: RootPage,
    memory: &'m mut PhysicalMemory,
}

impl<'m> AddressSpace<'m> {
    /// View the tree rooted at `root`.
    ///
    /// # Panics
    /// If `root` is not an allocated frame.
    pub fn from_root(memory: &'m mut PhysicalMemory, root: RootPage) -> Self {
        assert!(
            memory.frames().is_allocated(root),
            "root table {root} is not allocated"
        );
        Self { root, memory }
    }

    /// Allocate and link the level-1 and level-0 tables for `va` as needed.
    ///
    /// Returns the level-0 table.
    ///
    /// # Errors
    /// [`Fatal::Alloc`] if a table frame cannot be allocated.
    ///
    /// # Panics
    /// If an existing entry on the path is not a usable interior entry.
    pub fn ensure_chain(&mut self, va: VirtualAddress) -> Result<FrameNumber, Fatal> {
        let mut table = self.root;
        let mut level = Level::ROOT;

        while let Some(lower) = level.next_lower() {
            let entry = self.memory.table(table).entry(va, level);
            table = if entry.valid() {
                assert!(
                    entry.is_usable_at(level),
                    "{va}: level {level} entry is not an interior entry"
                );
                entry.ppn()
            } else {
                let next = self.memory.try_alloc()?;
                self.memory
                    .table_mut(table)
                    .set_entry(va, level, PageTableEntry::interior(next));
                log::trace!("{va}: linked level {lower} table {next}");
                next
            };
            level = lower;
        }

        Ok(table)
    }

    /// Map `va` to `frame`.
    ///
    /// The leaf gets `valid` plus the flags of `leaf_flags` (its PPN is
    /// ignored).
    ///
    /// # Errors
    /// [`Fatal::Alloc`] if a table frame cannot be allocated.
    pub fn map_page(
        &mut self,
        va: VirtualAddress,
        frame: FrameNumber,
        leaf_flags: PageTableEntry,
    ) -> Result<(), Fatal> {
        let leaf_table = self.ensure_chain(va)?;
        let leaf = leaf_flags.with_valid(true).with_ppn(frame);
        self.memory
            .table_mut(leaf_table)
            .set_entry(va, Level::LEAF, leaf);
        log::trace!("{va}: mapped to frame {frame} ({})", leaf.flags());
        Ok(())
    }

    /// The leaf entry for `va`, if every level on the way is usable.
    #[must_use]
    pub fn leaf(&self, va: VirtualAddress) -> Option<PageTableEntry> {
        leaf(self.memory, self.root, va)
    }

    /// Translate `va` without faulting.
    #[must_use]
    pub fn query(&self, va: VirtualAddress) -> Option<PhysicalAddress> {
        query(self.memory, self.root, va)
    }

    /// Deep-copy this tree and every data frame it maps.
    ///
    /// # Errors
    /// [`Fatal::ForkCapacity`] if more than half of the pool is in use,
    /// [`Fatal::Alloc`] if the pool runs dry regardless.
    pub fn fork_copy(&mut self) -> Result<RootPage, Fatal> {
        fork::fork(self.memory, self.root, Strategy::Eager)
    }

    /// Copy this tree's tables but share its data frames copy-on-write.
    ///
    /// # Errors
    /// As for [`fork_copy`](Self::fork_copy).
    pub fn fork_copy_on_write(&mut self) -> Result<RootPage, Fatal> {
        fork::fork(self.memory, self.root, Strategy::CopyOnWrite)
    }
}

pub(crate) fn leaf(
    memory: &PhysicalMemory,
    root: RootPage,
    va: VirtualAddress,
) -> Option<PageTableEntry> {
    let mut table = root;
    for level in Level::walk_order() {
        let entry = memory.table(table).entry(va, level);
        if !entry.is_usable_at(level) {
            return None;
        }
        if level.is_leaf() {
            return Some(entry);
        }
        table = entry.ppn();
    }
    None
}

pub(crate) fn query(
    memory: &PhysicalMemory,
    root: RootPage,
    va: VirtualAddress,
) -> Option<PhysicalAddress> {
    leaf(memory, root, va).map(|leaf| PhysicalAddress::join(leaf.ppn(), va.offset()))
}
