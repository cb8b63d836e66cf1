//! # Translator
//!
//! Walks the three-level table hierarchy from the active root to a leaf and
//! turns a virtual address into a physical one.
//!
//! ## Fault protocol
//!
//! ```text
//!            ┌──────────────── usable ──────────────┐
//!            │                                      ▼
//! Walking(L) ── fault ──► handler ──► Walking(L) ── usable ──► Walking(L-1) / leaf
//!                                         │
//!                                         └── fault again ──► fatal (exit 14)
//! ```
//!
//! An entry faults when it is invalid, when an interior entry carries
//! read/write, or when a leaf carries neither. The first fault at a level
//! is handed to the [`FaultHandler`]; the level is then evaluated again and a
//! second fault there ends the process. Leaving a level clears the retry.
//!
//! After the walk, a missing read (or write) permission on the leaf gets one
//! more handler call against the leaf table before it, too, is fatal.
//!
//! The translator never repairs anything on its own.

use core::fmt;
use vms_addresses::{FrameNumber, Level, PhysicalAddress, VirtualAddress};

use crate::{Fatal, PageTableEntry, PhysicalMemory};

/// What the translator reports to a [`FaultHandler`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageFault {
    /// The virtual address being translated.
    pub address: VirtualAddress,
    /// The level at which the walk faulted.
    pub level: Level,
    /// The table holding the faulting entry.
    pub table: FrameNumber,
}

/// Fault-resolution policy injected into the translator.
///
/// A handler may rewrite the faulting entry through `memory`, allocate frames,
/// or do nothing. Whatever it leaves behind is evaluated once more.
pub trait FaultHandler {
    fn page_fault(&mut self, memory: &mut PhysicalMemory, fault: PageFault);
}

/// Resolves nothing: every fault becomes fatal on its retry.
#[derive(Debug, Default, Copy, Clone)]
pub struct FatalFaultHandler;

impl FaultHandler for FatalFaultHandler {
    fn page_fault(&mut self, _memory: &mut PhysicalMemory, _fault: PageFault) {}
}

/// The kind of data access being translated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
}

impl Access {
    const fn permits(self, entry: PageTableEntry) -> bool {
        entry.valid()
            && match self {
                Self::Read => entry.read(),
                Self::Write => entry.write(),
            }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// The active root plus the fault handler.
pub struct Mmu<H> {
    root: Option<FrameNumber>,
    handler: H,
}

impl<H: FaultHandler> Mmu<H> {
    pub const fn new(handler: H) -> Self {
        Self {
            root: None,
            handler,
        }
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> Option<FrameNumber> {
        self.root
    }

    #[inline]
    pub const fn set_root(&mut self, root: FrameNumber) {
        self.root = Some(root);
    }

    #[inline]
    #[must_use]
    pub const fn handler(&self) -> &H {
        &self.handler
    }

    /// The active root.
    ///
    /// # Panics
    /// If no root has been set.
    #[must_use]
    pub fn active_root(&self) -> FrameNumber {
        let Some(root) = self.root else {
            panic!("no active root page table");
        };
        root
    }

    /// Walk from the active root to the leaf entry of `va`.
    ///
    /// Returns the leaf table and the leaf entry.
    pub(crate) fn try_walk(
        &mut self,
        memory: &mut PhysicalMemory,
        va: VirtualAddress,
    ) -> Result<(FrameNumber, PageTableEntry), Fatal> {
        let mut table = self.active_root();
        let mut level = Level::ROOT;
        let mut faulted = false;

        loop {
            let entry = memory.table(table).entry(va, level);
            if !entry.is_usable_at(level) {
                if faulted {
                    return Err(Fatal::bad_address(va, table, level, entry));
                }
                faulted = true;
                self.fault(memory, va, level, table);
                continue;
            }

            faulted = false;
            match level.next_lower() {
                Some(lower) => {
                    table = entry.ppn();
                    level = lower;
                }
                None => return Ok((table, entry)),
            }
        }
    }

    /// Translate `va` for `access`, giving the handler one chance to grant a
    /// missing leaf permission.
    pub(crate) fn try_translate(
        &mut self,
        memory: &mut PhysicalMemory,
        va: VirtualAddress,
        access: Access,
    ) -> Result<PhysicalAddress, Fatal> {
        let (table, mut entry) = self.try_walk(memory, va)?;

        if !access.permits(entry) {
            log::debug!("{va}: leaf denies {access}");
            self.fault(memory, va, Level::LEAF, table);
            entry = memory.table(table).entry(va, Level::LEAF);
            if !access.permits(entry) {
                return Err(Fatal::bad_address(va, table, Level::LEAF, entry));
            }
        }

        Ok(PhysicalAddress::join(entry.ppn(), va.offset()))
    }

    fn fault(
        &mut self,
        memory: &mut PhysicalMemory,
        address: VirtualAddress,
        level: Level,
        table: FrameNumber,
    ) {
        log::debug!("page fault at {address}, level {level}, table {table}");
        self.handler.page_fault(
            memory,
            PageFault {
                address,
                level,
                table,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AddressSpace;
    use vms_alloc::FramePool;

    const VA: VirtualAddress = VirtualAddress::new(0xABC123);

    /// Records every fault and optionally runs a repair.
    struct Recording<F> {
        faults: Vec<PageFault>,
        repair: F,
    }

    impl<F: FnMut(&mut PhysicalMemory, PageFault)> FaultHandler for Recording<F> {
        fn page_fault(&mut self, memory: &mut PhysicalMemory, fault: PageFault) {
            self.faults.push(fault);
            (self.repair)(memory, fault);
        }
    }

    fn recording<F: FnMut(&mut PhysicalMemory, PageFault)>(repair: F) -> Mmu<Recording<F>> {
        Mmu::new(Recording {
            faults: Vec::new(),
            repair,
        })
    }

    fn mapped(flags: PageTableEntry) -> (PhysicalMemory, FrameNumber, FrameNumber) {
        let mut memory = PhysicalMemory::new(FramePool::with_capacity(8));
        let root = memory.alloc();
        let data = memory.alloc();
        AddressSpace::from_root(&mut memory, root)
            .map_page(VA, data, flags)
            .unwrap();
        (memory, root, data)
    }

    #[test]
    fn clean_walk_reaches_the_leaf() {
        let (mut memory, root, data) = mapped(PageTableEntry::new().with_read(true));
        let mut mmu = recording(|_, _| {});
        mmu.set_root(root);

        let pa = mmu.try_translate(&mut memory, VA, Access::Read).unwrap();
        assert_eq!(pa, PhysicalAddress::join(data, 0x123));
        assert!(mmu.handler().faults.is_empty());
    }

    #[test]
    fn unresolved_fault_is_fatal_on_retry() {
        let mut memory = PhysicalMemory::new(FramePool::with_capacity(2));
        let root = memory.alloc();
        let mut mmu = recording(|_, _| {});
        mmu.set_root(root);

        let Err(Fatal::BadAddress(fault)) = mmu.try_walk(&mut memory, VA) else {
            panic!("walk through an empty root must fail");
        };
        assert_eq!(fault.level, Level::ROOT);
        assert_eq!(fault.table, root);
        assert_eq!(mmu.handler().faults.len(), 1, "exactly one retry");
        assert_eq!(mmu.handler().faults[0].level, Level::ROOT);
    }

    #[test]
    fn invalid_leaf_is_fatal_after_one_retry() {
        let (mut memory, root, _) = mapped(PageTableEntry::new().with_read(true));
        let l1 = memory.table(root).entry(VA, Level::ROOT).ppn();
        let l0 = memory.table(l1).entry(VA, Level::new(1)).ppn();
        memory
            .table_mut(l0)
            .set_entry(VA, Level::LEAF, PageTableEntry::new());

        let mut mmu = recording(|_, _| {});
        mmu.set_root(root);

        let Err(Fatal::BadAddress(fault)) = mmu.try_walk(&mut memory, VA) else {
            panic!("walk to an invalid leaf must fail");
        };
        assert_eq!(fault.level, Level::LEAF);
        assert_eq!(fault.table, l0);
        assert!(!fault.entry.valid());
        assert_eq!(mmu.handler().faults.len(), 1, "exactly one retry");
        assert_eq!(mmu.handler().faults[0].level, Level::LEAF);
        assert_eq!(mmu.handler().faults[0].table, l0);
    }

    #[test]
    fn handler_can_build_the_missing_level() {
        let (mut memory, root, data) = mapped(PageTableEntry::new().with_write(true));
        // knock out the L1 entry; the handler puts it back
        let l1_entry = memory.table(root).entry(VA, Level::ROOT);
        memory
            .table_mut(root)
            .set_entry(VA, Level::ROOT, PageTableEntry::new());

        let mut mmu = recording(move |memory: &mut PhysicalMemory, fault: PageFault| {
            memory
                .table_mut(fault.table)
                .set_entry(fault.address, fault.level, l1_entry);
        });
        mmu.set_root(root);

        let pa = mmu.try_translate(&mut memory, VA, Access::Write).unwrap();
        assert_eq!(pa.frame(), data);
        assert_eq!(mmu.handler().faults.len(), 1);
    }

    #[test]
    fn retries_are_counted_per_level() {
        let (mut memory, root, _) = mapped(PageTableEntry::new().with_read(true));
        let l1 = memory.table(root).entry(VA, Level::ROOT).ppn();
        let l0 = memory.table(l1).entry(VA, Level::new(1)).ppn();
        let saved_root = memory.table(root).entry(VA, Level::ROOT);
        let saved_l1 = memory.table(l1).entry(VA, Level::new(1));
        memory
            .table_mut(root)
            .set_entry(VA, Level::ROOT, saved_root.with_valid(false));
        memory
            .table_mut(l1)
            .set_entry(VA, Level::new(1), saved_l1.with_read(true));

        // one fault at level 2 and one at level 1, each repaired
        let mut mmu = recording(move |memory: &mut PhysicalMemory, fault: PageFault| {
            let fixed = if fault.level == Level::ROOT { saved_root } else { saved_l1 };
            memory
                .table_mut(fault.table)
                .set_entry(fault.address, fault.level, fixed);
        });
        mmu.set_root(root);

        let (table, leaf) = mmu.try_walk(&mut memory, VA).unwrap();
        assert_eq!(table, l0);
        assert!(leaf.read());
        let levels: Vec<_> = mmu.handler().faults.iter().map(|f| f.level).collect();
        assert_eq!(levels, [Level::ROOT, Level::new(1)]);
    }

    #[test]
    fn missing_write_permission_gets_one_handler_call() {
        let (mut memory, root, _) = mapped(PageTableEntry::new().with_read(true));
        let mut mmu = recording(|_, _| {});
        mmu.set_root(root);

        let Err(Fatal::BadAddress(fault)) = mmu.try_translate(&mut memory, VA, Access::Write)
        else {
            panic!("write to a read-only leaf must fail");
        };
        assert_eq!(fault.level, Level::LEAF);
        assert!(fault.entry.read() && !fault.entry.write());
        assert_eq!(mmu.handler().faults.len(), 1);
    }

    #[test]
    #[should_panic(expected = "no active root")]
    fn translation_needs_a_root() {
        let mut memory = PhysicalMemory::new(FramePool::with_capacity(1));
        let mut mmu = Mmu::new(FatalFaultHandler);
        let _ = mmu.try_walk(&mut memory, VA);
    }
}
