//! # Copy-on-Write
//!
//! After [`fork_copy_on_write`](crate::Vms::fork_copy_on_write) both address
//! spaces reference the same data frames. Formerly writable leaves lose
//! `write` and gain `deferred_write` on both sides; the first write through
//! either side faults into [`CopyOnWrite`], which either hands the frame over
//! or gives the writer its own copy.
//!
//! ```text
//!   before the write              after a write through A
//!
//!   A ─┐                          A ──► frame' (count 1, W)
//!      ├─► frame (count 2, C)
//!   B ─┘                          B ──► frame  (count 1, C)
//! ```
//!
//! The remaining owner's entry keeps `deferred_write`; its next write finds a
//! count of 1 and is granted in place without copying.

use vms_addresses::{FrameNumber, Level};

use crate::mmu::{FaultHandler, PageFault};
use crate::PhysicalMemory;

/// Number of address-space leaves referencing each frame.
///
/// Only frames shared by a copy-on-write fork are counted; every other frame
/// reads as zero.
pub struct RefCounts(Box<[u32]>);

impl RefCounts {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self(vec![0; capacity].into_boxed_slice())
    }

    #[inline]
    #[must_use]
    pub fn get(&self, frame: FrameNumber) -> u32 {
        self.0[frame.as_usize()]
    }

    #[inline]
    pub fn set(&mut self, frame: FrameNumber, count: u32) {
        self.0[frame.as_usize()] = count;
    }

    #[inline]
    pub fn add(&mut self, frame: FrameNumber, n: u32) {
        self.0[frame.as_usize()] += n;
    }

    /// Drop one reference.
    ///
    /// # Panics
    /// If the count is already zero.
    #[inline]
    pub fn decrement(&mut self, frame: FrameNumber) {
        let count = &mut self.0[frame.as_usize()];
        assert!(*count > 0, "reference count of frame {frame} underflows");
        *count -= 1;
    }

    #[inline]
    pub fn reset(&mut self, frame: FrameNumber) {
        self.set(frame, 0);
    }
}

/// Fault handler that resolves write faults on copy-on-write leaves.
///
/// Anything else is left alone, so the translator's retry escalates it.
#[derive(Debug, Default, Copy, Clone)]
pub struct CopyOnWrite;

impl FaultHandler for CopyOnWrite {
    fn page_fault(&mut self, memory: &mut PhysicalMemory, fault: PageFault) {
        if fault.level != Level::LEAF {
            return;
        }

        let entry = memory.table(fault.table).entry(fault.address, Level::LEAF);
        if !entry.valid() || entry.write() || !entry.deferred_write() {
            return;
        }

        let shared = entry.ppn();
        match memory.refs().get(shared) {
            0 => {}
            1 => {
                log::debug!("{}: sole owner of frame {shared}, granting write", fault.address);
                memory.table_mut(fault.table).set_entry(
                    fault.address,
                    Level::LEAF,
                    entry.with_write(true).with_deferred_write(false),
                );
            }
            _ => {
                let private = memory.alloc();
                memory.frames_mut().copy_frame(shared, private);
                memory.table_mut(fault.table).set_entry(
                    fault.address,
                    Level::LEAF,
                    entry
                        .with_ppn(private)
                        .with_write(true)
                        .with_deferred_write(false),
                );
                memory.refs_mut().decrement(shared);
                memory.refs_mut().set(private, 1);
                log::debug!(
                    "{}: copied shared frame {shared} to {private}",
                    fault.address
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AddressSpace, PageTableEntry};
    use vms_addresses::VirtualAddress;
    use vms_alloc::FramePool;

    const VA: VirtualAddress = VirtualAddress::new(0x40_2000);

    fn shared_leaf(count: u32) -> (PhysicalMemory, FrameNumber, FrameNumber) {
        let mut memory = PhysicalMemory::new(FramePool::with_capacity(8));
        let root = memory.alloc();
        let data = memory.alloc();
        memory.frames_mut().frame_mut(data).store_i32(0, 7);

        let flags = PageTableEntry::new().with_read(true).with_deferred_write(true);
        AddressSpace::from_root(&mut memory, root)
            .map_page(VA, data, flags)
            .unwrap();
        memory.refs_mut().set(data, count);
        (memory, root, data)
    }

    fn leaf_table(memory: &PhysicalMemory, root: FrameNumber) -> FrameNumber {
        let l1 = memory.table(root).entry(VA, Level::ROOT).ppn();
        memory.table(l1).entry(VA, Level::new(1)).ppn()
    }

    fn fault(memory: &mut PhysicalMemory, root: FrameNumber) {
        let table = leaf_table(memory, root);
        CopyOnWrite.page_fault(
            memory,
            PageFault {
                address: VA,
                level: Level::LEAF,
                table,
            },
        );
    }

    #[test]
    fn shared_frame_is_copied_for_the_writer() {
        let (mut memory, root, data) = shared_leaf(2);
        let used = memory.frames().used_count();

        fault(&mut memory, root);

        let entry = memory.table(leaf_table(&memory, root)).entry(VA, Level::LEAF);
        assert!(entry.write() && !entry.deferred_write() && entry.read());
        assert_ne!(entry.ppn(), data);
        assert_eq!(memory.frames().used_count(), used + 1);
        assert_eq!(memory.frames().frame(entry.ppn()).load_i32(0), 7);
        assert_eq!(memory.refs().get(data), 1);
        assert_eq!(memory.refs().get(entry.ppn()), 1);
    }

    #[test]
    fn sole_owner_is_granted_in_place() {
        let (mut memory, root, data) = shared_leaf(1);
        let used = memory.frames().used_count();

        fault(&mut memory, root);

        let entry = memory.table(leaf_table(&memory, root)).entry(VA, Level::LEAF);
        assert!(entry.write() && !entry.deferred_write());
        assert_eq!(entry.ppn(), data);
        assert_eq!(memory.frames().used_count(), used);
        assert_eq!(memory.refs().get(data), 1);
    }

    #[test]
    fn unshared_frame_is_left_alone() {
        let (mut memory, root, _) = shared_leaf(0);
        fault(&mut memory, root);

        let entry = memory.table(leaf_table(&memory, root)).entry(VA, Level::LEAF);
        assert!(!entry.write() && entry.deferred_write());
    }

    #[test]
    fn read_only_leaf_is_not_repaired() {
        let (mut memory, root, data) = shared_leaf(2);
        let table = leaf_table(&memory, root);
        memory.table_mut(table).set_entry(
            VA,
            Level::LEAF,
            PageTableEntry::leaf(data, true, false),
        );

        fault(&mut memory, root);

        let entry = memory.table(table).entry(VA, Level::LEAF);
        assert!(!entry.write());
        assert_eq!(memory.refs().get(data), 2);
    }

    #[test]
    fn interior_faults_are_ignored() {
        let (mut memory, root, _) = shared_leaf(2);
        let before = memory.table(root).entry(VA, Level::ROOT);
        CopyOnWrite.page_fault(
            &mut memory,
            PageFault {
                address: VA,
                level: Level::ROOT,
                table: root,
            },
        );
        assert_eq!(memory.table(root).entry(VA, Level::ROOT), before);
    }

    #[test]
    #[should_panic(expected = "underflows")]
    fn decrement_below_zero_is_rejected() {
        let mut refs = RefCounts::new(2);
        refs.decrement(FrameNumber::new(1));
    }
}
