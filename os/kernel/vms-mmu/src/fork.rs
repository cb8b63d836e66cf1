//! # Address-Space Duplication
//!
//! Both strategies walk the source tree depth first and allocate a fresh
//! table for every table they meet; they differ only at the leaves.
//!
//! | Strategy                   | Leaf in the copy                     | Data frames |
//! |----------------------------|--------------------------------------|-------------|
//! | [`Strategy::Eager`]        | same flags, new frame with same bytes| duplicated  |
//! | [`Strategy::CopyOnWrite`]  | same frame; `W` traded for `C`       | shared      |
//!
//! For copy-on-write, every leaf that was writable loses `write` and gains
//! `deferred_write` in *both* trees, and its frame's reference count grows by
//! two, one per tree. Leaves that were never writable are shared as they are
//! and stay out of the count.
//!
//! A leaf that is still shared from an earlier copy-on-write fork keeps its
//! marker. A copy-on-write fork adds one reference for the new tree; an eager
//! fork gives the new tree a private frame with a count of one.
//!
//! Forking requires that no more than half of the pool is in use beforehand.

use vms_addresses::{FrameNumber, Level, TableIndex};

use crate::{Fatal, PageTableEntry, PhysicalMemory};

/// How leaves are duplicated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Strategy {
    Eager,
    CopyOnWrite,
}

/// Duplicate the tree rooted at `root` and return the new root.
pub(crate) fn fork(
    memory: &mut PhysicalMemory,
    root: FrameNumber,
    strategy: Strategy,
) -> Result<FrameNumber, Fatal> {
    check_capacity(memory)?;

    let before = memory.frames().used_count();
    let copy = duplicate(memory, root, Level::ROOT, strategy)?;
    log::info!(
        "forked root {root} into {copy} ({strategy:?}), {} new frames",
        memory.frames().used_count() - before
    );
    Ok(copy)
}

fn check_capacity(memory: &PhysicalMemory) -> Result<(), Fatal> {
    let used = memory.frames().used_count();
    let capacity = memory.frames().capacity();
    if used > capacity / 2 {
        return Err(Fatal::ForkCapacity { used, capacity });
    }
    Ok(())
}

fn duplicate(
    memory: &mut PhysicalMemory,
    source: FrameNumber,
    level: Level,
    strategy: Strategy,
) -> Result<FrameNumber, Fatal> {
    let copy = memory.try_alloc()?;

    // snapshot first: the copy-on-write path rewrites the source table
    let entries: Vec<_> = memory.table(source).valid_entries().collect();

    for (index, entry) in entries {
        let duplicated = match level.next_lower() {
            Some(lower) => entry.with_ppn(duplicate(memory, entry.ppn(), lower, strategy)?),
            None => duplicate_leaf(memory, source, index, entry, strategy)?,
        };
        memory.table_mut(copy).set_entry_at(index, duplicated);
    }

    Ok(copy)
}

fn duplicate_leaf(
    memory: &mut PhysicalMemory,
    table: FrameNumber,
    index: TableIndex,
    entry: PageTableEntry,
    strategy: Strategy,
) -> Result<PageTableEntry, Fatal> {
    match strategy {
        Strategy::Eager => {
            let frame = memory.try_alloc()?;
            memory.frames_mut().copy_frame(entry.ppn(), frame);
            if entry.deferred_write() && memory.refs().get(entry.ppn()) > 0 {
                // a private copy of a shared frame: its first write is granted in place
                memory.refs_mut().set(frame, 1);
            }
            Ok(entry.with_ppn(frame))
        }
        Strategy::CopyOnWrite if entry.write() => {
            let shared = entry.with_write(false).with_deferred_write(true);
            memory.table_mut(table).set_entry_at(index, shared);
            memory.refs_mut().add(entry.ppn(), 2);
            Ok(shared)
        }
        Strategy::CopyOnWrite if entry.deferred_write() && memory.refs().get(entry.ppn()) > 0 => {
            // already shared by an earlier fork: one more tree joins
            memory.refs_mut().add(entry.ppn(), 1);
            Ok(entry)
        }
        Strategy::CopyOnWrite => Ok(entry),
    }
}
