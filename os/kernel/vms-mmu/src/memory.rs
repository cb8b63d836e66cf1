//! # Physical Memory
//!
//! The machine-side state a fault handler may touch: the frame pool and the
//! per-frame reference counts used by copy-on-write.

use vms_addresses::{FrameNumber, PhysicalAddress};
use vms_alloc::FramePool;
use vms_info::exit::ExitCondition;

use crate::cow::RefCounts;
use crate::page_table::{PageTable, PageTableMut};
use crate::Fatal;

/// Frame pool plus reference-count table.
pub struct PhysicalMemory {
    frames: FramePool,
    refs: RefCounts,
}

impl PhysicalMemory {
    #[must_use]
    pub fn new(frames: FramePool) -> Self {
        let refs = RefCounts::new(frames.capacity());
        Self { frames, refs }
    }

    #[inline]
    #[must_use]
    pub const fn frames(&self) -> &FramePool {
        &self.frames
    }

    #[inline]
    pub const fn frames_mut(&mut self) -> &mut FramePool {
        &mut self.frames
    }

    #[inline]
    #[must_use]
    pub const fn refs(&self) -> &RefCounts {
        &self.refs
    }

    #[inline]
    pub const fn refs_mut(&mut self) -> &mut RefCounts {
        &mut self.refs
    }

    /// Allocate a zeroed frame; ends the process if the pool is exhausted.
    #[must_use]
    pub fn alloc(&mut self) -> FrameNumber {
        self.try_alloc().unwrap_or_else(|e| e.terminate())
    }

    /// Allocate a zeroed frame.
    ///
    /// # Errors
    /// [`Fatal::Alloc`] if the pool is exhausted.
    pub fn try_alloc(&mut self) -> Result<FrameNumber, Fatal> {
        Ok(self.frames.try_alloc()?)
    }

    /// Release a frame and forget its reference count.
    ///
    /// # Panics
    /// If the frame is not allocated.
    pub fn free(&mut self, frame: FrameNumber) {
        self.frames.free(frame);
        self.refs.reset(frame);
    }

    /// View `frame` as a page table.
    #[inline]
    #[must_use]
    pub fn table(&self, frame: FrameNumber) -> PageTable<'_> {
        PageTable::new(self.frames.frame(frame))
    }

    /// View `frame` as a mutable page table.
    #[inline]
    pub fn table_mut(&mut self, frame: FrameNumber) -> PageTableMut<'_> {
        PageTableMut::new(self.frames.frame_mut(frame))
    }

    /// Load the value stored at a physical address.
    #[must_use]
    pub fn load(&self, pa: PhysicalAddress) -> i32 {
        self.frames.frame(pa.frame()).load_i32(offset_of(pa))
    }

    /// Store a value at a physical address.
    pub fn store(&mut self, pa: PhysicalAddress, value: i32) {
        self.frames
            .frame_mut(pa.frame())
            .store_i32(offset_of(pa), value);
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn offset_of(pa: PhysicalAddress) -> usize {
    pa.offset() as usize
}
