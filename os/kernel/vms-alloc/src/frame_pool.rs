//! # Frame Pool
//!
//! A first-fit allocator over a fixed array of [`Frame`]s.
//!
//! ## Invariants
//! - [`FramePool::used_count`] equals the number of frames marked allocated.
//! - Free frames are all-zero, so every frame handed out by
//!   [`FramePool::alloc`] is all-zero.
//! - Touching a frame that is out of range or not allocated is a programmer
//!   error and panics.

use vms_addresses::{FrameNumber, PhysicalAddress};
use vms_info::exit::{self, ExitCondition};
use vms_info::memory::{MAX_PAGES, PAGE_SIZE};

use crate::Frame;

/// Conditions under which the pool cannot hand out a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameAllocError {
    #[error("out of memory: all {capacity} frames are in use")]
    OutOfMemory { capacity: usize },
    #[error("cannot reserve {capacity} frames for the frame pool")]
    Reserve { capacity: usize },
    #[error("frame pool region is not page aligned")]
    Misaligned,
    #[error("frame pool must hold at least one frame")]
    Empty,
}

impl ExitCondition for FrameAllocError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::OutOfMemory { .. } => exit::OUT_OF_MEMORY,
            Self::Reserve { .. } | Self::Misaligned | Self::Empty => exit::INIT_FAILURE,
        }
    }
}

/// The fixed pool of physical frames.
pub struct FramePool {
    frames: Box<[Frame]>,
    allocated: Box<[bool]>,
    used: usize,
}

impl FramePool {
    /// Reserve the default pool of [`MAX_PAGES`] frames.
    ///
    /// Ends the process if the region cannot be reserved.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_PAGES)
    }

    /// Reserve a pool of `capacity` frames.
    ///
    /// Ends the process if the region cannot be reserved.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::try_with_capacity(capacity).unwrap_or_else(|e| e.terminate())
    }

    /// Reserve a pool of `capacity` frames.
    ///
    /// # Errors
    /// - [`FrameAllocError::Empty`] for a zero capacity.
    /// - [`FrameAllocError::Reserve`] if the host refuses the allocation.
    /// - [`FrameAllocError::Misaligned`] if the region does not start on a
    ///   frame boundary.
    pub fn try_with_capacity(capacity: usize) -> Result<Self, FrameAllocError> {
        if capacity == 0 {
            return Err(FrameAllocError::Empty);
        }

        let mut frames = Vec::new();
        frames
            .try_reserve_exact(capacity)
            .map_err(|_| FrameAllocError::Reserve { capacity })?;
        frames.resize_with(capacity, Frame::zeroed);

        if frames.as_ptr().addr() % PAGE_SIZE != 0 {
            return Err(FrameAllocError::Misaligned);
        }

        log::debug!(
            "reserved frame pool: {capacity} frames, {} KiB",
            capacity * PAGE_SIZE / 1024
        );

        Ok(Self {
            frames: frames.into_boxed_slice(),
            allocated: vec![false; capacity].into_boxed_slice(),
            used: 0,
        })
    }

    /// Total number of frames in the pool.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Number of frames currently allocated.
    #[inline]
    #[must_use]
    pub const fn used_count(&self) -> usize {
        self.used
    }

    /// Allocate the first free frame.
    ///
    /// Ends the process with an out-of-memory exit code if the pool is full.
    #[must_use]
    pub fn alloc(&mut self) -> FrameNumber {
        self.try_alloc().unwrap_or_else(|e| e.terminate())
    }

    /// Allocate the first free frame.
    ///
    /// # Errors
    /// [`FrameAllocError::OutOfMemory`] if every frame is in use.
    pub fn try_alloc(&mut self) -> Result<FrameNumber, FrameAllocError> {
        let Some(slot) = self.allocated.iter().position(|&a| !a) else {
            return Err(FrameAllocError::OutOfMemory {
                capacity: self.capacity(),
            });
        };

        debug_assert!(self.frames[slot].is_zeroed(), "free frame was not zeroed");
        self.allocated[slot] = true;
        self.used += 1;

        let frame = FrameNumber::from_index(slot);
        log::trace!("allocated frame {frame}, {} in use", self.used);
        Ok(frame)
    }

    /// Zero-fill and release `frame`.
    ///
    /// # Panics
    /// If `frame` is out of range or not currently allocated.
    pub fn free(&mut self, frame: FrameNumber) {
        let slot = self.slot(frame);
        assert!(self.allocated[slot], "double free of frame {frame}");

        self.frames[slot].zero();
        self.allocated[slot] = false;
        self.used -= 1;
        log::trace!("freed frame {frame}, {} in use", self.used);
    }

    /// `true` if `frame` is in range and currently allocated.
    #[inline]
    #[must_use]
    pub fn is_allocated(&self, frame: FrameNumber) -> bool {
        self.allocated.get(frame.as_usize()).copied().unwrap_or(false)
    }

    /// Iterate over all allocated frames in ascending order.
    pub fn allocated_frames(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        self.allocated
            .iter()
            .enumerate()
            .filter(|&(_, &a)| a)
            .map(|(slot, _)| FrameNumber::from_index(slot))
    }

    /// Borrow an allocated frame.
    ///
    /// # Panics
    /// If `frame` is out of range or not allocated.
    #[inline]
    #[must_use]
    pub fn frame(&self, frame: FrameNumber) -> &Frame {
        let slot = self.live_slot(frame);
        &self.frames[slot]
    }

    /// Mutably borrow an allocated frame.
    ///
    /// # Panics
    /// If `frame` is out of range or not allocated.
    #[inline]
    pub fn frame_mut(&mut self, frame: FrameNumber) -> &mut Frame {
        let slot = self.live_slot(frame);
        &mut self.frames[slot]
    }

    /// Copy every byte of `src` into `dst`.
    ///
    /// # Panics
    /// If either frame is not allocated, or both are the same frame.
    pub fn copy_frame(&mut self, src: FrameNumber, dst: FrameNumber) {
        let slots = [self.live_slot(src), self.live_slot(dst)];
        let Ok([from, to]) = self.frames.get_disjoint_mut(slots) else {
            panic!("cannot copy frame {src} onto itself");
        };
        to.copy_from(from);
    }

    /// Physical address of the first byte of `frame`.
    #[inline]
    #[must_use]
    pub fn frame_address(&self, frame: FrameNumber) -> PhysicalAddress {
        let _ = self.slot(frame);
        frame.base()
    }

    /// The frame starting at `address`.
    ///
    /// # Panics
    /// If `address` is not page aligned or lies outside the pool.
    #[inline]
    #[must_use]
    pub fn frame_at(&self, address: PhysicalAddress) -> FrameNumber {
        let frame = FrameNumber::from_base(address);
        let _ = self.slot(frame);
        frame
    }

    fn slot(&self, frame: FrameNumber) -> usize {
        let slot = frame.as_usize();
        assert!(
            slot < self.capacity(),
            "frame {frame} outside pool of {} frames",
            self.capacity()
        );
        slot
    }

    fn live_slot(&self, frame: FrameNumber) -> usize {
        let slot = self.slot(frame);
        assert!(self.allocated[slot], "frame {frame} is not allocated");
        slot
    }
}

impl Default for FramePool {
    fn default() -> Self {
        Self::new()
    }
}
