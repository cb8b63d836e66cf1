//! # Physical Frame Pool
//!
//! The emulated machine's physical memory: a fixed number of 4 KiB frames
//! reserved once, up front, in a single allocation. Frames are handed out by
//! number, never by host pointer.
//!
//! ```text
//! ┌────────┬────────┬────────┬─────┬──────────────┐
//! │ frame 0│ frame 1│ frame 2│ ... │ frame N-1    │  one reserved region
//! └────────┴────────┴────────┴─────┴──────────────┘
//!     ▲ physical address = frame << 12 | offset
//! ```
//!
//! ## Core Components
//!
//! ### Frames ([`frame`])
//! A [`Frame`] is a 4 KiB-aligned byte array with the typed loads and stores
//! the MMU needs: 64-bit page-table entries and 32-bit stored values.
//!
//! ### Frame Pool ([`frame_pool`])
//! [`FramePool`] tracks which frames are allocated and how many are live:
//! - first-fit allocation; every returned frame is all-zero
//! - freeing zero-fills the frame
//! - exhaustion ends the process with an out-of-memory exit code
//!
//! ## Usage
//! ```rust
//! use vms_alloc::FramePool;
//!
//! let mut pool = FramePool::with_capacity(8);
//! let frame = pool.alloc();
//! assert_eq!(pool.used_count(), 1);
//! assert!(pool.frame(frame).is_zeroed());
//! pool.free(frame);
//! assert_eq!(pool.used_count(), 0);
//! ```

#![deny(unsafe_code)]

pub mod frame;
pub mod frame_pool;

pub use crate::frame::Frame;
pub use crate::frame_pool::{FrameAllocError, FramePool};
