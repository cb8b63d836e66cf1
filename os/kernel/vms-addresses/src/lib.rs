//! # Virtual and Physical Address Types
//!
//! Strongly typed wrappers for the numbers that flow through the emulated
//! MMU. They are zero-cost `#[repr(transparent)]` newtypes that keep virtual
//! addresses, physical addresses, frame numbers and table indices from being
//! mixed up.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`VirtualAddress`] | An address issued by a program; translated by the page tables. |
//! | [`PhysicalAddress`] | A byte offset into the frame pool. |
//! | [`FrameNumber`] | Index of one frame in the pool; doubles as the PPN stored in an entry. |
//! | [`Level`] | A translation level: 2 (root), 1, 0 (leaf). |
//! | [`TableIndex`] | One of the 512 slots of a page table. |
//!
//! ## Typical Usage
//!
//! ```rust
//! # use vms_addresses::*;
//! let va = VirtualAddress::new(0xABC123);
//! let (indices, offset) = va.split();
//! assert_eq!(offset, 0x123);
//! assert_eq!(VirtualAddress::join(indices, offset), va);
//!
//! let frame = FrameNumber::new(3);
//! assert_eq!(frame.base().as_u64(), 3 * 4096);
//! assert_eq!(FrameNumber::from_base(frame.base()), frame);
//! ```
//!
//! Frames are never referenced by host pointer: a frame number is the frame's
//! position in the pool and `frame << 12` is its physical address.

#![deny(unsafe_code)]

mod frame_number;
mod level;
mod physical_address;
mod virtual_address;

pub use crate::frame_number::FrameNumber;
pub use crate::level::{Level, TableIndex};
pub use crate::physical_address::PhysicalAddress;
pub use crate::virtual_address::{TableIndices, VirtualAddress};
