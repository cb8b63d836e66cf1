//! # Software MMU
//!
//! A three-level page-table hierarchy over an emulated frame pool, with an
//! injectable fault handler and two ways to duplicate an address space.
//!
//! ## Address translation
//!
//! ```text
//!  38        30 29        21 20        12 11          0
//! ┌────────────┬────────────┬────────────┬─────────────┐
//! │  L2 index  │  L1 index  │  L0 index  │   offset    │   virtual address
//! └─────┬──────┴─────┬──────┴─────┬──────┴──────┬──────┘
//!       ▼            ▼            ▼             │
//!     root ───────► L1 ───────► L0 ──► frame ───┴──► physical address
//! ```
//!
//! Each table is one frame of 512 [`PageTableEntry`] words. Interior entries
//! route only; a leaf needs read and/or write.
//!
//! ## Core Components
//!
//! ### Entries and tables ([`pte`], [`page_table`])
//! [`PageTableEntry`] is the 64-bit entry as a bitfield.
//! [`PageTable`]/[`PageTableMut`] view a frame as an array of entries.
//!
//! ### Translator ([`mmu`])
//! Walks from the active root. The first fault at a level goes to the
//! [`FaultHandler`]; a second one at that level is fatal.
//!
//! ### Address spaces and forking ([`address_space`], [`fork`], [`cow`])
//! - [`AddressSpace::map_page`] builds missing tables on the way to a leaf.
//! - `fork_copy` duplicates tables and data.
//! - `fork_copy_on_write` duplicates tables only and lets [`CopyOnWrite`]
//!   split shared frames on the first write.
//!
//! ### Simulator ([`Vms`])
//! Owns the [`PhysicalMemory`] and the translator. Fatal conditions end the
//! process through [`Fatal`].
//!
//! ## Usage
//! ```rust
//! use vms_addresses::VirtualAddress;
//! use vms_mmu::{CopyOnWrite, PageTableEntry, Vms};
//!
//! let mut vms = Vms::<CopyOnWrite>::with_capacity(32);
//! let root = vms.alloc_frame();
//! let data = vms.alloc_frame();
//! let va = VirtualAddress::new(0xABC123);
//! vms.map_page(root, va, data, PageTableEntry::new().with_read(true).with_write(true));
//! vms.set_root(root);
//! vms.write(va, 1);
//!
//! let child = vms.fork_copy_on_write();
//! assert_eq!(vms.ref_count(data), 2);
//!
//! vms.set_root(child);
//! vms.write(va, 2);
//! assert_eq!(vms.read(va), 2);
//!
//! vms.set_root(root);
//! assert_eq!(vms.read(va), 1);
//! assert_eq!(vms.ref_count(data), 1);
//! ```

#![deny(unsafe_code)]

pub mod address_space;
pub mod cow;
pub mod fatal;
pub mod fork;
pub mod memory;
pub mod mmu;
pub mod page_table;
pub mod pte;
mod vms;

pub use crate::address_space::{AddressSpace, RootPage};
pub use crate::cow::{CopyOnWrite, RefCounts};
pub use crate::fatal::{Fatal, FatalPageFault};
pub use crate::memory::PhysicalMemory;
pub use crate::mmu::{FatalFaultHandler, FaultHandler, Mmu, PageFault};
pub use crate::page_table::{PageTable, PageTableMut, index_at};
pub use crate::pte::{EntryFlags, PageTableEntry};
pub use crate::vms::Vms;
